use color_eyre::{eyre::eyre, Report};
use crossterm::event::{poll, read, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::{
    fs,
    mem::take,
    path::Path,
    sync::mpsc,
    time::{Duration, Instant},
};
use tokio::runtime::Runtime;
use tracing::{debug, error, info};

use crate::rope::Rope;
use crate::util::{Display, Keymap};

const TAB_SIZE: usize = 4;

#[derive(Debug, Eq, PartialEq, Hash)]
pub enum Mode {
    NORMAL,
    COMMAND,
    INSERT,
}

/// Boundary where the line containing boundary `at` begins.
pub(crate) fn line_start(content: &Rope, at: usize) -> usize {
    content.search_char_rev('\n', at).unwrap_or(0)
}

/// Character count of the line beginning at boundary `start`, excluding its
/// trailing newline.
pub(crate) fn line_len(content: &Rope, start: usize) -> usize {
    match content.search_char('\n', start + 1) {
        Some(nl) => nl - 1 - start,
        None => content.len() - start,
    }
}

pub struct Editor {
    /// The buffer. Edits go through the rope one operation at a time.
    pub(crate) content: Rope,
    /// Insert boundary in `0..=content.len()`; the character under the
    /// cursor is `content.index(at + 1)`.
    pub(crate) at: usize,
    pub(crate) filename: Option<String>,
    pub(crate) command: String,
    pub(crate) error: Option<String>,
    pub(crate) modified: bool,
    pub(crate) dirty: bool,
    pub(crate) stop: bool,

    pub(crate) mode: Mode,

    pub(crate) display: Display,

    pub(crate) keymap: Keymap,
    pub(crate) last_key_time: Instant,
}

impl Editor {
    pub fn new() -> Result<Self, Report> {
        Ok(Self {
            content: Rope::new(""),
            at: 0,
            filename: None,
            command: String::new(),
            error: None,
            modified: false,
            dirty: true,
            stop: false,

            mode: Mode::NORMAL,

            display: Display::new()?,

            keymap: Keymap::new(),
            last_key_time: Instant::now(),
        })
    }

    pub fn load_file(&mut self, filename: &str) -> Result<(), Report> {
        let text = if Path::new(filename).exists() {
            fs::read_to_string(filename)?
        } else {
            String::new()
        };

        info!(filename, chars = text.chars().count(), "loaded file");
        self.content = Rope::new(&text);
        self.at = 0;
        self.display.cursor.move_to(0, 0);
        self.filename = Some(filename.to_string());
        self.modified = false;
        Ok(())
    }

    pub fn save_file(&mut self, filename: &str) -> Result<(), Report> {
        fs::write(filename, self.content.get_content())?;
        info!(filename, "saved file");
        self.filename = Some(filename.to_string());
        self.modified = false;
        Ok(())
    }

    pub fn run(&mut self) -> Result<(), Report> {
        let (tx, mut rx) = mpsc::channel::<KeyEvent>();

        let rt = Runtime::new()?;
        rt.block_on(async {
            tokio::spawn(async move {
                Editor::key_event_listener(tx).await;
            });
        });

        while !self.stop {
            self.handle_key_event(&mut rx)?;

            if self.dirty {
                self.display.render(&self.content, &self.command, self.error.as_deref(), &self.mode)?;
                self.dirty = false;
            }
        }

        Ok(())
    }

    fn handle_key_event(&mut self, rx: &mut mpsc::Receiver<KeyEvent>) -> Result<(), Report> {
        if self.last_key_time.elapsed().as_millis() > 1000 && !self.keymap.is_empty() {
            self.execute_keymap_action();
            self.dirty = true;
        }

        let event = match rx.recv_timeout(Duration::from_millis(10)) {
            Ok(event) => event,
            Err(_) => return Ok(()),
        };
        debug!(?event, "key event");

        let mut unresolved = self.keymap.traverse(&self.mode, event);
        if unresolved.is_some() {
            self.execute_keymap_action();
            unresolved = self.keymap.traverse(&self.mode, event);
        }

        if self.keymap.is_leaf() {
            self.execute_keymap_action();
        }

        if let Some(unresolved) = unresolved {
            if !unresolved.modifiers.intersects(KeyModifiers::ALT | KeyModifiers::CONTROL) {
                self.handle_unresolved_key_event(unresolved);
            }
        }

        self.last_key_time = Instant::now();
        self.dirty = true;
        Ok(())
    }

    fn handle_unresolved_key_event(&mut self, unresolved: KeyEvent) {
        match self.mode {
            Mode::COMMAND => match unresolved.code {
                KeyCode::Char(c) => self.command.push(c),
                KeyCode::Backspace => {
                    self.command.pop();
                }
                _ => {}
            },
            Mode::INSERT => match unresolved.code {
                KeyCode::Char(c) => self.insert_char(c),
                KeyCode::Enter => self.insert_char('\n'),
                KeyCode::Tab => self.insert_text(&" ".repeat(TAB_SIZE)),
                KeyCode::Backspace => self.delete_before_cursor(),
                KeyCode::Delete => self.delete_under_cursor(),
                _ => {}
            },
            Mode::NORMAL => {}
        }
    }

    // Runs the resolved action once per count, capturing failures into the
    // error line rather than tearing down the loop.
    fn execute_keymap_action(&mut self) {
        let count = self.keymap.take_count();
        if let Some(action) = self.keymap.get_action() {
            for _ in 0..count {
                if let Err(err) = action.borrow_mut()(self) {
                    error!(%err, "action failed");
                    self.error = Some(format!("{err:#}"));
                    break;
                }
            }
        }

        self.keymap.clear();
    }

    pub(crate) fn execute_command(&mut self) -> Result<(), Report> {
        let command = take(&mut self.command);
        self.mode = Mode::NORMAL;

        let mut parts = command.split_whitespace();
        match parts.next() {
            None => Ok(()),
            Some("q") => {
                if self.modified {
                    return Err(eyre!("no write since last change (use q! to discard)"));
                }
                self.stop = true;
                Ok(())
            }
            Some("q!") => {
                self.stop = true;
                Ok(())
            }
            Some("e") => {
                let filename = parts.next().ok_or_else(|| eyre!("no filename specified"))?.to_string();
                self.load_file(&filename)
            }
            Some("w") => {
                let filename = self.target_filename(parts.next())?;
                self.save_file(&filename)
            }
            Some("wq") => {
                let filename = self.target_filename(parts.next())?;
                self.save_file(&filename)?;
                self.stop = true;
                Ok(())
            }
            Some(other) => Err(eyre!("not an editor command: {other}")),
        }
    }

    fn target_filename(&self, given: Option<&str>) -> Result<String, Report> {
        given
            .map(str::to_string)
            .or_else(|| self.filename.clone())
            .ok_or_else(|| eyre!("no filename specified"))
    }

    pub(crate) fn insert_char(&mut self, c: char) {
        self.content.insert(self.at, &c.to_string());
        self.at += 1;
        self.modified = true;

        let (column, line) = self.display.cursor.position;
        if c == '\n' {
            self.display.cursor.move_to(0, line + 1);
        } else {
            self.display.cursor.move_to(column + 1, line);
        }
    }

    pub(crate) fn insert_text(&mut self, text: &str) {
        let count = text.chars().count();
        self.content.insert(self.at, text);
        self.at += count;
        self.modified = true;

        let (column, line) = self.display.cursor.position;
        self.display.cursor.move_to(column + count, line);
    }

    pub(crate) fn delete_before_cursor(&mut self) {
        if self.at == 0 {
            return;
        }

        let removed = self.content.index(self.at);
        self.content.delete(self.at - 1, 1);
        self.at -= 1;
        self.modified = true;

        let (column, line) = self.display.cursor.position;
        if removed == Some('\n') {
            // The cursor lands where the two lines joined.
            let column = self.at - line_start(&self.content, self.at);
            self.display.cursor.move_to(column, line.saturating_sub(1));
        } else {
            self.display.cursor.move_to(column.saturating_sub(1), line);
        }
    }

    pub(crate) fn delete_under_cursor(&mut self) {
        if self.at < self.content.len() {
            self.content.delete(self.at, 1);
            self.modified = true;
        }
    }

    pub(crate) fn delete_line(&mut self) {
        if self.content.is_empty() {
            return;
        }

        let start = line_start(&self.content, self.at);
        let line = self.display.cursor.position.1;

        match self.content.search_char('\n', self.at + 1) {
            Some(nl) => {
                self.content.delete(start, nl - start);
                self.at = start;
                self.display.cursor.move_to(0, line);
            }
            None => {
                // Last line: the newline preceding it goes too.
                let from = start.saturating_sub(1);
                self.content.delete(from, self.content.len() - from);
                self.at = line_start(&self.content, self.content.len());
                self.display.cursor.move_to(0, line.saturating_sub(1));
            }
        }

        self.modified = true;
    }

    pub(crate) fn move_left(&mut self) {
        let (column, line) = self.display.cursor.position;
        if column > 0 {
            self.at -= 1;
            self.display.cursor.move_to(column - 1, line);
        }
    }

    pub(crate) fn move_right(&mut self) {
        if let Some(c) = self.content.index(self.at + 1) {
            if c != '\n' {
                let (column, line) = self.display.cursor.position;
                self.at += 1;
                self.display.cursor.move_to(column + 1, line);
            }
        }
    }

    pub(crate) fn move_down(&mut self) {
        let Some(start) = self.content.search_char('\n', self.at + 1) else {
            return;
        };

        let column = self.display.cursor.max_column.min(line_len(&self.content, start));
        self.at = start + column;

        let line = self.display.cursor.position.1;
        self.display.cursor.move_vertical(column, line + 1);
    }

    pub(crate) fn move_up(&mut self) {
        let Some(end) = self.content.search_char_rev('\n', self.at) else {
            self.at = 0;
            self.display.cursor.move_to(0, 0);
            return;
        };

        let start = self.content.search_char_rev('\n', end - 1).unwrap_or(0);
        let column = self.display.cursor.max_column.min(end - 1 - start);
        self.at = start + column;

        let line = self.display.cursor.position.1;
        self.display.cursor.move_vertical(column, line.saturating_sub(1));
    }

    pub(crate) fn move_line_end(&mut self) {
        let end = match self.content.search_char('\n', self.at + 1) {
            Some(nl) => nl - 1,
            None => self.content.len(),
        };

        let column = end - line_start(&self.content, self.at);
        self.at = end;
        let line = self.display.cursor.position.1;
        self.display.cursor.move_to(column, line);
    }

    pub(crate) fn move_first_nonblank(&mut self) {
        let start = line_start(&self.content, self.at);
        let text = self.content.report(start + 1, line_len(&self.content, start));
        let column = text.chars().position(|c| !c.is_whitespace()).unwrap_or(0);

        self.at = start + column;
        let line = self.display.cursor.position.1;
        self.display.cursor.move_to(column, line);
    }

    pub(crate) fn move_buffer_start(&mut self) {
        self.at = 0;
        self.display.cursor.move_to(0, 0);
    }

    pub(crate) fn move_buffer_end(&mut self) {
        let line = self.content.get_content().matches('\n').count();
        self.at = line_start(&self.content, self.content.len());
        self.display.cursor.move_to(0, line);
    }

    pub(crate) fn open_line_below(&mut self) {
        let end = match self.content.search_char('\n', self.at + 1) {
            Some(nl) => nl - 1,
            None => self.content.len(),
        };

        self.content.insert(end, "\n");
        self.at = end + 1;
        self.modified = true;

        let line = self.display.cursor.position.1;
        self.display.cursor.move_to(0, line + 1);
        self.mode = Mode::INSERT;
    }

    pub(crate) fn open_line_above(&mut self) {
        let start = line_start(&self.content, self.at);
        self.content.insert(start, "\n");
        self.at = start;
        self.modified = true;

        let line = self.display.cursor.position.1;
        self.display.cursor.move_to(0, line);
        self.mode = Mode::INSERT;
    }

    async fn key_event_listener(tx: mpsc::Sender<KeyEvent>) {
        loop {
            match poll(Duration::from_millis(10)) {
                Ok(true) => {}
                Ok(false) => {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    continue;
                }
                Err(_) => break,
            }

            match read() {
                Ok(Event::Key(event)) if event.kind == KeyEventKind::Press => {
                    if tx.send(event).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(_) => break,
            }
        }
    }
}
