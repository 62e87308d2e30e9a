use color_eyre::Report;
use crossterm::{
    cursor, execute, queue, style,
    terminal::{self, ClearType},
};
use std::io::{self, Write};

use crate::editor::Mode;
use crate::rope::Rope;

/// Columns taken by the line-number gutter.
const GUTTER: usize = 6;

pub struct Display {
    size: (u16, u16),
    offset: (usize, usize),

    pub(crate) cursor: Cursor,

    out: io::Stdout,
}

/// Buffer-absolute cursor: `position` is (column, line); `max_column`
/// remembers the column a vertical motion tries to return to.
pub struct Cursor {
    pub(crate) position: (usize, usize),
    pub(crate) max_column: usize,
}

impl Cursor {
    fn new() -> Self {
        Self { position: (0, 0), max_column: 0 }
    }

    /// Horizontal or absolute motion: the target column becomes sticky.
    pub fn move_to(&mut self, column: usize, line: usize) {
        self.position = (column, line);
        self.max_column = column;
    }

    /// Vertical motion: lands on `column` but keeps the sticky column.
    pub fn move_vertical(&mut self, column: usize, line: usize) {
        self.position = (column, line);
    }
}

impl Drop for Display {
    fn drop(&mut self) {
        let _ = execute!(
            self.out,
            style::ResetColor,
            cursor::SetCursorStyle::DefaultUserShape,
            cursor::Show,
            terminal::LeaveAlternateScreen
        );
        let _ = terminal::disable_raw_mode();
    }
}

impl Display {
    pub fn new() -> Result<Self, Report> {
        terminal::enable_raw_mode()?;

        let mut out = io::stdout();
        execute!(out, terminal::EnterAlternateScreen)?;

        Ok(Self { size: terminal::size()?, offset: (0, 0), cursor: Cursor::new(), out })
    }

    pub fn render(
        &mut self,
        buffer: &Rope,
        command: &str,
        error: Option<&str>,
        mode: &Mode,
    ) -> Result<(), Report> {
        self.size = terminal::size()?;

        let content = buffer.get_content();
        let lines: Vec<&str> = content.split('\n').collect();

        let mut max_lines = self.size.1 as usize;
        if *mode == Mode::COMMAND {
            max_lines = max_lines.saturating_sub(1);
        }
        if let Some(error) = error {
            max_lines = max_lines.saturating_sub(error.lines().count());
        }

        let text_columns = (self.size.0 as usize).saturating_sub(GUTTER);
        self.follow_cursor(max_lines, text_columns);

        queue!(self.out, style::ResetColor, terminal::Clear(ClearType::All), cursor::MoveTo(0, 0))?;

        let cursor_line = self.cursor.position.1;
        let mut rendered = 0;
        for (i, line) in lines.iter().skip(self.offset.1).take(max_lines).enumerate() {
            let absolute_line = i + self.offset.1;
            let relative_number = if absolute_line == cursor_line {
                absolute_line.to_string()
            } else {
                absolute_line.abs_diff(cursor_line).to_string()
            };

            let visible: String = line.chars().skip(self.offset.0).take(text_columns).collect();

            queue!(
                self.out,
                style::Print(format!("{:>4}  {}", relative_number, visible)),
                cursor::MoveToNextLine(1)
            )?;
            rendered += 1;
        }

        for _ in rendered..max_lines {
            queue!(self.out, style::Print("   ~ "), cursor::MoveToNextLine(1))?;
        }

        if let Some(error) = error {
            for line in error.lines() {
                queue!(
                    self.out,
                    style::SetAttribute(style::Attribute::Italic),
                    style::Print(line),
                    style::SetAttribute(style::Attribute::Reset),
                    cursor::MoveToNextLine(1)
                )?;
            }
        }

        let screen_column = (GUTTER + self.cursor.position.0 - self.offset.0) as u16;
        let screen_line = (self.cursor.position.1 - self.offset.1) as u16;

        match mode {
            Mode::INSERT => queue!(
                self.out,
                cursor::SetCursorStyle::BlinkingBar,
                cursor::MoveTo(screen_column, screen_line)
            )?,
            Mode::COMMAND => queue!(
                self.out,
                cursor::MoveTo(0, self.size.1.saturating_sub(1)),
                style::SetAttribute(style::Attribute::Bold),
                style::Print(format!(":{}", command)),
                style::SetAttribute(style::Attribute::Reset),
                cursor::SetCursorStyle::BlinkingBar,
                cursor::MoveTo(command.chars().count() as u16 + 1, self.size.1.saturating_sub(1))
            )?,
            Mode::NORMAL => queue!(
                self.out,
                cursor::SetCursorStyle::DefaultUserShape,
                cursor::MoveTo(screen_column, screen_line)
            )?,
        }

        self.out.flush()?;
        Ok(())
    }

    // Scrolls the viewport the minimal amount that keeps the cursor visible.
    fn follow_cursor(&mut self, max_lines: usize, text_columns: usize) {
        let (column, line) = self.cursor.position;

        if line < self.offset.1 {
            self.offset.1 = line;
        } else if max_lines > 0 && line >= self.offset.1 + max_lines {
            self.offset.1 = line + 1 - max_lines;
        }

        if column < self.offset.0 {
            self.offset.0 = column;
        } else if text_columns > 0 && column >= self.offset.0 + text_columns {
            self.offset.0 = column + 1 - text_columns;
        }
    }
}
