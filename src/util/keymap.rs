use color_eyre::Report;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::{cell::RefCell, collections::HashMap, rc::Rc};

use crate::editor::{Editor, Mode};

type ActionFn = dyn FnMut(&mut Editor) -> Result<(), Report>;

struct KeyNode {
    children: HashMap<KeyEvent, Rc<RefCell<KeyNode>>>,
    action: Option<Rc<RefCell<ActionFn>>>,
}

impl KeyNode {
    fn new() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self { children: HashMap::new(), action: None }))
    }

    fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    fn insert(&mut self, sequence: &[KeyEvent], action: Rc<RefCell<ActionFn>>) {
        let Some((key, rest)) = sequence.split_first() else {
            self.action = Some(action);
            return;
        };

        let next = self.children.entry(*key).or_insert_with(KeyNode::new);
        next.borrow_mut().insert(rest, action);
    }
}

/// Per-mode trie of key sequences. A sequence may resolve over several key
/// events; a numeric prefix typed before it multiplies the bound action.
pub struct Keymap {
    bindings: HashMap<Mode, Rc<RefCell<KeyNode>>>,
    pending: Option<Rc<RefCell<KeyNode>>>,
    count: Option<usize>,
}

// Terminals disagree on whether an upper-case character carries SHIFT; the
// case is already in the char, so the modifier is dropped on both sides.
fn normalize(event: KeyEvent) -> KeyEvent {
    match event.code {
        KeyCode::Char(_) => KeyEvent::new(event.code, event.modifiers - KeyModifiers::SHIFT),
        _ => KeyEvent::new(event.code, event.modifiers),
    }
}

fn event_to_digit(event: &KeyEvent) -> Option<usize> {
    match event.code {
        KeyCode::Char(c) if c.is_ascii_digit() => c.to_digit(10).map(|d| d as usize),
        _ => None,
    }
}

impl Keymap {
    pub fn new() -> Self {
        Self { bindings: HashMap::new(), pending: None, count: None }
    }

    pub fn add_keybind<F>(&mut self, modes: Vec<Mode>, sequence: Vec<KeyEvent>, action: F)
    where
        F: FnMut(&mut Editor) -> Result<(), Report> + 'static,
    {
        let action: Rc<RefCell<ActionFn>> = Rc::new(RefCell::new(action));
        let sequence: Vec<KeyEvent> = sequence.into_iter().map(normalize).collect();

        for mode in modes {
            let root = self.bindings.entry(mode).or_insert_with(KeyNode::new);
            root.borrow_mut().insert(&sequence, action.clone());
        }
    }

    /// Advances the pending sequence by one key event. Returns the event back
    /// when nothing in the current mode matches it.
    pub fn traverse(&mut self, mode: &Mode, event: KeyEvent) -> Option<KeyEvent> {
        let event = normalize(event);

        let node = match self.pending {
            Some(ref node) => node.clone(),
            None => match self.bindings.get(mode) {
                Some(root) => root.clone(),
                None => return Some(event),
            },
        };

        let next = node.borrow().children.get(&event).cloned();
        match next {
            Some(next) => {
                self.pending = Some(next);
                None
            }
            None => {
                // In NORMAL mode a leading digit run accumulates into a count.
                if self.pending.is_none() && *mode == Mode::NORMAL {
                    if let Some(digit) = event_to_digit(&event) {
                        if digit != 0 || self.count.is_some() {
                            self.count = Some(self.count.unwrap_or(0) * 10 + digit);
                            return None;
                        }
                    }
                }

                Some(event)
            }
        }
    }

    /// Whether the pending sequence cannot be extended any further.
    pub fn is_leaf(&self) -> bool {
        match self.pending {
            Some(ref node) => node.borrow().is_leaf(),
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_none()
    }

    pub fn get_action(&self) -> Option<Rc<RefCell<ActionFn>>> {
        self.pending.as_ref()?.borrow().action.clone()
    }

    /// Consumes the accumulated numeric prefix, defaulting to one.
    pub fn take_count(&mut self) -> usize {
        self.count.take().unwrap_or(1)
    }

    pub fn clear(&mut self) {
        self.pending = None;
        self.count = None;
    }
}
