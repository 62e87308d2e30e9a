use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::editor::Mode;

/// Registers an action under a vim-style mode string ("n", "ic") and key
/// sequence ("gg", "<C-q>x", "<Esc>").
macro_rules! add_keybind {
    ($editor:expr, $modes:expr, $sequence:expr, $action:expr) => {
        $editor.keymap.add_keybind(
            crate::macros::parse_modes($modes),
            crate::macros::parse_keys($sequence),
            $action,
        )
    };
}

pub(crate) fn parse_modes(modes: &str) -> Vec<Mode> {
    modes
        .chars()
        .filter_map(|c| match c {
            'n' => Some(Mode::NORMAL),
            'i' => Some(Mode::INSERT),
            'c' => Some(Mode::COMMAND),
            _ => None,
        })
        .collect()
}

pub(crate) fn parse_keys(sequence: &str) -> Vec<KeyEvent> {
    let mut keys = Vec::new();
    let mut chars = sequence.chars();

    while let Some(c) = chars.next() {
        if c != '<' {
            keys.push(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
            continue;
        }

        let mut name = String::new();
        for c in chars.by_ref() {
            if c == '>' {
                break;
            }
            name.push(c);
        }

        keys.push(parse_key_name(&name));
    }

    keys
}

fn parse_key_name(name: &str) -> KeyEvent {
    let (modifiers, key) = match name.split_once('-') {
        Some((modifier, key)) if !key.is_empty() => {
            let modifiers = match modifier {
                "C" => KeyModifiers::CONTROL,
                "S" => KeyModifiers::SHIFT,
                "A" => KeyModifiers::ALT,
                _ => KeyModifiers::NONE,
            };
            (modifiers, key)
        }
        _ => (KeyModifiers::NONE, name),
    };

    let code = match key {
        "BS" => KeyCode::Backspace,
        "Tab" => KeyCode::Tab,
        "CR" | "Enter" | "Return" => KeyCode::Enter,
        "Esc" => KeyCode::Esc,
        "Space" => KeyCode::Char(' '),
        "Up" => KeyCode::Up,
        "Down" => KeyCode::Down,
        "Left" => KeyCode::Left,
        "Right" => KeyCode::Right,
        "Insert" => KeyCode::Insert,
        "Del" => KeyCode::Delete,
        "Home" => KeyCode::Home,
        "End" => KeyCode::End,
        "PageUp" => KeyCode::PageUp,
        "PageDown" => KeyCode::PageDown,
        key => {
            if let Some(n) = key.strip_prefix('F').and_then(|n| n.parse::<u8>().ok()) {
                KeyCode::F(n)
            } else {
                let mut it = key.chars();
                match (it.next(), it.next()) {
                    // Unknown multi-character names bind to nothing.
                    (Some(c), None) => KeyCode::Char(c),
                    _ => KeyCode::Null,
                }
            }
        }
    };

    KeyEvent::new(code, modifiers)
}
