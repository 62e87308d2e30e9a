pub(crate) mod display;
pub(crate) mod keymap;

pub(crate) use self::display::Display;
pub(crate) use self::keymap::Keymap;
