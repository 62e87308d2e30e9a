#[macro_use]
mod macros;

mod editor;
mod rope;
mod util;

use clap::Parser;
use color_eyre::Report;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::editor::{default_keybinds, Editor};

/// A terminal text editor storing its buffer as a rope.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// File to open.
    file: Option<String>,
}

fn main() -> Result<(), Report> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut editor = Editor::new()?;
    default_keybinds(&mut editor);

    if let Some(file) = &args.file {
        editor.load_file(file)?;
    }

    info!("editor starting");
    editor.run()
}
