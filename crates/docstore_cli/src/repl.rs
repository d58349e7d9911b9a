//! Interactive line editing for the book shell.

use crate::shell::{Reply, Shell, PROMPT};
use docstore_core::Datastore;
use rustyline::error::ReadlineError;
use rustyline::{Config, DefaultEditor};
use std::path::PathBuf;
use tracing::warn;

fn history_file() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".bookshelf_history"))
}

/// Reads commands with a line editor until `quit`, Ctrl-D or a terminal error.
///
/// # Errors
///
/// Returns an error if the editor cannot be created or the terminal fails.
pub fn run_interactive<D: Datastore + ?Sized>(shell: &Shell<'_, D>) -> rustyline::Result<()> {
    let config = Config::builder().history_ignore_space(true).build();
    let mut editor = DefaultEditor::with_config(config)?;

    let history = history_file();
    if let Some(path) = &history {
        // A missing history file is normal on first use.
        let _ = editor.load_history(path);
    }

    loop {
        match editor.readline(PROMPT) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(trimmed);

                match shell.execute_line(trimmed) {
                    Reply::Silent => {}
                    Reply::Output(text) => println!("{text}"),
                    Reply::Failed(text) => eprintln!("{text}"),
                    Reply::Quit => break,
                }
            }
            // Ctrl-C abandons the current line only.
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e),
        }
    }

    if let Some(path) = &history {
        if let Err(e) = editor.save_history(path) {
            warn!(path = %path.display(), error = %e, "could not save history");
        }
    }
    Ok(())
}
