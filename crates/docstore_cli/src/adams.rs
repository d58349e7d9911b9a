//! The trivia program: ask the stored question once.

use docstore_core::{CoreError, Datastore, Trivia};
use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use thiserror::Error;

/// Printed before the error line when a datastore call fails.
pub const STORE_ERROR_HEADER: &str = "Error while doing datastore operation";

/// Failure of a trivia run.
#[derive(Debug, Error)]
pub enum AdamsError {
    /// The datastore failed or held a malformed entity.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The terminal could not be read or written.
    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// Loads (or creates) the trivia entity, asks its question on `output`,
/// reads one answer line from `input` and prints the verdict.
///
/// End of input counts as a wrong answer.
///
/// # Errors
///
/// Returns the first datastore or I/O failure; nothing is retried.
pub fn run<D, R, W>(store: &D, mut input: R, output: &mut W) -> Result<(), AdamsError>
where
    D: Datastore + ?Sized,
    R: BufRead,
    W: Write,
{
    let trivia = Trivia::load_or_create(store)?;

    writeln!(output, "{}", trivia.question)?;
    write!(output, "> ")?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    writeln!(output, "{}", trivia.verdict(&answer))?;
    Ok(())
}

/// Writes a failed run's message to `err` and returns the exit status.
///
/// Datastore failures get [`STORE_ERROR_HEADER`] on the line before them.
pub fn report<W: Write>(error: &AdamsError, err: &mut W) -> ExitCode {
    let written = match error {
        AdamsError::Core(CoreError::Store(e)) => writeln!(err, "{STORE_ERROR_HEADER}\n{e}"),
        other => writeln!(err, "{other}"),
    };
    // Nothing left to report to if stderr is gone.
    let _ = written.and_then(|()| err.flush());
    ExitCode::FAILURE
}
