//! The book shell: one command per line, dispatched to the repository.

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use docstore_core::{Book, BookRepository, CoreResult, Datastore};
use std::io::{self, BufRead, Write};
use tracing::debug;

/// Interactive prompt.
pub const PROMPT: &str = "bookshelf:> ";

/// Commands understood by the shell. The first word of a line names the command.
#[derive(Debug, PartialEq, Eq, Parser)]
#[command(name = "bookshelf", multicall = true, disable_help_subcommand = true)]
pub enum ShellCommand {
    /// Saves a book: save-book <title> <author> <year>
    SaveBook {
        /// Title
        title: String,
        /// Author
        author: String,
        /// Publication year
        year: i64,
    },
    /// Loads all books
    FindAllBooks,
    /// Loads books by author: find-by-author <author>
    FindByAuthor {
        /// Author
        author: String,
    },
    /// Loads books published after a given year: find-by-year-after <year>
    FindByYearAfter {
        /// Exclusive lower bound
        year: i64,
    },
    /// Loads books by author and year: find-by-author-year <author> <year>
    FindByAuthorYear {
        /// Author
        author: String,
        /// Publication year
        year: i64,
    },
    /// Removes all books
    RemoveAllBooks,
    /// Lists the available commands
    Help,
    /// Leaves the shell
    #[command(alias = "exit")]
    Quit,
}

/// What a line produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Nothing to print.
    Silent,
    /// Text for stdout.
    Output(String),
    /// Text for stderr; the command failed.
    Failed(String),
    /// The user asked to leave.
    Quit,
}

/// Formats books the way list results are shown: `[Book{...}, Book{...}]`.
pub fn format_books(books: &[Book]) -> String {
    let items: Vec<String> = books.iter().map(ToString::to_string).collect();
    format!("[{}]", items.join(", "))
}

/// Help text listing every command.
pub fn help_text() -> String {
    let command = ShellCommand::command();
    let entries: Vec<(String, String)> = command
        .get_subcommands()
        .map(|c| {
            let about = c.get_about().map(ToString::to_string).unwrap_or_default();
            (c.get_name().to_string(), about)
        })
        .collect();
    let width = entries.iter().map(|(n, _)| n.len()).max().unwrap_or(0);

    let mut text = String::from("Available commands:");
    for (name, about) in entries {
        text.push_str(&format!("\n  {name:<width$}  {about}"));
    }
    text
}

/// Executes shell lines against a book repository.
pub struct Shell<'a, D: Datastore + ?Sized> {
    books: BookRepository<'a, D>,
}

impl<'a, D: Datastore + ?Sized> Shell<'a, D> {
    /// Creates a shell over `store`.
    pub fn new(store: &'a D) -> Self {
        Self {
            books: BookRepository::new(store),
        }
    }

    /// Tokenises, parses and runs one line.
    pub fn execute_line(&self, line: &str) -> Reply {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Reply::Silent;
        }
        let Some(tokens) = shlex::split(line) else {
            return Reply::Failed(format!("(error) Invalid quoting: {line}"));
        };
        if tokens.is_empty() {
            return Reply::Silent;
        }

        match ShellCommand::try_parse_from(tokens) {
            Ok(command) => self.execute(command),
            Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
                Reply::Output(e.render().to_string().trim_end().to_string())
            }
            Err(e) => Reply::Failed(e.render().to_string().trim_end().to_string()),
        }
    }

    /// Runs a parsed command.
    pub fn execute(&self, command: ShellCommand) -> Reply {
        debug!(?command, "executing");
        let result: CoreResult<Option<String>> = match command {
            ShellCommand::SaveBook {
                title,
                author,
                year,
            } => self
                .books
                .save(Book::new(title, author, year))
                .map(|b| Some(b.to_string())),
            ShellCommand::FindAllBooks => self.books.find_all().map(|b| Some(format_books(&b))),
            ShellCommand::FindByAuthor { author } => self
                .books
                .find_by_author(&author)
                .map(|b| Some(format_books(&b))),
            ShellCommand::FindByYearAfter { year } => self
                .books
                .find_by_year_greater_than(year)
                .map(|b| Some(format_books(&b))),
            ShellCommand::FindByAuthorYear { author, year } => self
                .books
                .find_by_author_and_year(&author, year)
                .map(|b| Some(format_books(&b))),
            ShellCommand::RemoveAllBooks => self.books.delete_all().map(|_| None),
            ShellCommand::Help => Ok(Some(help_text())),
            ShellCommand::Quit => return Reply::Quit,
        };

        match result {
            Ok(Some(text)) => Reply::Output(text),
            Ok(None) => Reply::Silent,
            Err(e) => Reply::Failed(format!("(error) {e}")),
        }
    }
}

/// Runs lines from `input` until it ends or a `quit` line.
///
/// Returns `true` if every command succeeded.
///
/// # Errors
///
/// Returns an error if `input` cannot be read or the outputs cannot be written.
pub fn run_pipe<D, R, W, E>(
    shell: &Shell<'_, D>,
    input: R,
    out: &mut W,
    err: &mut E,
) -> io::Result<bool>
where
    D: Datastore + ?Sized,
    R: BufRead,
    W: Write,
    E: Write,
{
    let mut all_ok = true;
    for line in input.lines() {
        match shell.execute_line(&line?) {
            Reply::Silent => {}
            Reply::Output(text) => writeln!(out, "{text}")?,
            Reply::Failed(text) => {
                writeln!(err, "{text}")?;
                all_ok = false;
            }
            Reply::Quit => break,
        }
    }
    out.flush()?;
    Ok(all_ok)
}
