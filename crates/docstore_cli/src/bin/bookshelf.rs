//! Book shell.
//!
//! Usage: `bookshelf <PROJECT_ID> [--local PATH] [-v]`
//!
//! Reads commands interactively when stdin is a terminal, one per line
//! otherwise.

use clap::error::ErrorKind;
use clap::Parser;
use docstore_cli::connect::{open_store, ConnectArgs};
use docstore_cli::shell::{run_pipe, Shell};
use docstore_cli::{logging, repl, CONNECT_ERROR_PREFIX};
use std::io::{self, IsTerminal};
use std::process::ExitCode;

/// Command shell over the books stored in the datastore.
#[derive(Parser)]
#[command(name = "bookshelf")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    connect: ConnectArgs,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let _ = e.print();
            return ExitCode::FAILURE;
        }
    };
    logging::init(cli.connect.verbose);

    let store = match open_store(&cli.connect) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("{CONNECT_ERROR_PREFIX}: {e}");
            return ExitCode::FAILURE;
        }
    };
    let shell = Shell::new(&*store);

    if io::stdin().is_terminal() {
        match repl::run_interactive(&shell) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("(error) {e}");
                ExitCode::FAILURE
            }
        }
    } else {
        let stdin = io::stdin();
        match run_pipe(&shell, stdin.lock(), &mut io::stdout(), &mut io::stderr()) {
            Ok(true) => ExitCode::SUCCESS,
            Ok(false) => ExitCode::FAILURE,
            Err(e) => {
                eprintln!("(error) {e}");
                ExitCode::FAILURE
            }
        }
    }
}
