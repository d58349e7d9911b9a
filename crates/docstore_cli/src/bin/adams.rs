//! Trivia program: asks the stored question once.
//!
//! Usage: `adams <PROJECT_ID> [--local PATH] [-v]`

use clap::error::ErrorKind;
use clap::Parser;
use docstore_cli::adams;
use docstore_cli::connect::{open_store, ConnectArgs};
use docstore_cli::{logging, CONNECT_ERROR_PREFIX};
use std::io;
use std::process::ExitCode;

/// Ask the question stored in the datastore.
#[derive(Parser)]
#[command(name = "adams")]
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
            // Usage problems exit with 1, not clap's 2.
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

    let stdin = io::stdin();
    match adams::run(&*store, stdin.lock(), &mut io::stdout()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => adams::report(&e, &mut io::stderr()),
    }
}
