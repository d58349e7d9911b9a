//! # Docstore CLI
//!
//! Library side of the two binaries:
//!
//! - `adams` asks the stored trivia question once ([`adams::run`])
//! - `bookshelf` is a command shell over the book repository
//!   ([`shell::Shell`], [`repl::run_interactive`], [`shell::run_pipe`])
//!
//! Both select their backend with [`connect::ConnectArgs`]: `--local PATH`
//! for a snapshot file, otherwise the hosted service configured from the
//! environment.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod adams;
pub mod connect;
pub mod logging;
pub mod repl;
pub mod shell;

/// Printed before a backend setup failure.
pub const CONNECT_ERROR_PREFIX: &str = "Error connecting to the datastore";
