//! CLI module for flowstate
//!
//! Read-only inspection of a persisted store file:
//! - items: live items, optionally filtered by namespace pattern
//! - log: retained commits by key, actor or time
//! - snapshot: reconstructed state at a cutoff
//! - diff: changes between two timestamps

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{execute, run, run_command};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_error, write_response};
