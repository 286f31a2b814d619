//! flowstate CLI entry point
//!
//! Parses arguments and dispatches through `cli::run`. The JSON error
//! envelope is already on stdout when `run` fails; the exit code is 1.

use flowstate::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
