//! CLI argument definitions using clap
//!
//! Commands:
//! - flowstate items --file <path> [--namespace <pattern>]
//! - flowstate log --file <path> [--key <key> | --actor <id> | --since <ms>]
//! - flowstate snapshot --file <path> (--at <ms> | --commit <id> | --before-actor <id>)
//! - flowstate diff --file <path> --from <ms> --to <ms>

use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

use crate::history::CommitId;

/// flowstate - inspect a persisted workflow state store
#[derive(Parser, Debug)]
#[command(name = "flowstate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Store options (JSON); retention limits apply when the file is loaded
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List live items
    Items {
        /// Persisted store file
        #[arg(long)]
        file: PathBuf,

        /// Only items whose namespace matches this pattern (e.g. `sales.*`)
        #[arg(long)]
        namespace: Option<String>,
    },

    /// List retained commits
    #[command(group(ArgGroup::new("filter").multiple(false)))]
    Log {
        /// Persisted store file
        #[arg(long)]
        file: PathBuf,

        /// Commits touching this key
        #[arg(long, group = "filter")]
        key: Option<String>,

        /// Commits recorded for this actor
        #[arg(long, group = "filter")]
        actor: Option<String>,

        /// Commits at or after this timestamp (ms since epoch)
        #[arg(long, group = "filter")]
        since: Option<i64>,
    },

    /// Reconstruct state at a cutoff
    #[command(group(ArgGroup::new("cutoff").required(true).multiple(false)))]
    Snapshot {
        /// Persisted store file
        #[arg(long)]
        file: PathBuf,

        /// Timestamp cutoff (ms since epoch), inclusive
        #[arg(long, group = "cutoff")]
        at: Option<i64>,

        /// Commit cutoff (`c42` or `42`), inclusive
        #[arg(long, group = "cutoff")]
        commit: Option<CommitId>,

        /// State just before this actor's first commit
        #[arg(long, group = "cutoff")]
        before_actor: Option<String>,
    },

    /// Compare the state at two timestamps
    Diff {
        /// Persisted store file
        #[arg(long)]
        file: PathBuf,

        /// Earlier cutoff (ms since epoch)
        #[arg(long)]
        from: i64,

        /// Later cutoff (ms since epoch)
        #[arg(long)]
        to: i64,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
