//! CLI command implementations
//!
//! Every command loads the store file read-only, runs one query and returns
//! its JSON payload. Nothing is written back.

use std::path::Path;

use serde_json::{json, Value};

use crate::history::Commit;
use crate::snapshot;
use crate::store::{StateStore, StoreConfig, Timestamp};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{write_error, write_response};

/// Main CLI entry point.
///
/// Errors are reported on stdout as an error envelope, then returned.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    match execute(&cli) {
        Ok(data) => write_response(data),
        Err(e) => {
            write_error(e.code_str(), e.message())?;
            Err(e)
        }
    }
}

/// Run one parsed invocation and return its `data` payload.
pub fn execute(cli: &Cli) -> CliResult<Value> {
    let config = load_config(cli.config.as_deref())?;
    run_command(&cli.command, config)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: &Command, config: StoreConfig) -> CliResult<Value> {
    match cmd {
        Command::Items { file, namespace } => {
            let store = StateStore::open(file, config)?;
            items(&store, namespace.as_deref())
        }
        Command::Log {
            file,
            key,
            actor,
            since,
        } => {
            let store = StateStore::open(file, config)?;
            log(&store, key.as_deref(), actor.as_deref(), *since)
        }
        Command::Snapshot {
            file,
            at,
            commit,
            before_actor,
        } => {
            let store = StateStore::open(file, config)?;
            let snapshot = match (at, commit, before_actor) {
                (Some(at), _, _) => store.snapshot_at(Timestamp::from_millis(*at))?,
                (_, Some(commit), _) => store.snapshot_at_commit(*commit)?,
                (_, _, Some(actor)) => store.snapshot_before_actor(actor)?,
                (None, None, None) => {
                    return Err(CliError::config_error(
                        "one of --at, --commit or --before-actor is required",
                    ))
                }
            };
            Ok(serde_json::to_value(&snapshot)?)
        }
        Command::Diff { file, from, to } => {
            let store = StateStore::open(file, config)?;
            let before = store.snapshot_at(Timestamp::from_millis(*from))?;
            let after = store.snapshot_at(Timestamp::from_millis(*to))?;
            let diff = snapshot::diff(&before, &after);
            Ok(json!({
                "summary": diff.summary(),
                "diff": diff,
            }))
        }
    }
}

fn load_config(path: Option<&Path>) -> CliResult<StoreConfig> {
    match path {
        Some(path) => {
            StoreConfig::load(path).map_err(|e| CliError::config_error(e.to_string()))
        }
        None => Ok(StoreConfig::default()),
    }
}

fn items(store: &StateStore, namespace: Option<&str>) -> CliResult<Value> {
    let items = match namespace {
        Some(pattern) => store.query_by_namespace(pattern)?,
        None => store.items(),
    };
    Ok(json!({
        "count": items.len(),
        "items": items,
    }))
}

fn log(
    store: &StateStore,
    key: Option<&str>,
    actor: Option<&str>,
    since: Option<i64>,
) -> CliResult<Value> {
    let commits: Vec<&Commit> = match (key, actor, since) {
        (Some(key), _, _) => store.commits_for_key(key).collect(),
        (_, Some(actor), _) => store.commits_by_actor(actor).collect(),
        (_, _, Some(since)) => store
            .commits_since(Timestamp::from_millis(since))
            .collect(),
        (None, None, None) => store.commits().collect(),
    };
    Ok(json!({
        "count": commits.len(),
        "commits": commits,
        "retention": store.retention_stats(),
    }))
}
