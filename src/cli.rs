use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;
use crate::selection::DEFAULT_MAX_TASKS;
use crate::vault::DEFAULT_NOTES_FORMAT;

/// Daily planning from a task backlog and a vault of markdown daily notes.
/// Every global option can also be set through its environment variable.
#[derive(Parser)]
#[command(name = "daybook", version, about = "Daily planning CLI for a backlog and markdown daily notes")]
pub struct Cli {
    /// Root directory of the notes vault.
    #[arg(long, global = true, env = "OBSIDIAN_VAULT_PATH")]
    pub vault: Option<PathBuf>,

    /// Daily note path inside the vault, with a single {date} placeholder.
    #[arg(long, global = true, env = "DAILY_NOTES_FORMAT", default_value = DEFAULT_NOTES_FORMAT)]
    pub notes_format: String,

    /// Path to the JSON task store (default: ~/.daybook/tasks.json).
    #[arg(long, global = true, env = "COACH_DB_PATH")]
    pub db: Option<PathBuf>,

    /// Upper bound on tasks picked for a day.
    #[arg(long, global = true, env = "DAYBOOK_MAX_TASKS", default_value_t = DEFAULT_MAX_TASKS)]
    pub max_tasks: usize,

    #[command(subcommand)]
    pub command: Commands,
}
