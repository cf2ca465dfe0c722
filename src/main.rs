//! # Daybook - daily planning CLI
//!
//! Keeps a task backlog and a vault of markdown daily notes in step, and picks a small,
//! bounded set of tasks to surface each day with a deterministic heuristic.
//!
//! ## Key Features
//!
//! - **Daily notes as documents**: front matter plus `## ` sections, edited one section
//!   at a time and written back atomically (temp file + rename).
//! - **Deterministic selection**: at most one critical task, two important tasks and three
//!   quick wins, with fixed tie-breaks so the same backlog always gives the same day.
//! - **Reconciliation**: boxes ticked in a note complete the matching backlog task (exact,
//!   substring, then fuzzy title match); boxes left open count as skips.
//! - **Goals and facts**: active goals and remembered facts are worked into each new note.
//! - **Local file storage**: the backlog is one JSON file, saved once per command.
//!
//! ## Quick Start
//!
//! ```bash
//! export OBSIDIAN_VAULT_PATH=~/Notes
//!
//! # Capture work
//! daybook add "Write report" --priority high --notes "[Deadline] due 11/07"
//! daybook add "File invoice" --quick --estimate 10
//! daybook goal "Ship v2" --timeframe "this month"
//!
//! # Each morning
//! daybook start-day
//!
//! # During the day
//! daybook check "file invoice"
//! daybook accomplish "Shipped the report"
//!
//! # Evening
//! daybook summary
//! ```
//!
//! Data is stored in `~/.daybook/tasks.json` unless `--db` or `COACH_DB_PATH` says
//! otherwise. Logging goes to stderr and is controlled with `RUST_LOG` (default `warn`).

use clap::Parser;
use tracing_subscriber::EnvFilter;

pub mod atomic;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod db;
pub mod document;
pub mod error;
pub mod fields;
pub mod goal;
pub mod matcher;
pub mod planner;
pub mod selection;
pub mod task;
pub mod vault;

use cli::Cli;
use config::Config;
use planner::Now;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_cli(&cli);
    tracing::debug!(?config, "resolved configuration");

    let outcome = cmd::run(cli.command, &config, Now::local());
    if outcome.success {
        println!("{}", outcome.message);
    } else {
        eprintln!("{}", outcome.message);
        std::process::exit(1);
    }
}
