//! Command implementations for the CLI interface.
//!
//! Each subcommand has a `cmd_*` handler returning the text to print or a typed error.
//! [`run`] loads what a command needs, dispatches, and folds the result into an
//! [`Outcome`], so no error escapes past this module as a panic or early exit.

use std::path::Path;

use chrono::{NaiveDate, TimeZone, Utc};
use clap::Subcommand;
use clap_complete::{generate, Shell};
use serde_yaml::Value;

use crate::config::Config;
use crate::db::*;
use crate::error::CoachError;
use crate::fields::*;
use crate::goal::{format_facts, format_goals, DEFAULT_CATEGORY, DEFAULT_TIMEFRAME};
use crate::planner::{self, Now};
use crate::task::NewTask;
use crate::vault::Vault;

/// Longest section body `read-note` prints before truncating.
const READ_NOTE_PREVIEW_CHARS: usize = 500;
/// Facts shown by `facts`.
const FACTS_LIMIT: usize = 20;

#[derive(Subcommand)]
pub enum Commands {
    /// Add a task to the backlog.
    Add {
        /// Short title for the task.
        title: String,
        /// Priority: low | medium | high.
        #[arg(long, value_enum, default_value_t = Priority::Medium)]
        priority: Priority,
        /// Free-text notes; may carry tags such as [Deadline] or [Sprint Work].
        #[arg(long)]
        notes: Option<String>,
        /// Time estimate in minutes.
        #[arg(long)]
        estimate: Option<u32>,
        /// Mark as a quick win (low priority, [Quick Win] tag).
        #[arg(long)]
        quick: bool,
    },

    /// List backlog tasks grouped by priority.
    List {
        /// Which tasks to show.
        #[arg(long, value_enum, default_value_t = StatusFilter::Active)]
        status: StatusFilter,
    },

    /// Mark a backlog task completed.
    Complete {
        /// Task ID or title
        id: String,
    },

    /// Delete a backlog task.
    Delete {
        /// Task ID or title
        id: String,
    },

    /// Set a goal; active goals are worked into new daily notes.
    Goal {
        /// What you want to achieve.
        goal: String,
        /// When, e.g. "this week", "this month", "long-term".
        #[arg(long, default_value = DEFAULT_TIMEFRAME)]
        timeframe: String,
        /// Category such as career, health or personal.
        #[arg(long, default_value = DEFAULT_CATEGORY)]
        category: String,
    },

    /// List goals grouped by timeframe.
    Goals {
        #[arg(long, value_enum, default_value_t = StatusFilter::Active)]
        status: StatusFilter,
    },

    /// Mark a goal achieved.
    CompleteGoal {
        id: u64,
    },

    /// Remember a fact about yourself (preferences, patterns, routines).
    Fact {
        fact: String,
        #[arg(long, default_value = DEFAULT_CATEGORY)]
        category: String,
    },

    /// Show remembered facts grouped by category.
    Facts,

    /// Show the path of a daily note and whether it exists.
    NotePath {
        /// YYYY-MM-DD, today, yesterday or tomorrow (default: today)
        date: Option<String>,
    },

    /// Print a daily note's metadata and sections.
    ReadNote {
        /// YYYY-MM-DD, today, yesterday or tomorrow (default: today)
        date: Option<String>,
    },

    /// Print one section of a daily note.
    ReadSection {
        /// Section name, without the ## or emoji.
        section: String,
        /// YYYY-MM-DD, today, yesterday or tomorrow (default: today)
        date: Option<String>,
    },

    /// Append to (or replace) an existing section of a daily note.
    WriteSection {
        /// Section name, without the ## or emoji.
        section: String,
        /// Content to write.
        content: String,
        #[arg(long)]
        date: Option<String>,
        /// Replace the section body instead of appending.
        #[arg(long)]
        replace: bool,
    },

    /// Add a new section at the end of a daily note.
    AddSection {
        /// Heading for the new section.
        name: String,
        /// Initial content.
        content: String,
        #[arg(long)]
        date: Option<String>,
        /// Emoji placed before the heading.
        #[arg(long)]
        emoji: Option<String>,
    },

    /// Add a checkbox task to a daily note.
    AddTask {
        /// Task text.
        text: String,
        #[arg(long)]
        date: Option<String>,
        #[arg(long, value_enum, default_value_t = Priority::Medium)]
        priority: Priority,
    },

    /// Check off the first note task starting with TEXT.
    Check {
        /// Leading text of the task line (case-insensitive).
        text: String,
        #[arg(long)]
        date: Option<String>,
        /// Uncheck instead.
        #[arg(long)]
        undo: bool,
    },

    /// Log an accomplishment in a daily note and in the store.
    Accomplish {
        /// What you got done.
        text: String,
        #[arg(long)]
        date: Option<String>,
    },

    /// End-of-day summary of a daily note.
    Summary {
        date: Option<String>,
    },

    /// Mark backlog tasks completed from a note's checked boxes.
    Sync {
        date: Option<String>,
    },

    /// Pick today's tasks and create the daily note.
    CreateNote {
        date: Option<String>,
    },

    /// Reconcile yesterday, pick today's tasks, create the note and print a briefing.
    StartDay {
        date: Option<String>,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Result of one command as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub success: bool,
    pub message: String,
}

impl From<Result<String, CoachError>> for Outcome {
    fn from(result: Result<String, CoachError>) -> Self {
        match result {
            Ok(message) => Outcome { success: true, message },
            Err(e) => Outcome { success: false, message: format!("Error: {e}") },
        }
    }
}

/// Execute a command against the configured store and vault.
pub fn run(command: Commands, config: &Config, now: Now) -> Outcome {
    Outcome::from(dispatch(command, config, now))
}

fn dispatch(command: Commands, config: &Config, now: Now) -> Result<String, CoachError> {
    let db_path = config.db_path.as_path();
    let date = |arg: Option<String>| resolve_date(arg.as_deref(), now.date);

    match command {
        Commands::Add { title, priority, notes, estimate, quick } => {
            let mut db = Database::load(db_path)?;
            cmd_add(&mut db, db_path, title, priority, notes, estimate, quick, now)
        }
        Commands::List { status } => cmd_list(&Database::load(db_path)?, status),
        Commands::Complete { id } => cmd_complete(&mut Database::load(db_path)?, db_path, &id, now),
        Commands::Delete { id } => cmd_delete(&mut Database::load(db_path)?, db_path, &id),

        Commands::Goal { goal, timeframe, category } => {
            cmd_goal(&mut Database::load(db_path)?, db_path, &goal, &timeframe, &category, now)
        }
        Commands::Goals { status } => cmd_goals(&Database::load(db_path)?, status),
        Commands::CompleteGoal { id } => cmd_complete_goal(&mut Database::load(db_path)?, db_path, id),
        Commands::Fact { fact, category } => cmd_fact(&mut Database::load(db_path)?, db_path, &fact, &category, now),
        Commands::Facts => cmd_facts(&Database::load(db_path)?),

        Commands::NotePath { date: d } => {
            let d = date(d)?;
            cmd_note_path(&config.vault()?, d)
        }
        Commands::ReadNote { date: d } => {
            let d = date(d)?;
            cmd_read_note(&config.vault()?, d)
        }
        Commands::ReadSection { section, date: d } => {
            let d = date(d)?;
            cmd_read_section(&config.vault()?, d, &section)
        }
        Commands::WriteSection { section, content, date: d, replace } => {
            let d = date(d)?;
            cmd_write_section(&config.vault()?, d, &section, &content, replace)
        }
        Commands::AddSection { name, content, date: d, emoji } => {
            let d = date(d)?;
            cmd_add_section(&config.vault()?, d, &name, &content, emoji.as_deref())
        }
        Commands::AddTask { text, date: d, priority } => {
            let d = date(d)?;
            cmd_add_task(&config.vault()?, d, &text, priority, now)
        }
        Commands::Check { text, date: d, undo } => {
            let d = date(d)?;
            cmd_check(&config.vault()?, d, &text, undo)
        }
        Commands::Accomplish { text, date: d } => {
            let d = date(d)?;
            let vault = config.vault()?;
            cmd_accomplish(&vault, &mut Database::load(db_path)?, db_path, d, &text, now)
        }
        Commands::Summary { date: d } => {
            let d = date(d)?;
            Ok(planner::daily_summary(&config.vault()?, d, now.time)?)
        }

        Commands::Sync { date: d } => {
            let d = date(d)?;
            let vault = config.vault()?;
            cmd_sync(&vault, &mut Database::load(db_path)?, db_path, d, now)
        }
        Commands::CreateNote { date: d } => {
            let d = date(d)?;
            let vault = config.vault()?;
            cmd_create_note(&vault, &mut Database::load(db_path)?, db_path, d, config.max_tasks, now)
        }
        Commands::StartDay { date: d } => {
            let d = date(d)?;
            let vault = config.vault()?;
            let briefing = planner::start_day(&vault, &mut Database::load(db_path)?, db_path, d, config.max_tasks, now)?;
            Ok(planner::render_briefing(&briefing))
        }

        Commands::Completions { shell } => Ok(cmd_completions(shell)),
    }
}

/// Add a new task to the backlog.
#[allow(clippy::too_many_arguments)]
pub fn cmd_add(
    db: &mut Database,
    db_path: &Path,
    title: String,
    priority: Priority,
    notes: Option<String>,
    estimate: Option<u32>,
    quick: bool,
    now: Now,
) -> Result<String, CoachError> {
    let mut new = NewTask::new(title).priority(priority).time_estimate(estimate);
    if let Some(notes) = notes {
        new = new.notes(notes);
    }
    if quick {
        new = new.quick();
    }
    let id = db.add_task(new, now.utc)?;
    db.save(db_path)?;
    Ok(format!("Added task {id}"))
}

/// List backlog tasks.
pub fn cmd_list(db: &Database, status: StatusFilter) -> Result<String, CoachError> {
    let tasks = db.listing(status);
    if tasks.is_empty() {
        return Ok("No tasks.".to_string());
    }
    Ok(format_table(&tasks))
}

/// Mark a task completed.
pub fn cmd_complete(db: &mut Database, db_path: &Path, id: &str, now: Now) -> Result<String, CoachError> {
    let task_id = resolve_task_identifier(id, db)?;
    let task = db.complete(task_id, now.utc)?;
    let when = task
        .completed_at_utc
        .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "-".into());
    let message = format!("Completed task {task_id}: {} (at {when})", task.title);
    db.save(db_path)?;
    Ok(message)
}

/// Delete a task.
pub fn cmd_delete(db: &mut Database, db_path: &Path, id: &str) -> Result<String, CoachError> {
    let task_id = resolve_task_identifier(id, db)?;
    let task = db.delete(task_id)?;
    db.save(db_path)?;
    Ok(format!("Deleted task {task_id}: {}", task.title))
}

pub fn cmd_goal(
    db: &mut Database,
    db_path: &Path,
    goal: &str,
    timeframe: &str,
    category: &str,
    now: Now,
) -> Result<String, CoachError> {
    let id = db.add_goal(goal, timeframe, category, now.utc)?;
    db.save(db_path)?;
    Ok(format!("Set goal {id}: {} ({}, {})", goal.trim(), timeframe.trim(), category.trim()))
}

pub fn cmd_goals(db: &Database, status: StatusFilter) -> Result<String, CoachError> {
    let goals = db.goal_listing(status);
    if goals.is_empty() {
        return Ok("No goals.".to_string());
    }
    Ok(format_goals(&goals))
}

pub fn cmd_complete_goal(db: &mut Database, db_path: &Path, id: u64) -> Result<String, CoachError> {
    let message = format!("Completed goal {id}: {}", db.complete_goal(id)?.goal);
    db.save(db_path)?;
    Ok(message)
}

pub fn cmd_fact(db: &mut Database, db_path: &Path, fact: &str, category: &str, now: Now) -> Result<String, CoachError> {
    db.add_fact(fact, category, now.utc)?;
    db.save(db_path)?;
    Ok(format!("Remembered: {} (category: {})", fact.trim(), category.trim()))
}

pub fn cmd_facts(db: &Database) -> Result<String, CoachError> {
    let facts = db.recent_facts(FACTS_LIMIT);
    if facts.is_empty() {
        return Ok("No facts remembered yet.".to_string());
    }
    Ok(format_facts(&facts))
}

pub fn cmd_note_path(vault: &Vault, date: NaiveDate) -> Result<String, CoachError> {
    let status = if vault.exists(date) { "exists" } else { "does not exist" };
    Ok(format!("Daily note path: {}\nStatus: {status}", vault.path(date).display()))
}

/// Metadata and every section of a note, with long bodies cut short.
pub fn cmd_read_note(vault: &Vault, date: NaiveDate) -> Result<String, CoachError> {
    let note = vault.read(date)?.ok_or(crate::error::NoteError::NoteNotFound(date))?;
    let mut out = format!("Daily note: {}\n", note.path.display());

    if !note.document.metadata.is_empty() {
        out.push_str("\nMetadata:\n");
        for (key, value) in &note.document.metadata {
            out.push_str(&format!("  {}: {}\n", yaml_scalar(key), yaml_scalar(value)));
        }
    }

    out.push_str("\nSections:\n");
    for (name, body) in note.document.section_map() {
        out.push_str(&format!("\n### {name}\n"));
        if body.chars().count() > READ_NOTE_PREVIEW_CHARS {
            let preview: String = body.chars().take(READ_NOTE_PREVIEW_CHARS).collect();
            out.push_str(&preview);
            out.push_str("...\n(content truncated, use read-section for the full text)\n");
        } else if !body.is_empty() {
            out.push_str(body);
            out.push('\n');
        }
    }
    Ok(out)
}

pub fn cmd_read_section(vault: &Vault, date: NaiveDate, section: &str) -> Result<String, CoachError> {
    let body = vault.read_section(date, section)?;
    Ok(format!("## {section}\n\n{body}"))
}

pub fn cmd_write_section(
    vault: &Vault,
    date: NaiveDate,
    section: &str,
    content: &str,
    replace: bool,
) -> Result<String, CoachError> {
    vault.replace_or_append_section(date, section, content, !replace)?;
    let action = if replace { "Updated" } else { "Appended to" };
    Ok(format!("{action} section '{section}' in the note for {date}."))
}

pub fn cmd_add_section(
    vault: &Vault,
    date: NaiveDate,
    name: &str,
    content: &str,
    emoji: Option<&str>,
) -> Result<String, CoachError> {
    vault.add_section(date, name, content, emoji)?;
    Ok(format!("Added section '{name}' to the note for {date}."))
}

pub fn cmd_add_task(
    vault: &Vault,
    date: NaiveDate,
    text: &str,
    priority: Priority,
    now: Now,
) -> Result<String, CoachError> {
    let created = planner::add_task_to_note(vault, date, text, priority, now)?;
    let mut message = format!("Added '{}' ({}) to the note for {date}.", text.trim(), format_priority(priority));
    if created {
        message.push_str(&format!("\nCreated {}", vault.path(date).display()));
    }
    Ok(message)
}

pub fn cmd_check(vault: &Vault, date: NaiveDate, text: &str, undo: bool) -> Result<String, CoachError> {
    vault.set_task_status(date, text, !undo)?;
    let action = if undo { "Unchecked" } else { "Checked off" };
    Ok(format!("{action} '{}' in the note for {date}.", text.trim()))
}

/// Append to the note's Accomplishments section, then record the entry in the store.
pub fn cmd_accomplish(
    vault: &Vault,
    db: &mut Database,
    db_path: &Path,
    date: NaiveDate,
    text: &str,
    now: Now,
) -> Result<String, CoachError> {
    vault.add_accomplishment(date, text, now.time)?;
    db.log_accomplishment(text, now.utc)?;
    db.save(db_path)?;
    Ok(format!("Logged accomplishment: {}", text.trim()))
}

pub fn cmd_sync(vault: &Vault, db: &mut Database, db_path: &Path, date: NaiveDate, now: Now) -> Result<String, CoachError> {
    let report = planner::sync_note(vault, db, db_path, date, now.utc)?;
    Ok(planner::render_sync_report(date, &report))
}

pub fn cmd_create_note(
    vault: &Vault,
    db: &mut Database,
    db_path: &Path,
    date: NaiveDate,
    max_tasks: usize,
    now: Now,
) -> Result<String, CoachError> {
    let created = planner::create_daily_note(vault, db, db_path, date, max_tasks, now)?;
    let mut out = format!("Created daily note: {}\n", created.path.display());
    out.push_str(&format!(
        "Picked {} of {} active tasks.\n",
        created.selection.len(),
        created.selection.backlog_count
    ));
    if !created.carried_over.is_empty() {
        out.push_str(&format!("Carried over {} tasks from yesterday.\n", created.carried_over.len()));
    }
    if let Some(task) = created.selection.quick_wins.first() {
        out.push_str(&format!("Quick win to start: {}\n", task.title));
    }
    Ok(out)
}

/// Generate completion script text for `shell`.
pub fn cmd_completions(shell: Shell) -> String {
    use clap::CommandFactory;
    use crate::cli::Cli;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    let mut buf: Vec<u8> = Vec::new();
    generate(shell, &mut app, app_name, &mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

fn yaml_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "~".to_string(),
        other => serde_yaml::to_string(other).map(|s| s.trim().to_string()).unwrap_or_default(),
    }
}
