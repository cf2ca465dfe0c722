//! Task store and utility functions for backlog management.
//!
//! This module provides the `Database` struct holding the backlog, persisted as one
//! pretty-printed JSON file, together with goals, remembered facts and the accomplishment
//! log. Every logical operation mutates the in-memory store and
//! is followed by exactly one [`Database::save`], which is the commit point: a batch of
//! related updates (stamping a whole selection, bumping skip counts) lands together or
//! not at all.

use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::Path;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::atomic::write_atomic;
use crate::error::{NoteError, StoreError};
use crate::fields::*;
use crate::goal::{Accomplishment, Fact, Goal};
use crate::task::{NewTask, Task};

/// In-memory store.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Database {
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub goals: Vec<Goal>,
    #[serde(default)]
    pub facts: Vec<Fact>,
    #[serde(default)]
    pub accomplishments: Vec<Accomplishment>,
}

impl Database {
    /// Load the store from a JSON file. A missing file is an empty store; a file that
    /// exists but cannot be parsed is an error, never silently replaced.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let buf = match std::fs::read_to_string(path) {
            Ok(buf) => buf,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no task store yet, starting empty");
                return Ok(Database::default());
            }
            Err(source) => return Err(StoreError::Io { path: path.to_path_buf(), source }),
        };
        serde_json::from_str(&buf).map_err(|source| StoreError::Parse { path: path.to_path_buf(), source })
    }

    /// Save the store with a staged write (temp file + rename).
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|source| StoreError::Io { path: parent.to_path_buf(), source })?;
        }
        let data = serde_json::to_string_pretty(self)?;
        write_atomic(path, data.as_bytes()).map_err(|source| StoreError::Io { path: path.to_path_buf(), source })?;
        debug!(path = %path.display(), tasks = self.tasks.len(), "saved task store");
        Ok(())
    }

    /// Generate the next available task ID.
    pub fn next_id(&self) -> u64 {
        self.tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1
    }

    /// Get a task by ID.
    pub fn get(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Get a mutable reference to a task by ID.
    pub fn get_mut(&mut self, id: u64) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Validate and insert a new task, returning its id.
    pub fn add_task(&mut self, new: NewTask, now_utc: i64) -> Result<u64, StoreError> {
        let title = new.title.trim();
        if title.is_empty() {
            return Err(StoreError::InvalidTask("title must not be empty".into()));
        }
        if new.time_estimate == Some(0) {
            return Err(StoreError::InvalidTask("time estimate must be a positive number of minutes".into()));
        }
        let id = self.next_id();
        self.tasks.push(Task {
            id,
            title: title.to_string(),
            priority: new.priority,
            notes: new.notes.trim().to_string(),
            status: Status::Active,
            time_estimate: new.time_estimate,
            skipped_count: 0,
            last_scheduled: None,
            created_at_utc: now_utc,
            completed_at_utc: None,
        });
        info!(id, priority = ?new.priority, "added task");
        Ok(id)
    }

    /// Mark a task completed. Completing an already completed task keeps its original
    /// completion time.
    pub fn complete(&mut self, id: u64, now_utc: i64) -> Result<&Task, StoreError> {
        let task = self.get_mut(id).ok_or(StoreError::TaskNotFound(id))?;
        if task.is_active() {
            task.status = Status::Completed;
            task.completed_at_utc = Some(now_utc);
            info!(id, "completed task");
        }
        Ok(task)
    }

    /// Hard-remove a task.
    pub fn delete(&mut self, id: u64) -> Result<Task, StoreError> {
        let idx = self.tasks.iter().position(|t| t.id == id).ok_or(StoreError::TaskNotFound(id))?;
        let task = self.tasks.remove(idx);
        info!(id, "deleted task");
        Ok(task)
    }

    /// Stamp `last_scheduled` on every listed task.
    pub fn mark_scheduled(&mut self, ids: &[u64], date: NaiveDate) {
        let wanted: HashSet<u64> = ids.iter().copied().collect();
        for t in self.tasks.iter_mut().filter(|t| wanted.contains(&t.id)) {
            t.last_scheduled = Some(date);
        }
    }

    /// Bump the skip count of every listed task that is still active.
    /// Returns the number of tasks updated.
    pub fn increment_skips(&mut self, ids: &[u64]) -> usize {
        let wanted: HashSet<u64> = ids.iter().copied().collect();
        let mut bumped = 0;
        for t in self.tasks.iter_mut().filter(|t| t.is_active() && wanted.contains(&t.id)) {
            t.skipped_count += 1;
            bumped += 1;
        }
        if bumped > 0 {
            debug!(bumped, "incremented skip counts");
        }
        bumped
    }

    /// Titles of active tasks keyed by id, in ascending id order.
    pub fn active_titles(&self) -> BTreeMap<u64, String> {
        self.tasks.iter().filter(|t| t.is_active()).map(|t| (t.id, t.title.clone())).collect()
    }

    /// Tasks accepted by `filter`, grouped high→low priority and oldest first within a group.
    pub fn listing(&self, filter: StatusFilter) -> Vec<&Task> {
        let mut out: Vec<&Task> = self.tasks.iter().filter(|t| filter.accepts(t.status)).collect();
        out.sort_by_key(|t| (std::cmp::Reverse(t.priority), t.creation_key()));
        out
    }

    pub fn add_goal(&mut self, goal: &str, timeframe: &str, category: &str, now_utc: i64) -> Result<u64, StoreError> {
        let goal = non_empty(goal, "goal")?;
        let id = self.goals.iter().map(|g| g.id).max().unwrap_or(0) + 1;
        self.goals.push(Goal {
            id,
            goal,
            timeframe: non_empty(timeframe, "timeframe")?,
            category: non_empty(category, "category")?,
            status: Status::Active,
            created_at_utc: now_utc,
        });
        info!(id, "added goal");
        Ok(id)
    }

    pub fn complete_goal(&mut self, id: u64) -> Result<&Goal, StoreError> {
        let goal = self.goals.iter_mut().find(|g| g.id == id).ok_or(StoreError::GoalNotFound(id))?;
        goal.status = Status::Completed;
        info!(id, "completed goal");
        Ok(goal)
    }

    /// Active goals, oldest first.
    pub fn active_goals(&self) -> Vec<&Goal> {
        let mut out: Vec<&Goal> = self.goals.iter().filter(|g| g.is_active()).collect();
        out.sort_by_key(|g| (g.created_at_utc, g.id));
        out
    }

    /// Goals accepted by `filter`, newest first.
    pub fn goal_listing(&self, filter: StatusFilter) -> Vec<&Goal> {
        let mut out: Vec<&Goal> = self.goals.iter().filter(|g| filter.accepts(g.status)).collect();
        out.sort_by_key(|g| std::cmp::Reverse((g.created_at_utc, g.id)));
        out
    }

    pub fn add_fact(&mut self, fact: &str, category: &str, now_utc: i64) -> Result<u64, StoreError> {
        let fact = non_empty(fact, "fact")?;
        let id = self.facts.iter().map(|f| f.id).max().unwrap_or(0) + 1;
        self.facts.push(Fact { id, fact, category: non_empty(category, "category")?, created_at_utc: now_utc });
        info!(id, "remembered fact");
        Ok(id)
    }

    /// The `limit` most recent facts, newest first.
    pub fn recent_facts(&self, limit: usize) -> Vec<&Fact> {
        let mut out: Vec<&Fact> = self.facts.iter().collect();
        out.sort_by_key(|f| std::cmp::Reverse((f.created_at_utc, f.id)));
        out.truncate(limit);
        out
    }

    pub fn log_accomplishment(&mut self, description: &str, now_utc: i64) -> Result<u64, StoreError> {
        let description = non_empty(description, "accomplishment")?;
        let id = self.accomplishments.iter().map(|a| a.id).max().unwrap_or(0) + 1;
        self.accomplishments.push(Accomplishment { id, description, created_at_utc: now_utc });
        debug!(id, "logged accomplishment");
        Ok(id)
    }
}

fn non_empty(text: &str, what: &'static str) -> Result<String, StoreError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(StoreError::EmptyText { what });
    }
    Ok(text.to_string())
}

/// Parse a user-supplied date relative to `today`.
///
/// Supports:
/// - "today", "tomorrow", "yesterday"
/// - "YYYY-MM-DD" format
pub fn parse_date_input(s: &str, today: NaiveDate) -> Result<NaiveDate, NoteError> {
    let trimmed = s.trim();
    match trimmed.to_lowercase().as_str() {
        "today" => return Ok(today),
        "tomorrow" => return Ok(today + Duration::days(1)),
        "yesterday" => return Ok(today - Duration::days(1)),
        _ => {}
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|_| NoteError::InvalidDate { input: s.to_string() })
}

/// Resolve an optional date argument, defaulting to `today`.
pub fn resolve_date(arg: Option<&str>, today: NaiveDate) -> Result<NaiveDate, NoteError> {
    match arg {
        Some(s) => parse_date_input(s, today),
        None => Ok(today),
    }
}

/// Format a priority level for display.
pub fn format_priority(p: Priority) -> &'static str {
    match p {
        Priority::High => "High",
        Priority::Medium => "Medium",
        Priority::Low => "Low",
    }
}

/// Format a task status for display.
pub fn format_status(s: Status) -> &'static str {
    match s {
        Status::Active => "Active",
        Status::Completed => "Completed",
    }
}

/// Format a time estimate for display.
pub fn format_estimate(minutes: Option<u32>) -> String {
    match minutes {
        Some(m) => format!("{m}m"),
        None => "-".into(),
    }
}

/// Render tasks as a fixed-width table, one blank line between priority groups.
pub fn format_table(tasks: &[&Task]) -> String {
    let mut out = format!(
        "{:<5} {:<7} {:<10} {:<6} {:<5} {:<11} {}\n",
        "ID", "Pri", "Status", "Skips", "Est", "Scheduled", "Title"
    );
    let mut group: Option<Priority> = None;
    for t in tasks {
        if group.is_some_and(|g| g != t.priority) {
            out.push('\n');
        }
        group = Some(t.priority);
        let scheduled = t.last_scheduled.map(|d| d.to_string()).unwrap_or_else(|| "-".into());
        out.push_str(&format!(
            "{:<5} {:<7} {:<10} {:<6} {:<5} {:<11} {}\n",
            t.id,
            format_priority(t.priority),
            format_status(t.status),
            t.skipped_count,
            format_estimate(t.time_estimate),
            scheduled,
            truncate(&t.title, 60)
        ));
    }
    out
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

/// Resolve a task identifier (either ID or title) to a task ID.
/// Returns an error if the title has multiple matches so the caller can use the ID instead.
pub fn resolve_task_identifier(identifier: &str, db: &Database) -> Result<u64, StoreError> {
    let identifier = identifier.trim();
    if let Ok(id) = identifier.parse::<u64>() {
        return match db.get(id) {
            Some(_) => Ok(id),
            None => Err(StoreError::TaskNotFound(id)),
        };
    }

    let wanted = identifier.to_lowercase();
    let matches: Vec<u64> =
        db.tasks.iter().filter(|task| task.title.to_lowercase() == wanted).map(|task| task.id).collect();

    match matches.as_slice() {
        [] => Err(StoreError::TitleNotFound(identifier.to_string())),
        [id] => Ok(*id),
        _ => Err(StoreError::AmbiguousTask { title: identifier.to_string(), ids: matches }),
    }
}
