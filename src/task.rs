//! Task data structure and related functionality.
//!
//! This module defines the `Task` record kept in the backlog store, together with
//! the bracketed note tags (`[Deadline]`, `[Quick Win]`, ...) the selector reads.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::document::format_task_line;
use crate::fields::*;

pub const TAG_DEADLINE: &str = "[Deadline]";
pub const TAG_QUICK_WIN: &str = "[Quick Win]";
pub const TAG_SPRINT_WORK: &str = "[Sprint Work]";
pub const TAG_MANAGEMENT: &str = "[Management]";

/// A backlog item.
///
/// `created_at_utc` is the creation timestamp in seconds; together with `id` it forms
/// the stable secondary sort key used wherever "oldest first" ordering is needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub time_estimate: Option<u32>,
    #[serde(default)]
    pub skipped_count: u32,
    #[serde(default)]
    pub last_scheduled: Option<NaiveDate>,
    pub created_at_utc: i64,
    #[serde(default)]
    pub completed_at_utc: Option<i64>,
}

impl Task {
    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }

    /// Whether the free-text notes carry a bracketed tag such as `[Deadline]`.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.notes.contains(tag)
    }

    /// Key for "oldest created first" ordering.
    pub fn creation_key(&self) -> (i64, u64) {
        (self.created_at_utc, self.id)
    }

    /// Render this task as an open checkbox line for a daily note.
    pub fn to_note_line(&self) -> String {
        format_task_line(&self.title, self.priority)
    }
}

/// Validated input for creating a task.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub priority: Priority,
    pub notes: String,
    pub time_estimate: Option<u32>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        NewTask { title: title.into(), ..Default::default() }
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn time_estimate(mut self, minutes: Option<u32>) -> Self {
        self.time_estimate = minutes;
        self
    }

    /// Mark as a quick win: low priority and a `[Quick Win]` tag in the notes.
    pub fn quick(mut self) -> Self {
        self.priority = Priority::Low;
        if !self.notes.contains(TAG_QUICK_WIN) {
            self.notes = if self.notes.trim().is_empty() {
                TAG_QUICK_WIN.to_string()
            } else {
                format!("{} {}", TAG_QUICK_WIN, self.notes.trim())
            };
        }
        self
    }
}
