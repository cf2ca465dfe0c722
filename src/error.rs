//! Error types for the note vault and the task store.
//!
//! Each subsystem has its own enum; `CoachError` wraps them so command handlers can use
//! `?` across both and turn the result into a user-facing outcome at the boundary.

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum CoachError {
    #[error(transparent)]
    Note(#[from] NoteError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures of the daily-note document model and vault.
#[derive(Debug, Error)]
pub enum NoteError {
    #[error("invalid date {input:?}: use YYYY-MM-DD, today, yesterday or tomorrow")]
    InvalidDate { input: String },

    #[error("vault not configured: set OBSIDIAN_VAULT_PATH or pass --vault")]
    VaultNotConfigured,

    #[error("vault path does not exist: {}", .0.display())]
    VaultMissing(PathBuf),

    #[error("daily notes format must contain exactly one {{date}} placeholder, got {0:?}")]
    InvalidTemplate(String),

    #[error("no daily note for {0}")]
    NoteNotFound(NaiveDate),

    #[error("section {section:?} not found in the note for {date}")]
    SectionNotFound { date: NaiveDate, section: String },

    #[error("section name must contain text besides an emoji, got {0:?}")]
    InvalidSectionName(String),

    #[error("section emoji must be a single emoji, got {0:?}")]
    InvalidGlyph(String),

    #[error("daily note already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("no task matching {text:?} in the note for {date}")]
    TaskLineNotFound { date: NaiveDate, text: String },

    #[error("malformed front matter: {0}")]
    FrontMatter(#[from] serde_yaml::Error),

    #[error("front matter must be a key/value mapping")]
    FrontMatterShape,

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures of the JSON task store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse task store {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot serialise task store: {0}")]
    Serialise(#[from] serde_json::Error),

    #[error("task {0} not found")]
    TaskNotFound(u64),

    #[error("no task found with title {0:?}")]
    TitleNotFound(String),

    #[error("multiple tasks titled {title:?} (ids {ids:?}); use the id instead")]
    AmbiguousTask { title: String, ids: Vec<u64> },

    #[error("invalid task: {0}")]
    InvalidTask(String),

    #[error("goal {0} not found")]
    GoalNotFound(u64),

    #[error("{what} must not be empty")]
    EmptyText { what: &'static str },
}

/// A checked note line that could not be tied to any backlog task.
///
/// Reconciliation collects these as warnings; they never abort a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no backlog task matches {text:?}")]
pub struct MatchNotFound {
    pub text: String,
}
