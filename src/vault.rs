//! Daily-note vault: one markdown file per calendar date.
//!
//! The file for a date is `root/<template>` with the single `{date}` placeholder replaced by
//! the ISO date. Every mutation re-reads the note, edits the parsed [`Document`], renders it
//! and replaces the file through a staged temp-file + rename.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveTime};
use tracing::{debug, info};

use crate::atomic::write_atomic;
use crate::document::{self, Document, ACCOMPLISHMENTS_SECTION};
use crate::error::NoteError;
use crate::fields::Priority;

pub const DEFAULT_NOTES_FORMAT: &str = "Daily Notes/{date}.md";
const DATE_PLACEHOLDER: &str = "{date}";

/// A note read from disk.
#[derive(Debug, Clone)]
pub struct Note {
    pub date: NaiveDate,
    pub path: PathBuf,
    pub document: Document,
}

/// Handle to a vault directory and its daily-note naming template.
#[derive(Debug, Clone)]
pub struct Vault {
    root: PathBuf,
    template: String,
}

impl Vault {
    /// Open an existing vault directory.
    pub fn open(root: impl Into<PathBuf>, template: &str) -> Result<Self, NoteError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(NoteError::VaultMissing(root));
        }
        if template.matches(DATE_PLACEHOLDER).count() != 1 || Path::new(template).is_absolute() {
            return Err(NoteError::InvalidTemplate(template.to_string()));
        }
        Ok(Vault { root, template: template.to_string() })
    }

    /// Location of the note for `date`.
    pub fn path(&self, date: NaiveDate) -> PathBuf {
        let iso = date.format("%Y-%m-%d").to_string();
        self.root.join(self.template.replace(DATE_PLACEHOLDER, &iso))
    }

    pub fn exists(&self, date: NaiveDate) -> bool {
        self.path(date).is_file()
    }

    /// Read and parse the note for `date`, or `None` if it does not exist.
    pub fn read(&self, date: NaiveDate) -> Result<Option<Note>, NoteError> {
        let path = self.path(date);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(NoteError::Io { path, source }),
        };
        debug!(%date, path = %path.display(), "read daily note");
        let document = document::parse(&raw)?;
        Ok(Some(Note { date, path, document }))
    }

    fn load(&self, date: NaiveDate) -> Result<Note, NoteError> {
        self.read(date)?.ok_or(NoteError::NoteNotFound(date))
    }

    fn store(&self, note: &Note) -> Result<(), NoteError> {
        let rendered = note.document.render()?;
        write_atomic(&note.path, rendered.as_bytes())
            .map_err(|source| NoteError::Io { path: note.path.clone(), source })?;
        info!(date = %note.date, path = %note.path.display(), "wrote daily note");
        Ok(())
    }

    /// Create the note for `date`. Never overwrites an existing note.
    pub fn create(&self, date: NaiveDate, document: &Document) -> Result<PathBuf, NoteError> {
        let path = self.path(date);
        if path.exists() {
            return Err(NoteError::AlreadyExists(path));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|source| NoteError::Io { path: parent.to_path_buf(), source })?;
        }
        let note = Note { date, path: path.clone(), document: document.clone() };
        self.store(&note)?;
        Ok(path)
    }

    /// Body of one section of the note.
    pub fn read_section(&self, date: NaiveDate, section: &str) -> Result<String, NoteError> {
        let note = self.load(date)?;
        note.document
            .section(section)
            .map(|s| s.body.clone())
            .ok_or_else(|| NoteError::SectionNotFound { date, section: section.to_string() })
    }

    /// Replace an existing section's body, or append to it separated by a blank line.
    pub fn replace_or_append_section(
        &self,
        date: NaiveDate,
        section: &str,
        content: &str,
        append: bool,
    ) -> Result<(), NoteError> {
        let mut note = self.load(date)?;
        if !note.document.set_section_body(section, content, append) {
            return Err(NoteError::SectionNotFound { date, section: section.to_string() });
        }
        self.store(&note)
    }

    /// Append a new section at the end of the note.
    pub fn add_section(
        &self,
        date: NaiveDate,
        section: &str,
        content: &str,
        emoji: Option<&str>,
    ) -> Result<(), NoteError> {
        let mut note = self.load(date)?;
        note.document.push_section(section, content, emoji)?;
        self.store(&note)
    }

    /// Insert a checkbox line for `text` into the Tasks section.
    pub fn add_task(&self, date: NaiveDate, text: &str, priority: Priority) -> Result<(), NoteError> {
        let mut note = self.load(date)?;
        note.document.insert_task_line(&document::format_task_line(text, priority), priority);
        self.store(&note)
    }

    /// Check or uncheck the first task line whose text starts with `text`.
    pub fn set_task_status(&self, date: NaiveDate, text: &str, completed: bool) -> Result<(), NoteError> {
        let mut note = self.load(date)?;
        if !note.document.set_task_completed(text, completed) {
            return Err(NoteError::TaskLineNotFound { date, text: text.to_string() });
        }
        self.store(&note)
    }

    /// Append a timestamped bullet to the Accomplishments section.
    pub fn add_accomplishment(&self, date: NaiveDate, text: &str, at: NaiveTime) -> Result<(), NoteError> {
        let mut note = self.load(date)?;
        let item = format!("- {} ({})", text.trim(), format_clock(at));
        if !note.document.append_list_item(ACCOMPLISHMENTS_SECTION, &item) {
            return Err(NoteError::SectionNotFound { date, section: ACCOMPLISHMENTS_SECTION.to_string() });
        }
        self.store(&note)
    }
}

/// `09:05am` style clock used in note bullets.
pub fn format_clock(t: NaiveTime) -> String {
    t.format("%I:%M%p").to_string().to_lowercase()
}
