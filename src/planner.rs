//! Daily planning: reconciling notes into the backlog and generating new notes.
//!
//! The flow for a day is: read yesterday's note, mark checked tasks completed in the
//! backlog, bump the skip count of tasks left open, select today's tasks, and write
//! today's note. Active goals and recent facts from the store shape the new note's
//! focus, tasks and insights. The store is saved once per operation, after the note write
//! succeeds, so a failed note write leaves the backlog untouched on disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{Datelike, Local, NaiveDate, NaiveTime, Weekday};
use serde_yaml::{Mapping, Value};
use tracing::{info, warn};

use crate::db::Database;
use crate::document::{format_task_line, Document, TaskLine, NOTES_SECTION};
use crate::error::{CoachError, MatchNotFound, NoteError, StoreError};
use crate::fields::Priority;
use crate::goal::{Fact, Goal};
use crate::matcher::match_title;
use crate::selection::{select_and_stamp, Selection};
use crate::task::Task;
use crate::vault::{format_clock, Note, Vault};

/// Unfinished lines from yesterday copied into a new note.
pub const MAX_CARRIED_OVER: usize = 3;
pub const MAX_NOTE_GOALS: usize = 3;
pub const MAX_NOTE_FACTS: usize = 3;
const BRIEFING_TASK_LIMIT: usize = 10;
const SUMMARY_LIST_LIMIT: usize = 5;
const SUMMARY_SHORT_LIMIT: usize = 3;

const TASKS_PLACEHOLDER: &str = "<!-- Tasks will appear here -->";
const ACCOMPLISHMENTS_PLACEHOLDER: &str = "<!-- You'll add your wins here as you complete things! -->";

/// Wall-clock reading taken once per command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Now {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub utc: i64,
}

impl Now {
    pub fn local() -> Self {
        let now = Local::now();
        Now { date: now.date_naive(), time: now.time(), utc: now.timestamp() }
    }
}

/// An unchecked note line and the backlog task it refers to, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenLine {
    pub line: TaskLine,
    pub task_id: Option<u64>,
}

/// Outcome of reconciling one note against the backlog.
///
/// Unmatched checked lines are warnings; a report with some of them is still a success.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Tasks completed by this run, as `(id, title)`.
    pub completed: Vec<(u64, String)>,
    /// Checked lines that refer to tasks completed earlier.
    pub already_done: Vec<u64>,
    pub open: Vec<OpenLine>,
    pub unmatched: Vec<MatchNotFound>,
}

impl SyncReport {
    /// Active tasks that were on the note but left unchecked.
    pub fn carried_over_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.open.iter().filter_map(|o| o.task_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

/// A note generated from a fresh selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedNote {
    pub path: PathBuf,
    pub selection: Selection,
    pub carried_over: Vec<TaskLine>,
}

/// Goals and facts a new note draws on besides the task selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteContext {
    pub goals: Vec<Goal>,
    pub facts: Vec<Fact>,
}

impl NoteContext {
    /// The oldest active goals and the newest facts, each capped for a single note.
    pub fn from_store(db: &Database) -> Self {
        NoteContext {
            goals: db.active_goals().into_iter().take(MAX_NOTE_GOALS).cloned().collect(),
            facts: db.recent_facts(MAX_NOTE_FACTS).into_iter().cloned().collect(),
        }
    }
}

/// Everything the start-of-day briefing reports.
#[derive(Debug, Clone)]
pub struct Briefing {
    pub date: NaiveDate,
    pub note_path: PathBuf,
    /// Reconciliation of yesterday's note, if there was one.
    pub sync: Option<SyncReport>,
    /// Number of tasks whose skip count went up.
    pub skipped: usize,
    /// Set when today's note was created by this run.
    pub created: Option<CreatedNote>,
    pub today_tasks: Vec<TaskLine>,
}

/// Mark backlog tasks completed for every checked line of the note's Tasks section.
///
/// Candidates are the active tasks in ascending id order; a task completed by one line
/// is not offered to later lines. Unchecked lines are matched too, for skip tracking.
pub fn reconcile(document: &Document, db: &mut Database, now_utc: i64) -> Result<SyncReport, StoreError> {
    let mut active = db.active_titles();
    let mut finished: BTreeMap<u64, String> =
        db.tasks.iter().filter(|t| !t.is_active()).map(|t| (t.id, t.title.clone())).collect();
    let mut report = SyncReport::default();

    for line in document.tasks() {
        if !line.completed {
            let task_id = match_title(&line.text, &active);
            report.open.push(OpenLine { line, task_id });
            continue;
        }
        if let Some(id) = match_title(&line.text, &active) {
            active.remove(&id);
            let task = db.complete(id, now_utc)?;
            finished.insert(id, task.title.clone());
            report.completed.push((id, task.title.clone()));
        } else if let Some(id) = match_title(&line.text, &finished) {
            report.already_done.push(id);
        } else {
            warn!(text = %line.text, "checked task has no backlog match");
            report.unmatched.push(MatchNotFound { text: line.text });
        }
    }

    info!(
        completed = report.completed.len(),
        open = report.open.len(),
        unmatched = report.unmatched.len(),
        "reconciled note"
    );
    Ok(report)
}

/// Reconcile the note for `date` and persist the completions.
pub fn sync_note(
    vault: &Vault,
    db: &mut Database,
    db_path: &Path,
    date: NaiveDate,
    now_utc: i64,
) -> Result<SyncReport, CoachError> {
    let note = vault.read(date)?.ok_or(NoteError::NoteNotFound(date))?;
    let report = reconcile(&note.document, db, now_utc)?;
    if !report.completed.is_empty() {
        db.save(db_path)?;
    }
    Ok(report)
}

/// Select tasks for `date` and create its note. An existing note is never touched and
/// nothing is stamped in that case.
pub fn create_daily_note(
    vault: &Vault,
    db: &mut Database,
    db_path: &Path,
    date: NaiveDate,
    max_tasks: usize,
    now: Now,
) -> Result<CreatedNote, CoachError> {
    let path = vault.path(date);
    if path.exists() {
        return Err(NoteError::AlreadyExists(path).into());
    }
    let open: Vec<TaskLine> = match previous_note(vault, date)? {
        Some(note) => note.document.tasks().into_iter().filter(|t| !t.completed).collect(),
        None => Vec::new(),
    };
    let created = generate(vault, db, date, max_tasks, &open, now.time)?;
    db.save(db_path)?;
    Ok(created)
}

/// Run the whole start-of-day flow for `date`.
///
/// Yesterday's completions are always reconciled. Skip counts and selection only happen
/// when today's note is created, so running this twice in a day changes nothing more.
pub fn start_day(
    vault: &Vault,
    db: &mut Database,
    db_path: &Path,
    date: NaiveDate,
    max_tasks: usize,
    now: Now,
) -> Result<Briefing, CoachError> {
    let sync = match previous_note(vault, date)? {
        Some(note) => Some(reconcile(&note.document, db, now.utc)?),
        None => None,
    };

    let mut skipped = 0;
    let created = if vault.exists(date) {
        None
    } else {
        if let Some(report) = &sync {
            skipped = db.increment_skips(&report.carried_over_ids());
        }
        let open: Vec<TaskLine> =
            sync.iter().flat_map(|r| r.open.iter().map(|o| o.line.clone())).collect();
        Some(generate(vault, db, date, max_tasks, &open, now.time)?)
    };
    db.save(db_path)?;

    let today = vault.read(date)?.ok_or(NoteError::NoteNotFound(date))?;
    info!(%date, created = created.is_some(), skipped, "started day");
    Ok(Briefing { date, note_path: today.path, sync, skipped, created, today_tasks: today.document.tasks() })
}

/// Add a task line to the note for `date`, creating a blank note first if needed.
/// Returns `true` if the note was created.
pub fn add_task_to_note(
    vault: &Vault,
    date: NaiveDate,
    text: &str,
    priority: Priority,
    now: Now,
) -> Result<bool, NoteError> {
    if vault.exists(date) {
        vault.add_task(date, text, priority)?;
        return Ok(false);
    }
    let mut document = build_daily_note(date, &Selection::default(), &[], &NoteContext::default(), now.time)?;
    document.insert_task_line(&format_task_line(text, priority), priority);
    vault.create(date, &document)?;
    Ok(true)
}

fn previous_note(vault: &Vault, date: NaiveDate) -> Result<Option<Note>, NoteError> {
    match date.pred_opt() {
        Some(yesterday) => vault.read(yesterday),
        None => Ok(None),
    }
}

fn generate(
    vault: &Vault,
    db: &mut Database,
    date: NaiveDate,
    max_tasks: usize,
    open: &[TaskLine],
    at: NaiveTime,
) -> Result<CreatedNote, NoteError> {
    let selection = select_and_stamp(db, date, max_tasks);
    let carried_over = carried_over_lines(open, &selection);
    let context = NoteContext::from_store(db);
    let document = build_daily_note(date, &selection, &carried_over, &context, at)?;
    let path = vault.create(date, &document)?;
    Ok(CreatedNote { path, selection, carried_over })
}

/// Unfinished lines worth copying forward: those not already covered by a selected task.
pub fn carried_over_lines(open: &[TaskLine], selection: &Selection) -> Vec<TaskLine> {
    let selected: BTreeMap<u64, String> = selection.iter().map(|t| (t.id, t.title.clone())).collect();
    open.iter()
        .filter(|line| match_title(&line.text, &selected).is_none())
        .take(MAX_CARRIED_OVER)
        .cloned()
        .collect()
}

/// Build the document for a new daily note.
pub fn build_daily_note(
    date: NaiveDate,
    selection: &Selection,
    carried_over: &[TaskLine],
    context: &NoteContext,
    at: NaiveTime,
) -> Result<Document, NoteError> {
    let mut metadata = Mapping::new();
    metadata.insert(Value::from("date"), Value::from(date.format("%Y-%m-%d").to_string()));
    metadata.insert(Value::from("type"), Value::from("daily-note"));
    metadata.insert(Value::from("day_of_week"), Value::from(date.format("%A").to_string().to_lowercase()));

    let mut document = Document::new(metadata);
    document.preamble = format!("# {}", long_date(date));
    document.push_section("Focus for Today", &focus_text(selection, carried_over, &context.goals), Some("🎯"))?;
    if let Some(task) = selection.quick_wins.first() {
        document.push_section("Quick Win (Start Here)", &quick_win_text(task), Some("⚡"))?;
    }
    document.push_section("Tasks", &tasks_text(selection, carried_over, &context.goals), Some("✅"))?;
    document.push_section("Accomplishments", ACCOMPLISHMENTS_PLACEHOLDER, Some("💪"))?;
    document.push_section(NOTES_SECTION, "", Some("📝"))?;
    document.push_section("Coach Insights", &insights_text(date, selection, carried_over, context, at), Some("🧠"))?;
    Ok(document)
}

/// `Friday, November 07, 2025`.
pub fn long_date(date: NaiveDate) -> String {
    date.format("%A, %B %d, %Y").to_string()
}

fn focus_text(selection: &Selection, carried_over: &[TaskLine], goals: &[Goal]) -> String {
    let main = selection.critical.first().or(selection.important.first()).or(selection.quick_wins.first());
    match main {
        Some(task) => {
            let backup = selection
                .iter()
                .find(|t| t.id != task.id)
                .map(|t| t.title.clone())
                .or_else(|| goals.first().map(|g| format!("Make progress on {}", g.goal)))
                .unwrap_or_else(|| "Clear one small item from the backlog".to_string());
            format!("**Main Goal:** {}\n**Backup Goal:** {}", task.title, backup)
        }
        None if !carried_over.is_empty() => {
            "**Main Goal:** Continue momentum from yesterday\n**Backup Goal:** If stuck, work on your goals instead".to_string()
        }
        None if !goals.is_empty() => {
            format!("**Main Goal:** {}\n**Backup Goal:** Make progress on any active goal", goals[0].goal)
        }
        None => "**Main Goal:** Define your priorities for today\n**Backup Goal:** Review the backlog".to_string(),
    }
}

fn quick_win_text(task: &Task) -> String {
    match task.time_estimate {
        Some(minutes) => format!("Start with **{}** (~{} min)", task.title, minutes),
        None => format!("Start with **{}**", task.title),
    }
}

fn tasks_text(selection: &Selection, carried_over: &[TaskLine], goals: &[Goal]) -> String {
    let mut blocks: Vec<String> = Vec::new();
    let groups = [
        ("Critical", &selection.critical),
        ("Important", &selection.important),
        ("Quick Wins", &selection.quick_wins),
    ];
    for (heading, tasks) in groups {
        if tasks.is_empty() {
            continue;
        }
        let lines: Vec<String> = tasks.iter().map(Task::to_note_line).collect();
        blocks.push(format!("### {}\n{}", heading, lines.join("\n")));
    }
    if !carried_over.is_empty() {
        let lines: Vec<String> = carried_over.iter().map(|l| format_task_line(&l.text, l.priority)).collect();
        blocks.push(format!("### Carried Over\n{}", lines.join("\n")));
    }
    if !goals.is_empty() {
        let lines: Vec<String> = goals.iter().map(Goal::to_note_line).collect();
        blocks.push(format!("### From Your Goals\n{}", lines.join("\n")));
    }
    if blocks.is_empty() {
        TASKS_PLACEHOLDER.to_string()
    } else {
        blocks.join("\n\n")
    }
}

fn insights_text(
    date: NaiveDate,
    selection: &Selection,
    carried_over: &[TaskLine],
    context: &NoteContext,
    at: NaiveTime,
) -> String {
    let mut lines = vec![format!("Created: {}", format_clock(at)), String::new()];
    if selection.is_empty() {
        lines.push(format!("No task was picked from {} active tasks.", selection.backlog_count));
    } else {
        lines.push(format!("Picked {} of {} active tasks.", selection.len(), selection.backlog_count));
    }
    if !carried_over.is_empty() {
        lines.push(format!("Carried over {} unfinished tasks from yesterday.", carried_over.len()));
    }
    if !context.goals.is_empty() {
        let names: Vec<&str> = context.goals.iter().take(2).map(|g| g.goal.as_str()).collect();
        lines.push(format!("Added work on your active goals: {}.", names.join(", ")));
    }
    if !context.facts.is_empty() {
        lines.push(String::new());
        lines.push("**What I know about you:**".to_string());
        lines.extend(context.facts.iter().map(|f| format!("- {}", f.fact)));
    }
    if date.weekday() == Weekday::Mon {
        lines.push("It's Monday. Start with the quick win to get moving.".to_string());
    }
    lines.join("\n")
}

/// Human-readable result of a sync.
pub fn render_sync_report(date: NaiveDate, report: &SyncReport) -> String {
    let mut out = format!("Synced note for {date}: {} task(s) completed.\n", report.completed.len());
    for (id, title) in &report.completed {
        out.push_str(&format!("  ✓ [{id}] {title}\n"));
    }
    if !report.already_done.is_empty() {
        out.push_str(&format!("  {} checked task(s) were already completed.\n", report.already_done.len()));
    }
    if !report.open.is_empty() {
        out.push_str(&format!("  {} task(s) still open.\n", report.open.len()));
    }
    for warning in &report.unmatched {
        out.push_str(&format!("  ⚠ {warning}\n"));
    }
    out
}

/// Human-readable start-of-day briefing.
pub fn render_briefing(briefing: &Briefing) -> String {
    let mut out = format!("=== Daily briefing: {} ===\n\n", long_date(briefing.date));

    match &briefing.sync {
        Some(report) => {
            out.push_str(&format!("Yesterday: {} task(s) completed.\n", report.completed.len()));
            for (_, title) in &report.completed {
                out.push_str(&format!("  ✓ {title}\n"));
            }
            if !report.open.is_empty() {
                out.push_str(&format!("  {} task(s) left open", report.open.len()));
                if briefing.skipped > 0 {
                    out.push_str(&format!(", {} marked as skipped", briefing.skipped));
                }
                out.push_str(".\n");
            }
            for warning in &report.unmatched {
                out.push_str(&format!("  ⚠ {warning}\n"));
            }
        }
        None => out.push_str("Yesterday: no daily note.\n"),
    }
    out.push('\n');

    match &briefing.created {
        Some(created) => {
            out.push_str(&format!("Created today's note: {}\n", created.path.display()));
            let s = &created.selection;
            out.push_str(&format!("Picked {} of {} active tasks.\n", s.len(), s.backlog_count));
            for (label, tasks) in [("Critical", &s.critical), ("Important", &s.important), ("Quick wins", &s.quick_wins)] {
                if !tasks.is_empty() {
                    let titles: Vec<&str> = tasks.iter().map(|t| t.title.as_str()).collect();
                    out.push_str(&format!("  {label}: {}\n", titles.join(", ")));
                }
            }
            if !created.carried_over.is_empty() {
                let texts: Vec<&str> = created.carried_over.iter().map(|l| l.text.as_str()).collect();
                out.push_str(&format!("  Carried over: {}\n", texts.join(", ")));
            }
        }
        None => out.push_str(&format!("Today's note already exists: {}\n", briefing.note_path.display())),
    }

    if !briefing.today_tasks.is_empty() {
        out.push_str(&format!("\nToday's tasks ({}):\n", briefing.today_tasks.len()));
        for task in briefing.today_tasks.iter().take(BRIEFING_TASK_LIMIT) {
            let mark = if task.completed { "✅" } else { "⬜" };
            out.push_str(&format!("  {mark} {}\n", task.text));
        }
        if briefing.today_tasks.len() > BRIEFING_TASK_LIMIT {
            out.push_str(&format!("  ... and {} more\n", briefing.today_tasks.len() - BRIEFING_TASK_LIMIT));
        }
    }

    if let Some(task) = briefing.created.as_ref().and_then(|c| c.selection.quick_wins.first()) {
        out.push_str(&format!("\n⚡ Start with the quick win: {}\n", task.title));
    }
    out
}

/// End-of-day summary of the note for `date`.
pub fn daily_summary(vault: &Vault, date: NaiveDate, at: NaiveTime) -> Result<String, NoteError> {
    let note = vault.read(date)?.ok_or(NoteError::NoteNotFound(date))?;
    Ok(render_summary(&note.document, date, at))
}

pub fn render_summary(document: &Document, date: NaiveDate, at: NaiveTime) -> String {
    let tasks = document.tasks();
    let done: Vec<&TaskLine> = tasks.iter().filter(|t| t.completed).collect();
    let open: Vec<&TaskLine> = tasks.iter().filter(|t| !t.completed).collect();
    let accomplishments = document.accomplishments();

    let mut out = format!("# Summary for {}\n\n", long_date(date));

    if tasks.is_empty() {
        out.push_str("## 📊 No tasks tracked today\n\n");
    } else {
        let rate = done.len() as f64 / tasks.len() as f64 * 100.0;
        out.push_str(&format!("## 📊 Completion Rate: {rate:.0}%\n"));
        out.push_str(&format!("- Completed: {}/{} tasks\n\n", done.len(), tasks.len()));
    }

    if !done.is_empty() || !accomplishments.is_empty() {
        out.push_str("## ✅ What Went Well\n");
        for task in done.iter().take(SUMMARY_LIST_LIMIT) {
            out.push_str(&format!("- {}\n", task.text));
        }
        for item in &accomplishments {
            out.push_str(&format!("- {item}\n"));
        }
        out.push('\n');
    }

    if !open.is_empty() {
        out.push_str("## ⏸️ Carried Over\n");
        out.push_str(&format!("{} tasks to consider for tomorrow:\n", open.len()));
        for task in open.iter().take(SUMMARY_SHORT_LIMIT) {
            out.push_str(&format!("- {}\n", task.text));
        }
        out.push('\n');
    }

    let notes: Vec<&str> = document
        .section(NOTES_SECTION)
        .map(|s| s.body.lines().map(str::trim).filter(|l| !l.is_empty() && !l.starts_with("<!--")).collect())
        .unwrap_or_default();
    if !notes.is_empty() {
        out.push_str("## 💭 Key Notes\n");
        for line in notes.iter().take(SUMMARY_SHORT_LIMIT) {
            out.push_str(&format!("- {line}\n"));
        }
        out.push('\n');
    }

    out.push_str("## 🎯 Recommendations\n");
    if open.len() > 5 {
        out.push_str("- Consider breaking down or delegating some tasks: quite a few are still open\n");
    }
    if done.len() > 3 {
        out.push_str("- Great productivity today! Keep the momentum going\n");
    }
    if tasks.is_empty() {
        out.push_str("- Start tracking your tasks in the daily note for better visibility\n");
    }

    out.push_str(&format!("\n_Generated at {}_", format_clock(at)));
    out
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::document;
    use crate::fields::Status;
    use crate::task::NewTask;
    use crate::vault::DEFAULT_NOTES_FORMAT;
    use pretty_assertions::assert_eq;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 7).unwrap()
    }

    fn now() -> Now {
        Now { date: today(), time: NaiveTime::from_hms_opt(8, 30, 0).unwrap(), utc: 1_762_500_000 }
    }

    fn setup() -> (tempfile::TempDir, Vault, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("vault");
        fs::create_dir_all(&root).unwrap();
        let vault = Vault::open(&root, DEFAULT_NOTES_FORMAT).unwrap();
        let db_path = dir.path().join("store").join("tasks.json");
        (dir, vault, db_path)
    }

    fn write_note(vault: &Vault, date: NaiveDate, raw: &str) {
        let path = vault.path(date);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, raw).unwrap();
    }

    /// Backlog from the selection scenario plus two extra tasks.
    fn backlog() -> Database {
        let mut db = Database::default();
        db.add_task(NewTask::new("Write report").priority(Priority::High).notes("[Deadline] due 11/07"), 100)
            .unwrap();
        db.add_task(NewTask::new("File invoice").quick().time_estimate(Some(10)), 200).unwrap();
        db.add_task(NewTask::new("Review PR"), 300).unwrap();
        db.add_task(NewTask::new("Call the bank"), 400).unwrap();
        let chore = db.add_task(NewTask::new("Old chore").priority(Priority::Low), 50).unwrap();
        db.get_mut(chore).unwrap().skipped_count = 4;
        db
    }

    const YESTERDAY: &str = "---
date: '2025-11-06'
type: daily-note
---

# Thursday, November 06, 2025

## ✅ Tasks

### Important
- [x] Call the bank
- [ ] Review PR #high-priority
- [ ] Old chore
- [ ] Water plants
- [x] Mystery errand
";

    fn yesterday() -> NaiveDate {
        today().pred_opt().unwrap()
    }

    #[test]
    fn test_build_daily_note_layout() {
        let db = backlog();
        let selection = crate::selection::select_tasks(&db.tasks, today(), 5);
        let doc = build_daily_note(today(), &selection, &[], &NoteContext::default(), now().time).unwrap();

        assert_eq!(doc.metadata_str("date").as_deref(), Some("2025-11-07"));
        assert_eq!(doc.metadata_str("type").as_deref(), Some("daily-note"));
        assert_eq!(doc.metadata_str("day_of_week").as_deref(), Some("friday"));
        assert_eq!(doc.preamble, "# Friday, November 07, 2025");

        let names: Vec<&str> = doc.sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Focus for Today", "Quick Win (Start Here)", "Tasks", "Accomplishments", "Notes", "Coach Insights"]
        );
        assert_eq!(doc.sections[2].glyph.as_deref(), Some("✅"));

        let lines: Vec<String> = doc.tasks().into_iter().map(|t| t.raw).collect();
        assert_eq!(
            lines,
            vec![
                "- [ ] Write report #high-priority".to_string(),
                "- [ ] Review PR".to_string(),
                "- [ ] Call the bank".to_string(),
                "- [ ] File invoice #low-priority".to_string(),
                "- [ ] Old chore #low-priority".to_string(),
            ]
        );
        assert!(doc.section("quick win (start here)").unwrap().body.contains("File invoice"));
        assert!(doc.section("Coach Insights").unwrap().body.starts_with("Created: 08:30am"));

        // Generated notes survive a parse/render cycle.
        let reparsed = document::parse(&doc.render().unwrap()).unwrap();
        assert_eq!(reparsed, doc);
    }

    #[test]
    fn test_build_daily_note_without_tasks() {
        let doc = build_daily_note(today(), &Selection::default(), &[], &NoteContext::default(), now().time).unwrap();
        assert!(doc.section("Quick Win (Start Here)").is_none());
        assert_eq!(doc.section("Tasks").unwrap().body, TASKS_PLACEHOLDER);
        assert!(doc.section("Focus for Today").unwrap().body.contains("Define your priorities"));
        assert!(doc.tasks().is_empty());
    }

    #[test]
    fn test_goals_and_facts_shape_new_note() {
        let mut db = Database::default();
        db.add_goal("Ship v2", "this week", "work", 1).unwrap();
        db.add_goal("Run 10k", "this month", "health", 2).unwrap();
        db.add_goal("Old goal", "this year", "general", 0).unwrap();
        db.complete_goal(3).unwrap();
        db.add_fact("Works best in mornings", "patterns", 3).unwrap();
        let context = NoteContext::from_store(&db);

        let doc = build_daily_note(today(), &Selection::default(), &[], &context, now().time).unwrap();
        assert_eq!(
            doc.section("Focus for Today").unwrap().body,
            "**Main Goal:** Ship v2\n**Backup Goal:** Make progress on any active goal"
        );
        assert_eq!(
            doc.section("Tasks").unwrap().body,
            "### From Your Goals\n- Work on: Ship v2 (this week)\n- Work on: Run 10k (this month)"
        );
        // Goal bullets are not checkboxes, so sync never sees them.
        assert!(doc.tasks().is_empty());
        let insights = &doc.section("Coach Insights").unwrap().body;
        assert!(insights.contains("No task was picked from 0 active tasks."));
        assert!(insights.contains("Added work on your active goals: Ship v2, Run 10k."));
        assert!(insights.contains("**What I know about you:**\n- Works best in mornings"));
    }

    #[test]
    fn test_created_note_includes_store_goals() {
        let (_dir, vault, db_path) = setup();
        let mut db = backlog();
        db.add_goal("Ship v2", "this week", "work", 1).unwrap();
        create_daily_note(&vault, &mut db, &db_path, today(), 5, now()).unwrap();

        let note = vault.read(today()).unwrap().unwrap();
        assert!(note.document.section("Tasks").unwrap().body.ends_with("### From Your Goals\n- Work on: Ship v2 (this week)"));
        assert_eq!(note.document.tasks().len(), 5);
    }

    #[test]
    fn test_monday_note_mentions_quick_win() {
        let monday = NaiveDate::from_ymd_opt(2025, 11, 10).unwrap();
        let doc = build_daily_note(monday, &Selection::default(), &[], &NoteContext::default(), now().time).unwrap();
        assert!(doc.section("Coach Insights").unwrap().body.contains("It's Monday"));
    }

    #[test]
    fn test_reconcile_completes_matches_and_warns() {
        let mut db = backlog();
        let doc = document::parse(YESTERDAY).unwrap();
        let report = reconcile(&doc, &mut db, 999).unwrap();

        assert_eq!(report.completed, vec![(4, "Call the bank".to_string())]);
        assert_eq!(db.get(4).unwrap().status, Status::Completed);
        assert_eq!(db.get(4).unwrap().completed_at_utc, Some(999));
        assert_eq!(report.unmatched, vec![MatchNotFound { text: "Mystery errand".into() }]);

        let open: Vec<(&str, Option<u64>)> =
            report.open.iter().map(|o| (o.line.text.as_str(), o.task_id)).collect();
        assert_eq!(open, vec![("Review PR", Some(3)), ("Old chore", Some(5)), ("Water plants", None)]);
        assert_eq!(report.carried_over_ids(), vec![3, 5]);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let mut db = backlog();
        let doc = document::parse(YESTERDAY).unwrap();
        reconcile(&doc, &mut db, 1).unwrap();
        let again = reconcile(&doc, &mut db, 2).unwrap();
        assert!(again.completed.is_empty());
        assert_eq!(again.already_done, vec![4]);
        assert_eq!(db.get(4).unwrap().completed_at_utc, Some(1));
    }

    #[test]
    fn test_reconcile_fuzzy_match_and_one_task_per_line() {
        let mut db = Database::default();
        db.add_task(NewTask::new("Renew passport"), 1).unwrap();
        let doc = document::parse("## Tasks\n- [x] renew pasport\n- [x] Renew passport\n").unwrap();
        let report = reconcile(&doc, &mut db, 5).unwrap();
        assert_eq!(report.completed, vec![(1, "Renew passport".to_string())]);
        assert_eq!(report.already_done, vec![1]);
        assert!(report.unmatched.is_empty());
    }

    #[test]
    fn test_sync_note_missing() {
        let (_dir, vault, db_path) = setup();
        let mut db = backlog();
        let err = sync_note(&vault, &mut db, &db_path, today(), 0).unwrap_err();
        assert!(matches!(err, CoachError::Note(NoteError::NoteNotFound(d)) if d == today()));
        assert!(!db_path.exists());
    }

    #[test]
    fn test_sync_note_persists_completions() {
        let (_dir, vault, db_path) = setup();
        write_note(&vault, yesterday(), YESTERDAY);
        let mut db = backlog();
        let report = sync_note(&vault, &mut db, &db_path, yesterday(), 7).unwrap();
        assert_eq!(report.completed.len(), 1);

        let stored = Database::load(&db_path).unwrap();
        assert_eq!(stored.get(4).unwrap().status, Status::Completed);
        let text = render_sync_report(yesterday(), &report);
        assert!(text.contains("[4] Call the bank"));
        assert!(text.contains("Mystery errand"));
    }

    #[test]
    fn test_start_day_end_to_end() {
        let (_dir, vault, db_path) = setup();
        write_note(&vault, yesterday(), YESTERDAY);
        let mut db = backlog();

        let briefing = start_day(&vault, &mut db, &db_path, today(), 5, now()).unwrap();

        let created = briefing.created.as_ref().unwrap();
        assert_eq!(created.selection.ids(), vec![1, 3, 2]);
        let carried: Vec<&str> = created.carried_over.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(carried, vec!["Old chore", "Water plants"]);
        assert_eq!(briefing.skipped, 2);
        assert_eq!(briefing.note_path, vault.path(today()));

        let texts: Vec<&str> = briefing.today_tasks.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["Write report", "Review PR", "File invoice", "Old chore", "Water plants"]);

        let stored = Database::load(&db_path).unwrap();
        assert_eq!(stored.get(4).unwrap().status, Status::Completed);
        assert_eq!(stored.get(3).unwrap().skipped_count, 1);
        assert_eq!(stored.get(5).unwrap().skipped_count, 5);
        assert_eq!(stored.get(3).unwrap().last_scheduled, Some(today()));
        assert_eq!(stored.get(5).unwrap().last_scheduled, None);

        let text = render_briefing(&briefing);
        assert!(text.contains("Friday, November 07, 2025"));
        assert!(text.contains("✓ Call the bank"));
        assert!(text.contains("Mystery errand"));
        assert!(text.contains("Start with the quick win: File invoice"));

        // A second run the same day reports the existing note and changes nothing.
        let mut db = Database::load(&db_path).unwrap();
        let again = start_day(&vault, &mut db, &db_path, today(), 5, now()).unwrap();
        assert!(again.created.is_none());
        assert_eq!(again.skipped, 0);
        assert_eq!(again.sync.as_ref().unwrap().already_done, vec![4]);
        let stored = Database::load(&db_path).unwrap();
        assert_eq!(stored.get(3).unwrap().skipped_count, 1);
        assert!(render_briefing(&again).contains("already exists"));
    }

    #[test]
    fn test_start_day_without_yesterday() {
        let (_dir, vault, db_path) = setup();
        let mut db = Database::default();
        let briefing = start_day(&vault, &mut db, &db_path, today(), 5, now()).unwrap();
        assert!(briefing.sync.is_none());
        assert!(briefing.today_tasks.is_empty());
        assert!(vault.exists(today()));
        assert!(render_briefing(&briefing).contains("no daily note"));
    }

    #[test]
    fn test_create_daily_note_never_overwrites() {
        let (_dir, vault, db_path) = setup();
        write_note(&vault, today(), "## Notes\nmine\n");
        let mut db = backlog();

        let err = create_daily_note(&vault, &mut db, &db_path, today(), 5, now()).unwrap_err();
        assert!(matches!(err, CoachError::Note(NoteError::AlreadyExists(_))));
        assert!(db.tasks.iter().all(|t| t.last_scheduled.is_none()));
        assert!(!db_path.exists());
        assert_eq!(fs::read_to_string(vault.path(today())).unwrap(), "## Notes\nmine\n");
    }

    #[test]
    fn test_create_daily_note_carries_yesterday() {
        let (_dir, vault, db_path) = setup();
        write_note(&vault, yesterday(), YESTERDAY);
        let mut db = backlog();

        let created = create_daily_note(&vault, &mut db, &db_path, today(), 5, now()).unwrap();
        // Without reconciliation or skip tracking the bank call and the old chore are
        // still eligible, so only the unknown line is carried over.
        assert_eq!(created.selection.ids(), vec![1, 3, 4, 2, 5]);
        let carried: Vec<&str> = created.carried_over.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(carried, vec!["Water plants"]);
        assert_eq!(Database::load(&db_path).unwrap().get(1).unwrap().last_scheduled, Some(today()));
    }

    #[test]
    fn test_carried_over_is_capped() {
        let open: Vec<TaskLine> = document::extract_tasks("- [ ] a1\n- [ ] b2\n- [ ] c3\n- [ ] d4");
        assert_eq!(carried_over_lines(&open, &Selection::default()).len(), MAX_CARRIED_OVER);
    }

    #[test]
    fn test_add_task_to_note_creates_missing_note() {
        let (_dir, vault, _) = setup();
        assert!(add_task_to_note(&vault, today(), "Buy stamps", Priority::High, now()).unwrap());
        let note = vault.read(today()).unwrap().unwrap();
        let tasks = note.document.tasks();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].raw, "- [ ] Buy stamps #high-priority");

        assert!(!add_task_to_note(&vault, today(), "Post letter", Priority::Medium, now()).unwrap());
        let texts: Vec<String> = vault.read(today()).unwrap().unwrap().document.tasks().into_iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["Buy stamps".to_string(), "Post letter".to_string()]);
    }

    #[test]
    fn test_render_summary() {
        let raw = "## Tasks\n- [x] One\n- [x] Two #high-priority\n- [ ] Three\n- [ ] Four\n\n\
                   ## Accomplishments\n<!-- wins -->\n- Fixed the build (10:00am)\n\n\
                   ## Notes\n<!-- scratch -->\nFelt focused after lunch\n";
        let doc = document::parse(raw).unwrap();
        let summary = render_summary(&doc, today(), NaiveTime::from_hms_opt(18, 5, 0).unwrap());

        assert!(summary.starts_with("# Summary for Friday, November 07, 2025"));
        assert!(summary.contains("## 📊 Completion Rate: 50%"));
        assert!(summary.contains("- Completed: 2/4 tasks"));
        assert!(summary.contains("- Two\n"));
        assert!(summary.contains("- Fixed the build (10:00am)"));
        assert!(summary.contains("2 tasks to consider for tomorrow"));
        assert!(summary.contains("- Felt focused after lunch"));
        assert!(!summary.contains("scratch"));
        assert!(summary.ends_with("_Generated at 06:05pm_"));
    }

    #[test]
    fn test_render_summary_empty_note() {
        let doc = document::parse("# Just a title\n").unwrap();
        let summary = render_summary(&doc, today(), NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert!(summary.contains("No tasks tracked today"));
        assert!(summary.contains("Start tracking your tasks"));
    }
}
