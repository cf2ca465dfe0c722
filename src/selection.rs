//! Deterministic daily task selection.
//!
//! The active backlog is split into three bounded buckets:
//!
//! - **critical** (≤1): a task whose notes mention the target date, else a `[Deadline]`
//!   task, else the high-priority task with the fewest skips.
//! - **important** (≤2): remaining high priority (fewest skips first), then
//!   `[Sprint Work]`/`[Management]`, then medium priority oldest first.
//! - **quick wins** (≤3): remaining `[Quick Win]`, then estimates of 30 minutes or less
//!   (smallest first), then low priority oldest first.
//!
//! Tasks skipped five or more times never take part. Input is ordered by creation time
//! before anything else and every sort is stable, so equal inputs give equal output.

use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::db::Database;
use crate::fields::Priority;
use crate::task::*;

pub const DEFAULT_MAX_TASKS: usize = 5;
pub const MAX_CRITICAL: usize = 1;
pub const MAX_IMPORTANT: usize = 2;
pub const MAX_QUICK_WINS: usize = 3;
/// Tasks skipped this many times are left out of automatic selection.
pub const SKIP_LIMIT: u32 = 5;
pub const QUICK_WIN_MINUTES: u32 = 30;

/// Result of a selection run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub critical: Vec<Task>,
    pub important: Vec<Task>,
    pub quick_wins: Vec<Task>,
    /// Number of active tasks in the backlog, stale ones included.
    pub backlog_count: usize,
}

impl Selection {
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.critical.iter().chain(&self.important).chain(&self.quick_wins)
    }

    pub fn ids(&self) -> Vec<u64> {
        self.iter().map(|t| t.id).collect()
    }

    pub fn len(&self) -> usize {
        self.critical.len() + self.important.len() + self.quick_wins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Textual renderings of `date` searched for in task notes.
///
/// Matching is plain substring search, so `11/07` also hits inside `211/075`. This is
/// kept as is: narrowing it would change which task becomes critical.
pub fn deadline_patterns(date: NaiveDate) -> [String; 4] {
    [
        date.format("%Y-%m-%d").to_string(),
        date.format("%m/%d").to_string(),
        date.format("%B %d").to_string(),
        date.format("%b %d").to_string(),
    ]
}

/// Pick today's tasks from `backlog` without touching it.
pub fn select_tasks(backlog: &[Task], target: NaiveDate, max_tasks: usize) -> Selection {
    let mut active: Vec<&Task> = backlog.iter().filter(|t| t.is_active()).collect();
    active.sort_by_key(|t| t.creation_key());
    let backlog_count = active.len();

    let eligible: Vec<&Task> = active.into_iter().filter(|t| t.skipped_count < SKIP_LIMIT).collect();
    let mut claimed: HashSet<u64> = HashSet::new();

    let mut critical: Vec<&Task> = Vec::new();
    if let Some(task) = pick_critical(&eligible, target) {
        claimed.insert(task.id);
        critical.push(task);
    }

    let mut important: Vec<&Task> = Vec::new();
    fill(&mut important, MAX_IMPORTANT, &mut claimed, &eligible, |pool| {
        fewest_skips(pool.into_iter().filter(|t| t.priority == Priority::High).collect())
    });
    fill(&mut important, MAX_IMPORTANT, &mut claimed, &eligible, |pool| {
        pool.into_iter().filter(|t| t.has_tag(TAG_SPRINT_WORK) || t.has_tag(TAG_MANAGEMENT)).collect()
    });
    fill(&mut important, MAX_IMPORTANT, &mut claimed, &eligible, |pool| {
        pool.into_iter().filter(|t| t.priority == Priority::Medium).collect()
    });

    let mut quick_wins: Vec<&Task> = Vec::new();
    fill(&mut quick_wins, MAX_QUICK_WINS, &mut claimed, &eligible, |pool| {
        pool.into_iter().filter(|t| t.has_tag(TAG_QUICK_WIN)).collect()
    });
    fill(&mut quick_wins, MAX_QUICK_WINS, &mut claimed, &eligible, |pool| {
        let mut short: Vec<&Task> = pool
            .into_iter()
            .filter(|t| t.time_estimate.is_some_and(|m| m > 0 && m <= QUICK_WIN_MINUTES))
            .collect();
        short.sort_by_key(|t| t.time_estimate);
        short
    });
    fill(&mut quick_wins, MAX_QUICK_WINS, &mut claimed, &eligible, |pool| {
        pool.into_iter().filter(|t| t.priority == Priority::Low).collect()
    });

    // Global cap: quick wins go first, then important. Critical is never trimmed.
    if critical.len() + important.len() + quick_wins.len() > max_tasks {
        quick_wins.truncate(max_tasks.saturating_sub(critical.len() + important.len()));
        if critical.len() + important.len() > max_tasks {
            important.truncate(max_tasks.saturating_sub(critical.len()));
        }
    }

    debug!(
        %target,
        critical = critical.len(),
        important = important.len(),
        quick_wins = quick_wins.len(),
        backlog_count,
        "selected tasks"
    );

    Selection {
        critical: critical.into_iter().cloned().collect(),
        important: important.into_iter().cloned().collect(),
        quick_wins: quick_wins.into_iter().cloned().collect(),
        backlog_count,
    }
}

/// Select from the store's backlog and stamp `last_scheduled` on every chosen task.
///
/// The caller persists the store once afterwards, so the whole batch commits together.
pub fn select_and_stamp(db: &mut Database, target: NaiveDate, max_tasks: usize) -> Selection {
    let mut selection = select_tasks(&db.tasks, target, max_tasks);
    let ids = selection.ids();
    db.mark_scheduled(&ids, target);
    for t in selection.critical.iter_mut().chain(&mut selection.important).chain(&mut selection.quick_wins) {
        t.last_scheduled = Some(target);
    }
    info!(%target, count = ids.len(), "stamped scheduled tasks");
    selection
}

fn pick_critical<'a>(tasks: &[&'a Task], target: NaiveDate) -> Option<&'a Task> {
    let patterns = deadline_patterns(target);
    if let Some(t) = tasks.iter().find(|t| patterns.iter().any(|p| t.notes.contains(p.as_str()))) {
        return Some(*t);
    }
    if let Some(t) = tasks.iter().find(|t| t.has_tag(TAG_DEADLINE)) {
        return Some(*t);
    }
    let high: Vec<&Task> = tasks.iter().copied().filter(|t| t.priority == Priority::High).collect();
    fewest_skips(high).into_iter().next()
}

/// Stable sort by skip count; equal counts keep creation order.
fn fewest_skips(mut tasks: Vec<&Task>) -> Vec<&Task> {
    tasks.sort_by_key(|t| t.skipped_count);
    tasks
}

/// Top up `bucket` to `cap` from the candidates `pick` chooses among unclaimed tasks.
fn fill<'a, F>(bucket: &mut Vec<&'a Task>, cap: usize, claimed: &mut HashSet<u64>, tasks: &[&'a Task], pick: F)
where
    F: FnOnce(Vec<&'a Task>) -> Vec<&'a Task>,
{
    if bucket.len() >= cap {
        return;
    }
    let pool: Vec<&Task> = tasks.iter().copied().filter(|t| !claimed.contains(&t.id)).collect();
    for task in pick(pool) {
        if bucket.len() >= cap {
            break;
        }
        if claimed.insert(task.id) {
            bucket.push(task);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Status;
    use pretty_assertions::assert_eq;

    fn target() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 7).unwrap()
    }

    fn task(id: u64, priority: Priority, notes: &str) -> Task {
        Task {
            id,
            title: format!("task {id}"),
            priority,
            notes: notes.to_string(),
            status: Status::Active,
            time_estimate: None,
            skipped_count: 0,
            last_scheduled: None,
            created_at_utc: 1_700_000_000 + id as i64,
            completed_at_utc: None,
        }
    }

    fn ids(tasks: &[Task]) -> Vec<u64> {
        tasks.iter().map(|t| t.id).collect()
    }

    #[test]
    fn test_end_to_end_scenario() {
        let mut report = task(1, Priority::High, "[Deadline] due 11/07");
        report.title = "Write report".into();
        let mut invoice = task(2, Priority::Low, "[Quick Win]");
        invoice.title = "File invoice".into();
        invoice.time_estimate = Some(10);
        let mut review = task(3, Priority::Medium, "");
        review.title = "Review PR".into();

        let s = select_tasks(&[report, invoice, review], target(), DEFAULT_MAX_TASKS);
        assert_eq!(ids(&s.critical), vec![1]);
        assert_eq!(ids(&s.important), vec![3]);
        assert_eq!(ids(&s.quick_wins), vec![2]);
        assert_eq!(s.backlog_count, 3);
    }

    #[test]
    fn test_selection_is_deterministic() {
        let backlog: Vec<Task> = (1..=12)
            .map(|i| {
                let prio = [Priority::High, Priority::Medium, Priority::Low][(i % 3) as usize];
                let mut t = task(i, prio, if i % 4 == 0 { "[Quick Win]" } else { "" });
                t.skipped_count = (i % 3) as u32;
                t.time_estimate = Some((i * 7 % 40) as u32);
                t
            })
            .collect();
        let mut reversed = backlog.clone();
        reversed.reverse();

        let a = select_tasks(&backlog, target(), 5);
        let b = select_tasks(&backlog, target(), 5);
        let c = select_tasks(&reversed, target(), 5);
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn test_critical_date_mention_beats_deadline_tag() {
        let backlog = vec![task(1, Priority::High, "[Deadline]"), task(2, Priority::Low, "call before 2025-11-07")];
        assert_eq!(ids(&select_tasks(&backlog, target(), 5).critical), vec![2]);
    }

    #[test]
    fn test_critical_accepts_all_date_formats() {
        for notes in ["2025-11-07", "by 11/07", "November 07 review", "due Nov 07"] {
            let backlog = vec![task(1, Priority::High, ""), task(2, Priority::Low, notes)];
            assert_eq!(ids(&select_tasks(&backlog, target(), 5).critical), vec![2], "notes: {notes}");
        }
    }

    #[test]
    fn test_critical_date_match_is_plain_substring() {
        let backlog = vec![task(1, Priority::Low, "ticket 311/0742")];
        assert_eq!(ids(&select_tasks(&backlog, target(), 5).critical), vec![1]);
    }

    #[test]
    fn test_critical_deadline_tag_beats_high_priority() {
        let backlog = vec![task(1, Priority::High, ""), task(2, Priority::Medium, "[Deadline] friday")];
        assert_eq!(ids(&select_tasks(&backlog, target(), 5).critical), vec![2]);
    }

    #[test]
    fn test_critical_high_with_fewest_skips_then_oldest() {
        let mut a = task(1, Priority::High, "");
        a.skipped_count = 2;
        let b = task(2, Priority::High, "");
        let c = task(3, Priority::High, "");
        let s = select_tasks(&[a, b, c], target(), 5);
        assert_eq!(ids(&s.critical), vec![2]);
        assert_eq!(ids(&s.important), vec![3, 1]);
    }

    #[test]
    fn test_no_critical_without_matching_rule() {
        let s = select_tasks(&[task(1, Priority::Medium, ""), task(2, Priority::Low, "")], target(), 5);
        assert!(s.critical.is_empty());
        assert_eq!(ids(&s.important), vec![1]);
        assert_eq!(ids(&s.quick_wins), vec![2]);
    }

    #[test]
    fn test_important_category_order() {
        let backlog = vec![
            task(1, Priority::Medium, ""),
            task(2, Priority::Low, "[Management] 1:1 prep"),
            task(3, Priority::Low, "[Sprint Work]"),
        ];
        let s = select_tasks(&backlog, target(), 5);
        assert!(s.critical.is_empty());
        assert_eq!(ids(&s.important), vec![2, 3]);
        assert!(s.quick_wins.is_empty());
    }

    #[test]
    fn test_quick_win_category_order() {
        let mut long = task(1, Priority::Low, "");
        long.time_estimate = Some(31);
        let mut short = task(2, Priority::Medium, "");
        short.time_estimate = Some(25);
        let mut shorter = task(3, Priority::Medium, "");
        shorter.time_estimate = Some(5);
        let tagged = task(4, Priority::Medium, "[Quick Win]");
        let backlog = vec![
            task(10, Priority::Medium, "[Sprint Work]"),
            task(11, Priority::Medium, "[Sprint Work]"),
            long,
            short,
            shorter,
            tagged,
        ];
        let s = select_tasks(&backlog, target(), 10);
        assert_eq!(ids(&s.important), vec![10, 11]);
        assert_eq!(ids(&s.quick_wins), vec![4, 3, 2]);
    }

    #[test]
    fn test_low_priority_fills_remaining_quick_wins() {
        let backlog = vec![task(1, Priority::Low, ""), task(2, Priority::Low, ""), task(3, Priority::Low, "")];
        let s = select_tasks(&backlog, target(), 5);
        assert_eq!(ids(&s.quick_wins), vec![1, 2, 3]);
    }

    #[test]
    fn test_stale_tasks_are_excluded() {
        let mut stale = task(1, Priority::High, "[Deadline] 2025-11-07 [Quick Win]");
        stale.skipped_count = SKIP_LIMIT;
        let s = select_tasks(&[stale, task(2, Priority::Low, "")], target(), 5);
        assert!(!s.ids().contains(&1));
        assert_eq!(s.backlog_count, 2);
    }

    #[test]
    fn test_completed_tasks_are_ignored() {
        let mut done = task(1, Priority::High, "[Deadline]");
        done.status = Status::Completed;
        let s = select_tasks(&[done], target(), 5);
        assert!(s.is_empty());
        assert_eq!(s.backlog_count, 0);
    }

    #[test]
    fn test_cap_trims_quick_wins_then_important() {
        let backlog = vec![
            task(1, Priority::High, "[Deadline]"),
            task(2, Priority::High, ""),
            task(3, Priority::High, ""),
            task(4, Priority::Low, ""),
            task(5, Priority::Low, ""),
            task(6, Priority::Low, ""),
        ];
        let full = select_tasks(&backlog, target(), 10);
        assert_eq!((full.critical.len(), full.important.len(), full.quick_wins.len()), (1, 2, 3));

        let s = select_tasks(&backlog, target(), 4);
        assert_eq!(ids(&s.quick_wins), vec![4]);
        assert_eq!(ids(&s.important), vec![2, 3]);

        let s = select_tasks(&backlog, target(), 2);
        assert!(s.quick_wins.is_empty());
        assert_eq!(ids(&s.important), vec![2]);

        let s = select_tasks(&backlog, target(), 0);
        assert_eq!(ids(&s.critical), vec![1]);
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_bucket_bounds_hold_for_many_backlogs() {
        let priorities = [Priority::High, Priority::Medium, Priority::Low];
        let notes = ["", "[Deadline]", "[Quick Win]", "[Sprint Work]", "due 11/07"];
        for size in 0..9u64 {
            for seed in 0..5u64 {
                let backlog: Vec<Task> = (0..size)
                    .map(|i| {
                        let mut t = task(i + 1, priorities[((i + seed) % 3) as usize], notes[((i * seed) % 5) as usize]);
                        t.skipped_count = ((i + seed) % 7) as u32;
                        t
                    })
                    .collect();
                for max in 1..=7 {
                    let s = select_tasks(&backlog, target(), max);
                    assert!(s.len() <= max);
                    assert!(s.critical.len() <= MAX_CRITICAL);
                    assert!(s.important.len() <= MAX_IMPORTANT);
                    assert!(s.quick_wins.len() <= MAX_QUICK_WINS);
                    let unique: HashSet<u64> = s.ids().into_iter().collect();
                    assert_eq!(unique.len(), s.len());
                    assert!(s.iter().all(|t| t.skipped_count < SKIP_LIMIT));
                    // Critical survives any cap.
                    let uncapped = select_tasks(&backlog, target(), 100);
                    assert_eq!(s.critical, uncapped.critical);
                }
            }
        }
    }

    #[test]
    fn test_select_and_stamp_marks_only_selected() {
        let mut db = Database::default();
        let mut stale = task(9, Priority::High, "");
        stale.skipped_count = 6;
        db.tasks = vec![task(1, Priority::High, ""), task(2, Priority::Low, ""), stale];

        let s = select_and_stamp(&mut db, target(), 5);
        assert_eq!(s.ids(), vec![1, 2]);
        assert!(s.iter().all(|t| t.last_scheduled == Some(target())));
        assert_eq!(db.get(1).unwrap().last_scheduled, Some(target()));
        assert_eq!(db.get(2).unwrap().last_scheduled, Some(target()));
        assert_eq!(db.get(9).unwrap().last_scheduled, None);
    }
}
