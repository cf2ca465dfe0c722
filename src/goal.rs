//! Goals, remembered facts and the accomplishment log.
//!
//! These records live in the same store as the backlog. Active goals and the most recent
//! facts feed the generation of new daily notes; the accomplishment log is append-only.

use serde::{Deserialize, Serialize};

use crate::fields::Status;

pub const DEFAULT_TIMEFRAME: &str = "this week";
pub const DEFAULT_CATEGORY: &str = "general";

/// Something to work towards over a timeframe such as "this week" or "long-term".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub id: u64,
    pub goal: String,
    pub timeframe: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub status: Status,
    pub created_at_utc: i64,
}

impl Goal {
    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }

    /// Plain bullet for the "From Your Goals" block of a daily note.
    pub fn to_note_line(&self) -> String {
        format!("- Work on: {} ({})", self.goal, self.timeframe)
    }
}

/// A remembered preference, pattern or constraint about the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    pub id: u64,
    pub fact: String,
    #[serde(default = "default_category")]
    pub category: String,
    pub created_at_utc: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accomplishment {
    pub id: u64,
    pub description: String,
    pub created_at_utc: i64,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// Goals grouped by timeframe, groups in order of first appearance.
pub fn format_goals(goals: &[&Goal]) -> String {
    let groups = group_by(goals, |g| g.timeframe.as_str());
    let mut blocks = Vec::new();
    for (timeframe, members) in groups {
        let mut block = format!("{}:", timeframe.to_uppercase());
        for g in members {
            let done = if g.is_active() { "" } else { " ✓" };
            block.push_str(&format!("\n  [{}] {} ({}){done}", g.id, g.goal, g.category));
        }
        blocks.push(block);
    }
    blocks.join("\n\n")
}

/// Facts grouped by category, groups in order of first appearance.
pub fn format_facts(facts: &[&Fact]) -> String {
    let groups = group_by(facts, |f| f.category.as_str());
    let mut blocks = Vec::new();
    for (category, members) in groups {
        let mut block = format!("{}:", category.to_uppercase());
        for f in members {
            block.push_str(&format!("\n  - {}", f.fact));
        }
        blocks.push(block);
    }
    blocks.join("\n\n")
}

fn group_by<'a, T>(items: &[&'a T], key: impl Fn(&T) -> &str) -> Vec<(String, Vec<&'a T>)> {
    let mut groups: Vec<(String, Vec<&'a T>)> = Vec::new();
    for item in items {
        let k = key(item);
        match groups.iter_mut().find(|(name, _)| name == k) {
            Some((_, members)) => members.push(item),
            None => groups.push((k.to_string(), vec![item])),
        }
    }
    groups
}
