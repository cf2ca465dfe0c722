//! Enumerations and field types for backlog tasks.
//!
//! This module defines the structured values used to rank and filter tasks:
//! priority levels, lifecycle status, and the status filter used when listing.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Priority classification for task importance.
///
/// Variants are declared low to high so the derived ordering ranks `High` above `Low`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    #[serde(alias = "Low")]
    Low,
    #[default]
    #[serde(alias = "Medium")]
    Medium,
    #[serde(alias = "High")]
    High,
}

impl Priority {
    /// Tag appended to a daily-note task line for this priority, if any.
    pub fn note_tag(self) -> Option<&'static str> {
        match self {
            Priority::High => Some("#high-priority"),
            Priority::Low => Some("#low-priority"),
            Priority::Medium => None,
        }
    }
}

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[default]
    #[serde(alias = "Active")]
    Active,
    #[serde(alias = "Completed")]
    Completed,
}

/// Filter applied when listing the backlog.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum StatusFilter {
    Active,
    Completed,
    All,
}

impl StatusFilter {
    pub fn accepts(self, status: Status) -> bool {
        match self {
            StatusFilter::Active => status == Status::Active,
            StatusFilter::Completed => status == Status::Completed,
            StatusFilter::All => true,
        }
    }
}
