//! Resolved runtime configuration.
//!
//! Built once in `main` from command-line flags (which fall back to environment
//! variables through clap) and passed by reference to every command handler.

use std::path::PathBuf;

use crate::cli::Cli;
use crate::error::NoteError;
use crate::selection::DEFAULT_MAX_TASKS;
use crate::vault::{Vault, DEFAULT_NOTES_FORMAT};

const DATA_DIR: &str = ".daybook";
const DB_FILE: &str = "tasks.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Vault root; `None` means note commands are unavailable.
    pub vault_path: Option<PathBuf>,
    pub notes_format: String,
    pub db_path: PathBuf,
    pub max_tasks: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            vault_path: None,
            notes_format: DEFAULT_NOTES_FORMAT.to_string(),
            db_path: default_db_path(),
            max_tasks: DEFAULT_MAX_TASKS,
        }
    }
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Self {
        Config {
            vault_path: cli.vault.clone().filter(|p| !p.as_os_str().is_empty()),
            notes_format: cli.notes_format.clone(),
            db_path: cli.db.clone().unwrap_or_else(default_db_path),
            max_tasks: cli.max_tasks,
        }
    }

    /// Open the configured vault.
    pub fn vault(&self) -> Result<Vault, NoteError> {
        let root = self.vault_path.as_ref().ok_or(NoteError::VaultNotConfigured)?;
        Vault::open(root, &self.notes_format)
    }
}

/// `~/.daybook/tasks.json`, or `./.daybook/tasks.json` when `HOME` is unset.
pub fn default_db_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(DATA_DIR).join(DB_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_unconfigured_vault() {
        let config = Config::default();
        assert!(matches!(config.vault(), Err(NoteError::VaultNotConfigured)));
    }

    #[test]
    fn test_vault_must_exist() {
        let config = Config { vault_path: Some(PathBuf::from("/definitely/not/here")), ..Config::default() };
        assert!(matches!(config.vault(), Err(NoteError::VaultMissing(_))));
    }

    #[test]
    fn test_from_cli_flags() {
        let dir = tempfile::tempdir().unwrap();
        let vault = dir.path().to_str().unwrap();
        let cli = Cli::try_parse_from([
            "daybook",
            "--vault",
            vault,
            "--notes-format",
            "Journal/{date}.md",
            "--db",
            "/tmp/x.json",
            "--max-tasks",
            "3",
            "list",
        ])
        .unwrap();
        let config = Config::from_cli(&cli);
        assert_eq!(config.vault_path.as_deref(), Some(dir.path()));
        assert_eq!(config.notes_format, "Journal/{date}.md");
        assert_eq!(config.db_path, PathBuf::from("/tmp/x.json"));
        assert_eq!(config.max_tasks, 3);
        assert_eq!(config.vault().unwrap().path(chrono::NaiveDate::from_ymd_opt(2025, 1, 2).unwrap()),
            dir.path().join("Journal/2025-01-02.md"));
    }

    #[test]
    fn test_default_db_path_under_data_dir() {
        let path = default_db_path();
        assert!(path.ends_with(".daybook/tasks.json"));
    }
}
