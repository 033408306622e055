//! Configuration types for nzb-writer

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// How the two database mutations after a successful write are applied
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitMode {
    /// Status update then staging delete, as two independent statements
    ///
    /// An interruption between them leaves the release marked done with its
    /// staging rows still present. A later delete for the same release is a no-op.
    #[default]
    Sequential,
    /// Status update and staging delete inside one SQLite transaction
    Transactional,
}

/// Main configuration for [`NzbWriter`](crate::NzbWriter)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WriterConfig {
    /// Root directory for the sharded NZB tree (default: "nzbfiles")
    #[serde(default = "default_nzb_dir")]
    pub nzb_dir: PathBuf,

    /// Number of guid characters used as nested sub-directories
    ///
    /// `None` or `0` fall back to one level.
    #[serde(default)]
    pub split_level: Option<u32>,

    /// Gzip compression level, 0-9 (default: 7)
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,

    /// Unix permission bits applied to written files (default: 0o777)
    ///
    /// Downstream consumers read the files independently of database
    /// privileges. Tightening this is a deployment decision.
    #[serde(default = "default_file_mode")]
    pub file_mode: u32,

    /// How the status update and staging delete are committed
    #[serde(default)]
    pub commit_mode: CommitMode,

    /// Database path (default: "nzb-writer.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            nzb_dir: default_nzb_dir(),
            split_level: None,
            compression_level: default_compression_level(),
            file_mode: default_file_mode(),
            commit_mode: CommitMode::default(),
            database_path: default_database_path(),
        }
    }
}

impl WriterConfig {
    /// Split level actually used for path building
    pub fn effective_split_level(&self) -> u32 {
        match self.split_level {
            None | Some(0) => 1,
            Some(level) => level,
        }
    }

    /// Check settings that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.compression_level > 9 {
            return Err(Error::Config {
                message: format!(
                    "compression_level must be between 0 and 9, got {}",
                    self.compression_level
                ),
                key: Some("compression_level".to_string()),
            });
        }
        if self.file_mode > 0o7777 {
            return Err(Error::Config {
                message: format!("file_mode {:o} is not a permission mask", self.file_mode),
                key: Some("file_mode".to_string()),
            });
        }
        Ok(())
    }
}

// Default value functions
fn default_nzb_dir() -> PathBuf {
    PathBuf::from("nzbfiles")
}

fn default_compression_level() -> u32 {
    7
}

fn default_file_mode() -> u32 {
    0o777
}

fn default_database_path() -> PathBuf {
    PathBuf::from("nzb-writer.db")
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_level_defaults_to_one_when_unset_or_zero() {
        let mut config = WriterConfig::default();
        assert_eq!(config.effective_split_level(), 1);

        config.split_level = Some(0);
        assert_eq!(config.effective_split_level(), 1);

        config.split_level = Some(3);
        assert_eq!(config.effective_split_level(), 3);
    }

    #[test]
    fn empty_json_object_yields_defaults() {
        let config: WriterConfig = serde_json::from_str("{}").expect("empty config must parse");

        assert_eq!(config.nzb_dir, PathBuf::from("nzbfiles"));
        assert_eq!(config.split_level, None);
        assert_eq!(config.compression_level, 7);
        assert_eq!(config.file_mode, 0o777);
        assert_eq!(config.commit_mode, CommitMode::Sequential);
        assert_eq!(config.database_path, PathBuf::from("nzb-writer.db"));
    }

    #[test]
    fn config_default_survives_json_round_trip() {
        let original = WriterConfig {
            split_level: Some(2),
            commit_mode: CommitMode::Transactional,
            ..WriterConfig::default()
        };

        let json = serde_json::to_string(&original).expect("WriterConfig must serialize to JSON");
        let restored: WriterConfig =
            serde_json::from_str(&json).expect("WriterConfig must deserialize from its own JSON");

        assert_eq!(restored.nzb_dir, original.nzb_dir);
        assert_eq!(
            restored.split_level, original.split_level,
            "split_level must survive round-trip"
        );
        assert_eq!(restored.compression_level, original.compression_level);
        assert_eq!(restored.file_mode, original.file_mode);
        assert_eq!(
            restored.commit_mode,
            CommitMode::Transactional,
            "commit_mode must survive round-trip"
        );
    }

    #[test]
    fn commit_mode_uses_snake_case() {
        let json = serde_json::to_value(CommitMode::Transactional).unwrap();
        assert_eq!(json, "transactional");
    }

    #[test]
    fn validate_rejects_out_of_range_compression_level() {
        let config = WriterConfig {
            compression_level: 10,
            ..WriterConfig::default()
        };
        let err = config.validate().unwrap_err();
        match err {
            Error::Config { key, .. } => assert_eq!(key.as_deref(), Some("compression_level")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn validate_accepts_defaults() {
        WriterConfig::default().validate().unwrap();
    }
}
