//! Sharded on-disk layout for NZB files
//!
//! NZB files are spread over nested directories named after the leading
//! characters of the release guid, so no single directory grows unbounded:
//! with a split level of 2, release `abcdef` lands in `<root>/a/b/abcdef.nzb.gz`.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Deepest split level honoured, one directory per guid character
pub const MAX_SPLIT_LEVEL: u32 = 32;

/// File name of the NZB written for a release guid
pub fn nzb_file_name(release_guid: &str) -> String {
    format!("{}.nzb.gz", release_guid)
}

/// Resolves the directory an NZB file is written to
#[async_trait]
pub trait NzbPathBuilder: Send + Sync {
    /// Directory for `release_guid` at the given split depth
    ///
    /// When `create` is true the directory tree is created if missing.
    async fn nzb_dir(
        &self,
        release_guid: &str,
        split_level: u32,
        create: bool,
    ) -> Result<PathBuf>;

    /// Full path of the `.nzb.gz` file for `release_guid`
    async fn nzb_path(
        &self,
        release_guid: &str,
        split_level: u32,
        create: bool,
    ) -> Result<PathBuf> {
        let dir = self.nzb_dir(release_guid, split_level, create).await?;
        Ok(dir.join(nzb_file_name(release_guid)))
    }
}

/// Default path builder: one sub-directory per leading guid character
#[derive(Debug, Clone)]
pub struct ShardedNzbPath {
    root: PathBuf,
}

impl ShardedNzbPath {
    /// Create a path builder rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the NZB tree
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Compute the shard directory without touching the filesystem
    pub fn shard_dir(&self, release_guid: &str, split_level: u32) -> Result<PathBuf> {
        validate_guid(release_guid)?;

        let depth = split_level.min(MAX_SPLIT_LEVEL) as usize;
        let mut dir = self.root.clone();
        for c in release_guid.chars().take(depth) {
            dir.push(c.to_string());
        }
        Ok(dir)
    }
}

#[async_trait]
impl NzbPathBuilder for ShardedNzbPath {
    async fn nzb_dir(
        &self,
        release_guid: &str,
        split_level: u32,
        create: bool,
    ) -> Result<PathBuf> {
        let dir = self.shard_dir(release_guid, split_level)?;

        if create {
            tokio::fs::create_dir_all(&dir).await.map_err(|e| {
                tracing::error!(path = ?dir, error = %e, "failed to create NZB directory");
                Error::Io(e)
            })?;
        }

        Ok(dir)
    }
}

/// Guids become file and directory names, so only path-safe characters are accepted
fn validate_guid(release_guid: &str) -> Result<()> {
    let is_safe = !release_guid.is_empty()
        && release_guid
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if !is_safe {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("release guid {:?} is not a valid file name", release_guid),
        )));
    }
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn shard_dir_uses_one_directory_per_guid_character() {
        let builder = ShardedNzbPath::new("/nzb");

        assert_eq!(
            builder.shard_dir("abcdef", 1).unwrap(),
            PathBuf::from("/nzb/a")
        );
        assert_eq!(
            builder.shard_dir("abcdef", 3).unwrap(),
            PathBuf::from("/nzb/a/b/c")
        );
    }

    #[test]
    fn shard_dir_stops_at_guid_length() {
        let builder = ShardedNzbPath::new("/nzb");
        assert_eq!(builder.shard_dir("ab", 5).unwrap(), PathBuf::from("/nzb/a/b"));
    }

    #[test]
    fn split_level_zero_means_root_directory() {
        let builder = ShardedNzbPath::new("/nzb");
        assert_eq!(builder.shard_dir("abc", 0).unwrap(), PathBuf::from("/nzb"));
    }

    #[test]
    fn rejects_guids_that_would_escape_the_root() {
        let builder = ShardedNzbPath::new("/nzb");
        assert!(builder.shard_dir("../etc", 1).is_err());
        assert!(builder.shard_dir("a/b", 1).is_err());
        assert!(builder.shard_dir("", 1).is_err());
    }

    #[test]
    fn file_name_appends_compressed_nzb_extension() {
        assert_eq!(nzb_file_name("abc123"), "abc123.nzb.gz");
    }

    #[tokio::test]
    async fn nzb_path_creates_directories_when_asked() {
        let temp_dir = TempDir::new().unwrap();
        let builder = ShardedNzbPath::new(temp_dir.path());

        let path = builder.nzb_path("f00d", 2, true).await.unwrap();

        assert_eq!(path, temp_dir.path().join("f").join("0").join("f00d.nzb.gz"));
        assert!(temp_dir.path().join("f").join("0").is_dir());
    }

    #[tokio::test]
    async fn nzb_dir_without_create_leaves_filesystem_alone() {
        let temp_dir = TempDir::new().unwrap();
        let builder = ShardedNzbPath::new(temp_dir.path());

        let dir = builder.nzb_dir("beef", 1, false).await.unwrap();

        assert_eq!(dir, temp_dir.path().join("b"));
        assert!(!dir.exists());
    }
}
