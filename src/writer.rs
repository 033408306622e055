//! Commit & cleanup: the per-release NZB pipeline
//!
//! [`NzbWriter`] drives one release through
//! load → build → compress → write → verify → commit → cleanup → permission fix.
//! Every step is awaited in order. A failing step ends the release and leaves
//! the database untouched; the file itself is never rolled back.

use async_trait::async_trait;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

use crate::config::{CommitMode, WriterConfig};
use crate::db::Database;
use crate::error::{Error, PipelineError, Result};
use crate::fragments::{FragmentSource, load_fragments};
use crate::nzb::{NzbHead, build_nzb, generator_comment};
use crate::path::{NzbPathBuilder, ShardedNzbPath};
use crate::types::{BatchSummary, ReleaseId, ReleaseTarget, WriteOutcome};
use crate::version::{PackageVersion, VersionProvider, generator_tag_or_empty};

/// Release mutations applied once the NZB is safely on disk
#[async_trait]
pub trait ReleaseStore: Send + Sync {
    /// Set the release to Added, storing `nzb_guid` when present
    async fn mark_nzb_added(&self, id: ReleaseId, nzb_guid: Option<&[u8; 16]>) -> Result<()>;

    /// Delete the release's collection, binary and part rows
    ///
    /// Returns the number of rows removed. Deleting for a release without
    /// staging rows is a no-op.
    async fn delete_staging(&self, id: ReleaseId) -> Result<u64>;

    /// Both of the above, atomically
    async fn commit_release(&self, id: ReleaseId, nzb_guid: Option<&[u8; 16]>) -> Result<u64>;
}

#[async_trait]
impl ReleaseStore for Database {
    async fn mark_nzb_added(&self, id: ReleaseId, nzb_guid: Option<&[u8; 16]>) -> Result<()> {
        Database::mark_nzb_added(self, id, nzb_guid).await
    }

    async fn delete_staging(&self, id: ReleaseId) -> Result<u64> {
        self.delete_staging_for_release(id).await
    }

    async fn commit_release(&self, id: ReleaseId, nzb_guid: Option<&[u8; 16]>) -> Result<u64> {
        Database::commit_release(self, id, nzb_guid).await
    }
}

/// Writes compressed NZB files for releases and retires their staging rows
///
/// Cloning is cheap; every field is behind an `Arc`.
pub struct NzbWriter<S = Database> {
    store: Arc<S>,
    config: Arc<WriterConfig>,
    paths: Arc<dyn NzbPathBuilder>,
    version: Arc<dyn VersionProvider>,
}

impl<S> Clone for NzbWriter<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: Arc::clone(&self.config),
            paths: Arc::clone(&self.paths),
            version: Arc::clone(&self.version),
        }
    }
}

impl<S> NzbWriter<S>
where
    S: FragmentSource + ReleaseStore + 'static,
{
    /// Create a writer over `store`
    ///
    /// NZB files go under `config.nzb_dir` using [`ShardedNzbPath`], tagged
    /// with [`PackageVersion`].
    pub fn new(store: Arc<S>, config: WriterConfig) -> Result<Self> {
        config.validate()?;

        let paths = Arc::new(ShardedNzbPath::new(config.nzb_dir.clone()));
        Ok(Self {
            store,
            config: Arc::new(config),
            paths,
            version: Arc::new(PackageVersion),
        })
    }

    /// Replace the path builder
    pub fn with_path_builder(mut self, paths: Arc<dyn NzbPathBuilder>) -> Self {
        self.paths = paths;
        self
    }

    /// Replace the generator tag provider
    pub fn with_version_provider(mut self, version: Arc<dyn VersionProvider>) -> Self {
        self.version = version;
        self
    }

    /// Writer configuration
    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Underlying store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Write the NZB for one release
    ///
    /// Returns `true` once the file is on disk and the release is committed.
    /// Failures are logged with the release id and reported as `false`.
    pub async fn write_release(&self, target: &ReleaseTarget) -> bool {
        match self.write_release_checked(target).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(
                    release_id = target.id.0,
                    guid = %target.guid,
                    code = e.error_code(),
                    error = %e,
                    "failed to write NZB"
                );
                false
            }
        }
    }

    /// Write the NZB for one release, returning the failure
    pub async fn write_release_checked(&self, target: &ReleaseTarget) -> Result<WriteOutcome> {
        let release_id = target.id;

        let fragments = load_fragments(self.store.as_ref(), release_id).await?;

        let tag = generator_tag_or_empty(self.version.as_ref());
        let comment = generator_comment(&tag, &chrono::Local::now());
        let head = NzbHead {
            category: &target.category_title,
            name: &target.name,
            comment: &comment,
        };
        let built = build_nzb(&head, &fragments)?;
        tracing::debug!(
            release_id = release_id.0,
            files = built.file_count,
            segments = built.segment_count,
            bytes = built.xml.len(),
            "built NZB document"
        );

        let path = self
            .paths
            .nzb_path(&target.guid, self.config.effective_split_level(), true)
            .await
            .map_err(|e| filesystem_write(&self.config.nzb_dir, e))?;

        let compressed = compress(built.xml, self.config.compression_level)
            .await
            .map_err(|e| filesystem_write(&path, e))?;
        write_file(&path, &compressed).await?;
        verify_written(&path).await?;

        let nzb_guid = built
            .nzb_guid
            .as_deref()
            .map(|guid| md5::compute(guid.as_bytes()).0);

        let removed = match self.config.commit_mode {
            CommitMode::Sequential => {
                self.store
                    .mark_nzb_added(release_id, nzb_guid.as_ref())
                    .await?;
                self.store.delete_staging(release_id).await?
            }
            CommitMode::Transactional => {
                self.store
                    .commit_release(release_id, nzb_guid.as_ref())
                    .await?
            }
        };

        // Compatibility step, consumers read these files outside the database's privileges
        if let Err(e) = fix_permissions(&path, self.config.file_mode).await {
            tracing::warn!(
                release_id = release_id.0,
                path = ?path,
                error = %e,
                "failed to relax NZB file permissions"
            );
        }

        tracing::info!(
            release_id = release_id.0,
            path = ?path,
            files = built.file_count,
            segments = built.segment_count,
            staging_rows_removed = removed,
            "wrote NZB"
        );

        Ok(WriteOutcome {
            path,
            nzb_guid: built.nzb_guid,
            file_count: built.file_count,
            segment_count: built.segment_count,
        })
    }

    /// Write NZBs for `targets` one after another
    ///
    /// A failing release is logged and counted; the rest still run.
    pub async fn write_releases(&self, targets: &[ReleaseTarget]) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for target in targets {
            if self.write_release(target).await {
                summary.written += 1;
            } else {
                summary.failed += 1;
            }
        }
        summary
    }
}

impl NzbWriter<Database> {
    /// Write NZBs for up to `limit` pending releases, oldest first
    pub async fn write_pending(&self, limit: i64) -> Result<BatchSummary> {
        let targets = self.store.pending_releases(limit).await?;
        if targets.is_empty() {
            tracing::debug!("no pending releases");
            return Ok(BatchSummary::default());
        }

        let summary = self.write_releases(&targets).await;
        tracing::info!(
            written = summary.written,
            failed = summary.failed,
            "finished pending NZB batch"
        );
        Ok(summary)
    }
}

fn filesystem_write(path: &Path, e: impl std::fmt::Display) -> Error {
    Error::Pipeline(PipelineError::FilesystemWrite {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Gzip `xml` off the async runtime
async fn compress(xml: Vec<u8>, level: u32) -> io::Result<Vec<u8>> {
    tokio::task::spawn_blocking(move || {
        let mut encoder =
            GzEncoder::new(Vec::with_capacity(xml.len() / 4), Compression::new(level));
        encoder.write_all(&xml)?;
        encoder.finish()
    })
    .await
    .map_err(|e| io::Error::other(format!("compression task panicked: {}", e)))?
}

/// Create or truncate `path` and write `data` to it
async fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| filesystem_write(path, e))?;
    file.write_all(data)
        .await
        .map_err(|e| filesystem_write(path, e))?;
    file.flush().await.map_err(|e| filesystem_write(path, e))?;
    Ok(())
}

async fn verify_written(path: &Path) -> Result<()> {
    let exists = tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false);

    if !exists {
        tracing::error!(path = ?path, "NZB file missing after write, release left pending");
        return Err(Error::Pipeline(PipelineError::Verification {
            path: path.to_path_buf(),
        }));
    }
    Ok(())
}

#[cfg(unix)]
async fn fix_permissions(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await
}

#[cfg(not(unix))]
async fn fix_permissions(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}
