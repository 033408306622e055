//! # nzb-writer
//!
//! Turns the staged collection/binary/part rows of a release into a gzipped
//! NZB file on disk, then marks the release done and drops its staging rows.
//!
//! ## Pipeline
//!
//! One release at a time, strictly in order:
//! - [`fragments`] - load the collection → binary → part tree from the store
//! - [`nzb`] - serialize the tree into an NZB 1.1 document
//! - [`writer`] - compress, write to the sharded path, verify, commit, clean up
//!
//! Any failure is isolated to its release: [`NzbWriter::write_release`]
//! reports `false`, logs the cause, and leaves the release pending.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use nzb_writer::{Database, NzbWriter, WriterConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = WriterConfig {
//!         nzb_dir: "/var/lib/nzb".into(),
//!         split_level: Some(2),
//!         ..Default::default()
//!     };
//!
//!     let db = Arc::new(Database::new(&config.database_path).await?);
//!     let writer = NzbWriter::new(db, config)?;
//!
//!     let summary = writer.write_pending(100).await?;
//!     println!("{} written, {} failed", summary.written, summary.failed);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Database persistence layer
pub mod db;
/// Error types
pub mod error;
/// Fragment loading from the staging tables
pub mod fragments;
/// NZB document building
pub mod nzb;
/// Sharded NZB file paths
pub mod path;
/// Core types
pub mod types;
/// Generator tag providers
pub mod version;
/// Per-release write, commit and cleanup
pub mod writer;

// Re-export commonly used types
pub use config::{CommitMode, WriterConfig};
pub use db::Database;
pub use error::{DatabaseError, Error, PipelineError, Result};
pub use fragments::{FragmentSource, ReleaseFragments, load_fragments};
pub use nzb::{BuiltNzb, NzbHead, build_nzb};
pub use path::{NzbPathBuilder, ShardedNzbPath};
pub use types::{BatchSummary, NzbStatus, ReleaseId, ReleaseTarget, WriteOutcome};
pub use version::{PackageVersion, StaticVersion, VersionProvider};
pub use writer::{NzbWriter, ReleaseStore};
