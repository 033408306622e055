//! Database layer for nzb-writer
//!
//! Handles SQLite persistence for releases and the staging rows an NZB is
//! assembled from.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] - Database lifecycle, schema migrations
//! - [`staging`] - Collection/binary/part staging rows (reads, inserts, delete)
//! - [`releases`] - Release rows, NZB status updates, pending-release discovery

use crate::types::{NzbStatus, ReleaseId, ReleaseTarget};
use sqlx::{FromRow, sqlite::SqlitePool};

mod migrations;
mod releases;
mod staging;

/// New release to be inserted into the database
#[derive(Debug, Clone)]
pub struct NewRelease {
    /// Release guid (unique, used for the NZB path)
    pub guid: String,
    /// Release name
    pub name: String,
    /// Category this release is filed under
    pub category_id: Option<i64>,
}

/// Release record from database
#[derive(Debug, Clone, FromRow)]
pub struct Release {
    /// Unique database ID
    pub id: ReleaseId,
    /// Release guid
    pub guid: String,
    /// Release name
    pub name: String,
    /// Category this release is filed under
    pub categories_id: Option<i64>,
    /// NZB status code (see [`NzbStatus`])
    pub nzbstatus: i32,
    /// MD5 digest of the first message-id in the written NZB
    pub nzb_guid: Option<Vec<u8>>,
}

impl Release {
    /// Typed NZB status
    pub fn nzb_status(&self) -> NzbStatus {
        NzbStatus::from_i32(self.nzbstatus)
    }
}

/// Pending release row joined with its category title
#[derive(Debug, Clone, FromRow)]
pub struct PendingReleaseRow {
    /// Release id
    pub id: ReleaseId,
    /// Release guid
    pub guid: String,
    /// Release name
    pub name: String,
    /// Category title, empty when the release has no category
    pub category_title: String,
}

impl From<PendingReleaseRow> for ReleaseTarget {
    fn from(row: PendingReleaseRow) -> Self {
        ReleaseTarget {
            id: row.id,
            guid: row.guid,
            name: row.name,
            category_title: row.category_title,
        }
    }
}

/// New staging collection to be inserted into the database
#[derive(Debug, Clone)]
pub struct NewCollection {
    /// Release this collection was matched to
    pub release_id: ReleaseId,
    /// Newsgroup the collection was collected from
    pub group_id: i64,
    /// Poster (From header)
    pub from_name: String,
    /// Post date as Unix timestamp
    pub date: i64,
    /// Raw Xref header
    pub xref: String,
}

/// Collection record as read by the fragment loader
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct CollectionRow {
    /// Unique database ID
    pub id: i64,
    /// Poster (From header)
    pub from_name: String,
    /// Post date as Unix timestamp
    pub date: i64,
    /// Raw Xref header, e.g. `alt.binaries.test:12345 alt.binaries.other:67890`
    pub xref: String,
    /// Name of the group the collection was collected from
    pub group_name: String,
}

/// New staging binary to be inserted into the database
#[derive(Debug, Clone)]
pub struct NewBinary {
    /// Collection this binary belongs to
    pub collection_id: i64,
    /// Binary (file) name
    pub name: String,
    /// Declared number of parts from the subject
    pub total_parts: i64,
}

/// Binary record as read by the fragment loader
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct BinaryRow {
    /// Unique database ID
    pub id: i64,
    /// Binary (file) name
    pub name: String,
    /// Declared number of parts, may exceed the parts actually present
    pub total_parts: i64,
}

/// New staging part to be inserted into the database
#[derive(Debug, Clone)]
pub struct NewPart {
    /// Binary this part belongs to
    pub binary_id: i64,
    /// Usenet message-ID
    pub message_id: String,
    /// Size of this part in bytes
    pub size: i64,
    /// 1-based position within the binary
    pub part_number: i64,
}

/// Part record as read by the fragment loader
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct PartRow {
    /// Usenet message-ID
    pub message_id: String,
    /// Size of this part in bytes
    pub size: i64,
    /// 1-based position within the binary
    pub part_number: i64,
}

/// Number of staging rows held for one release
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StagingCounts {
    /// Rows in `mgr_collections`
    pub collections: i64,
    /// Rows in `mgr_binaries`
    pub binaries: i64,
    /// Rows in `mgr_parts`
    pub parts: i64,
}

impl StagingCounts {
    /// True when no staging rows remain
    pub fn is_empty(&self) -> bool {
        self.collections == 0 && self.binaries == 0 && self.parts == 0
    }
}

/// Database handle for nzb-writer
pub struct Database {
    pool: SqlitePool,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
