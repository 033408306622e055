//! Core types for nzb-writer

use serde::{Deserialize, Serialize};

/// Unique identifier for a release
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReleaseId(pub i64);

impl std::fmt::Display for ReleaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Implement sqlx Type, Encode, and Decode for database operations
impl sqlx::Type<sqlx::Sqlite> for ReleaseId {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <i64 as sqlx::Type<sqlx::Sqlite>>::type_info()
    }

    fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
        <i64 as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for ReleaseId {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        sqlx::Encode::<sqlx::Sqlite>::encode_by_ref(&self.0, buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for ReleaseId {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let id = <i64 as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(Self(id))
    }
}

/// Whether a release already has its NZB written
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NzbStatus {
    /// Staging rows exist, no NZB on disk yet
    #[default]
    NotAdded,
    /// NZB written and staging rows superseded
    Added,
}

impl NzbStatus {
    /// Convert integer status code to NzbStatus
    ///
    /// Unknown codes are treated as `NotAdded` so the release gets reprocessed.
    pub fn from_i32(status: i32) -> Self {
        match status {
            1 => NzbStatus::Added,
            _ => NzbStatus::NotAdded,
        }
    }

    /// Convert NzbStatus to the integer stored in `releases.nzbstatus`
    pub fn to_i32(&self) -> i32 {
        match self {
            NzbStatus::NotAdded => 0,
            NzbStatus::Added => 1,
        }
    }
}

/// A release to write an NZB for
///
/// Carries everything the pipeline needs besides the staged fragments:
/// the database id, the guid used for the on-disk path, and the two values
/// written into the NZB `<head>`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseTarget {
    /// Release id in the database
    pub id: ReleaseId,
    /// Release guid, used as the file name and shard key
    pub guid: String,
    /// Release name, written as `<meta type="name">`
    pub name: String,
    /// Category title, written as `<meta type="category">`
    pub category_title: String,
}

/// What a successful write produced
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Path of the written `.nzb.gz` file
    pub path: std::path::PathBuf,
    /// First non-empty message-id in the document, if any
    pub nzb_guid: Option<String>,
    /// Number of `<file>` elements written
    pub file_count: usize,
    /// Number of `<segment>` elements written
    pub segment_count: usize,
}

/// Totals for a batch of releases
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Releases whose NZB was written and committed
    pub written: usize,
    /// Releases that failed and stay pending
    pub failed: usize,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nzb_status_round_trips_through_i32() {
        for status in [NzbStatus::NotAdded, NzbStatus::Added] {
            assert_eq!(NzbStatus::from_i32(status.to_i32()), status);
        }
    }

    #[test]
    fn unknown_nzb_status_code_is_not_added() {
        assert_eq!(NzbStatus::from_i32(-1), NzbStatus::NotAdded);
        assert_eq!(NzbStatus::from_i32(7), NzbStatus::NotAdded);
    }

    #[test]
    fn release_id_displays_as_integer() {
        assert_eq!(ReleaseId(42).to_string(), "42");
    }

    #[test]
    fn release_id_serializes_transparently() {
        let json = serde_json::to_string(&ReleaseId(7)).unwrap();
        assert_eq!(json, "7");
    }
}
