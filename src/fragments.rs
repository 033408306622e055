//! Fragment loading: the collection → binary → part tree of one release
//!
//! The staging tables hold a release flattened into rows. [`load_fragments`]
//! reassembles them into a [`ReleaseFragments`] tree in the order the NZB is
//! written: binaries by name, parts by part number, each message-id once.

use async_trait::async_trait;
use std::collections::HashSet;

use crate::db::{BinaryRow, CollectionRow, Database, PartRow};
use crate::error::{Error, PipelineError, Result};
use crate::types::ReleaseId;

/// Read access to staged fragments
///
/// A release, collection or binary without rows yields an empty `Vec`, not an
/// error. An error means the source itself is unusable.
#[async_trait]
pub trait FragmentSource: Send + Sync {
    /// Collections staged for a release
    async fn collections(&self, release_id: ReleaseId) -> Result<Vec<CollectionRow>>;

    /// Binaries of a collection
    async fn binaries(&self, collection_id: i64) -> Result<Vec<BinaryRow>>;

    /// Parts of a binary
    async fn parts(&self, binary_id: i64) -> Result<Vec<PartRow>>;
}

#[async_trait]
impl FragmentSource for Database {
    async fn collections(&self, release_id: ReleaseId) -> Result<Vec<CollectionRow>> {
        self.collections_for_release(release_id).await
    }

    async fn binaries(&self, collection_id: i64) -> Result<Vec<BinaryRow>> {
        self.binaries_for_collection(collection_id).await
    }

    async fn parts(&self, binary_id: i64) -> Result<Vec<PartRow>> {
        self.parts_for_binary(binary_id).await
    }
}

/// A binary with its ordered, de-duplicated parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryFragment {
    /// The binary row
    pub binary: BinaryRow,
    /// Parts in part-number order, unique by message-id
    pub parts: Vec<PartRow>,
}

/// A collection with its binaries in name order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionFragment {
    /// The collection row
    pub collection: CollectionRow,
    /// Binaries ordered by name
    pub binaries: Vec<BinaryFragment>,
}

/// Every staged fragment of one release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseFragments {
    /// Release the fragments belong to
    pub release_id: ReleaseId,
    /// Collections in load order
    pub collections: Vec<CollectionFragment>,
}

impl ReleaseFragments {
    /// True when the release has no staged collections
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// Number of NZB `<file>` entries, one per binary
    pub fn file_count(&self) -> usize {
        self.collections.iter().map(|c| c.binaries.len()).sum()
    }

    /// Number of NZB `<segment>` entries
    pub fn segment_count(&self) -> usize {
        self.binaries().map(|(_, b)| b.parts.len()).sum()
    }

    /// Binaries in document order, paired with their collection
    pub fn binaries(&self) -> impl Iterator<Item = (&CollectionRow, &BinaryFragment)> {
        self.collections
            .iter()
            .flat_map(|c| c.binaries.iter().map(move |b| (&c.collection, b)))
    }

    /// First non-empty message-id in document order
    ///
    /// This identifies the NZB; it is not necessarily a part of the release's
    /// main file.
    pub fn first_message_id(&self) -> Option<&str> {
        self.binaries()
            .flat_map(|(_, b)| b.parts.iter())
            .map(|p| p.message_id.as_str())
            .find(|id| !id.is_empty())
    }
}

/// Load the fragment tree of a release
///
/// A release without staging rows yields an empty tree. Any source failure
/// aborts with [`PipelineError::QueryFailure`].
pub async fn load_fragments<S>(source: &S, release_id: ReleaseId) -> Result<ReleaseFragments>
where
    S: FragmentSource + ?Sized,
{
    let query_failure = |e: Error| {
        Error::Pipeline(PipelineError::QueryFailure {
            release_id,
            reason: e.to_string(),
        })
    };

    let collections = source.collections(release_id).await.map_err(query_failure)?;

    let mut loaded = Vec::with_capacity(collections.len());
    for collection in collections {
        let mut binaries = source
            .binaries(collection.id)
            .await
            .map_err(query_failure)?;
        sort_binaries(&mut binaries);

        let mut fragments = Vec::with_capacity(binaries.len());
        for binary in binaries {
            let mut parts = source.parts(binary.id).await.map_err(query_failure)?;
            normalize_parts(&mut parts);
            fragments.push(BinaryFragment { binary, parts });
        }

        loaded.push(CollectionFragment {
            collection,
            binaries: fragments,
        });
    }

    tracing::debug!(
        release_id = release_id.0,
        collections = loaded.len(),
        "loaded release fragments"
    );

    Ok(ReleaseFragments {
        release_id,
        collections: loaded,
    })
}

/// Name ascending; equal names keep their load order
fn sort_binaries(binaries: &mut [BinaryRow]) {
    binaries.sort_by(|a, b| a.name.cmp(&b.name));
}

/// Part number ascending, then drop repeated message-ids
///
/// The first entry of a message-id in part-number order survives.
fn normalize_parts(parts: &mut Vec<PartRow>) {
    parts.sort_by_key(|p| p.part_number);

    let mut seen = HashSet::with_capacity(parts.len());
    parts.retain(|p| seen.insert(p.message_id.clone()));
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DatabaseError;
    use std::collections::HashMap;

    /// In-memory fragment source keyed by parent id
    #[derive(Default)]
    struct MemorySource {
        collections: HashMap<i64, Vec<CollectionRow>>,
        binaries: HashMap<i64, Vec<BinaryRow>>,
        parts: HashMap<i64, Vec<PartRow>>,
        fail_parts: bool,
    }

    #[async_trait]
    impl FragmentSource for MemorySource {
        async fn collections(&self, release_id: ReleaseId) -> Result<Vec<CollectionRow>> {
            Ok(self.collections.get(&release_id.0).cloned().unwrap_or_default())
        }

        async fn binaries(&self, collection_id: i64) -> Result<Vec<BinaryRow>> {
            Ok(self.binaries.get(&collection_id).cloned().unwrap_or_default())
        }

        async fn parts(&self, binary_id: i64) -> Result<Vec<PartRow>> {
            if self.fail_parts {
                return Err(Error::Database(DatabaseError::QueryFailed(
                    "mgr_parts is locked".into(),
                )));
            }
            Ok(self.parts.get(&binary_id).cloned().unwrap_or_default())
        }
    }

    fn collection(id: i64) -> CollectionRow {
        CollectionRow {
            id,
            from_name: "poster1".into(),
            date: 1_700_000_000,
            xref: "grp.a:1".into(),
            group_name: "grp.a".into(),
        }
    }

    fn binary(id: i64, name: &str, total_parts: i64) -> BinaryRow {
        BinaryRow {
            id,
            name: name.into(),
            total_parts,
        }
    }

    fn part(message_id: &str, size: i64, part_number: i64) -> PartRow {
        PartRow {
            message_id: message_id.into(),
            size,
            part_number,
        }
    }

    #[tokio::test]
    async fn unknown_release_loads_as_empty_tree() {
        let source = MemorySource::default();

        let fragments = load_fragments(&source, ReleaseId(99)).await.unwrap();

        assert!(fragments.is_empty());
        assert_eq!(fragments.file_count(), 0);
        assert_eq!(fragments.first_message_id(), None);
    }

    #[tokio::test]
    async fn binaries_are_ordered_by_name_with_stable_ties() {
        let mut source = MemorySource::default();
        source.collections.insert(1, vec![collection(10)]);
        source.binaries.insert(
            10,
            vec![
                binary(3, "b.rar", 1),
                binary(1, "a.rar", 1),
                binary(4, "a.rar", 2),
                binary(2, "A.nfo", 1),
            ],
        );

        let fragments = load_fragments(&source, ReleaseId(1)).await.unwrap();

        let ids: Vec<i64> = fragments.binaries().map(|(_, b)| b.binary.id).collect();
        assert_eq!(ids, vec![2, 1, 4, 3]);
    }

    #[tokio::test]
    async fn parts_are_ordered_and_unique_by_message_id() {
        let mut source = MemorySource::default();
        source.collections.insert(1, vec![collection(10)]);
        source.binaries.insert(10, vec![binary(20, "Video", 5)]);
        source.parts.insert(
            20,
            vec![
                part("b@x", 200, 2),
                part("a@x", 100, 1),
                part("a@x", 300, 3),
            ],
        );

        let fragments = load_fragments(&source, ReleaseId(1)).await.unwrap();

        let parts = &fragments.collections[0].binaries[0].parts;
        assert_eq!(parts, &vec![part("a@x", 100, 1), part("b@x", 200, 2)]);
        assert_eq!(fragments.segment_count(), 2);
    }

    #[tokio::test]
    async fn first_message_id_skips_empty_ids_across_binaries() {
        let mut source = MemorySource::default();
        source.collections.insert(1, vec![collection(10)]);
        source
            .binaries
            .insert(10, vec![binary(20, "a", 1), binary(21, "b", 1), binary(22, "c", 1)]);
        source.parts.insert(20, vec![part("", 10, 1)]);
        source.parts.insert(21, vec![part("m2", 10, 1)]);
        source.parts.insert(22, vec![part("m1", 10, 1)]);

        let fragments = load_fragments(&source, ReleaseId(1)).await.unwrap();

        assert_eq!(fragments.first_message_id(), Some("m2"));
    }

    #[tokio::test]
    async fn source_failure_is_a_query_failure_for_the_release() {
        let mut source = MemorySource {
            fail_parts: true,
            ..MemorySource::default()
        };
        source.collections.insert(7, vec![collection(10)]);
        source.binaries.insert(10, vec![binary(20, "a", 1)]);

        let err = load_fragments(&source, ReleaseId(7)).await.unwrap_err();

        match err {
            Error::Pipeline(PipelineError::QueryFailure { release_id, reason }) => {
                assert_eq!(release_id, ReleaseId(7));
                assert!(reason.contains("mgr_parts is locked"));
            }
            other => panic!("expected QueryFailure, got {other:?}"),
        }
    }
}
