//! Staged release fixtures and helpers for reading written NZBs

use flate2::read::GzDecoder;
use nzb_writer::db::{NewBinary, NewCollection, NewPart, NewRelease};
use nzb_writer::{Database, ReleaseId, ReleaseTarget, WriterConfig};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// A binary to stage: name, declared part count, and `(message_id, bytes, number)` parts
pub struct StagedBinary<'a> {
    pub name: &'a str,
    pub total_parts: i64,
    pub parts: &'a [(&'a str, i64, i64)],
}

/// A collection to stage with its binaries
pub struct StagedCollection<'a> {
    pub group: &'a str,
    pub poster: &'a str,
    pub date: i64,
    pub xref: &'a str,
    pub binaries: Vec<StagedBinary<'a>>,
}

/// Temp database plus NZB root, removed on drop
pub struct TestEnv {
    pub db: Arc<Database>,
    pub nzb_dir: std::path::PathBuf,
    _temp_dir: TempDir,
}

impl TestEnv {
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::new(&temp_dir.path().join("nzb-writer.db"))
            .await
            .unwrap();
        Self {
            db: Arc::new(db),
            nzb_dir: temp_dir.path().join("nzbfiles"),
            _temp_dir: temp_dir,
        }
    }

    pub fn config(&self) -> WriterConfig {
        WriterConfig {
            nzb_dir: self.nzb_dir.clone(),
            ..WriterConfig::default()
        }
    }

    /// Insert a release and stage `collections` for it
    pub async fn stage_release(
        &self,
        guid: &str,
        name: &str,
        category: &str,
        collections: &[StagedCollection<'_>],
    ) -> ReleaseTarget {
        let category_id = self.db.insert_category(category).await.unwrap();
        let id = self
            .db
            .insert_release(&NewRelease {
                guid: guid.to_string(),
                name: name.to_string(),
                category_id: Some(category_id),
            })
            .await
            .unwrap();

        for collection in collections {
            self.stage_collection(id, collection).await;
        }

        ReleaseTarget {
            id,
            guid: guid.to_string(),
            name: name.to_string(),
            category_title: category.to_string(),
        }
    }

    pub async fn stage_collection(&self, release_id: ReleaseId, collection: &StagedCollection<'_>) {
        let group_id = self.db.ensure_group(collection.group).await.unwrap();
        let collection_id = self
            .db
            .insert_collection(&NewCollection {
                release_id,
                group_id,
                from_name: collection.poster.to_string(),
                date: collection.date,
                xref: collection.xref.to_string(),
            })
            .await
            .unwrap();

        for binary in &collection.binaries {
            let binary_id = self
                .db
                .insert_binary(&NewBinary {
                    collection_id,
                    name: binary.name.to_string(),
                    total_parts: binary.total_parts,
                })
                .await
                .unwrap();
            let parts: Vec<NewPart> = binary
                .parts
                .iter()
                .map(|&(message_id, size, part_number)| NewPart {
                    binary_id,
                    message_id: message_id.to_string(),
                    size,
                    part_number,
                })
                .collect();
            self.db.insert_parts_batch(&parts).await.unwrap();
        }
    }
}

/// The single-binary release used across tests: `Video`, 5 declared parts,
/// three staged parts where the third repeats the first message-id
pub fn video_collection() -> StagedCollection<'static> {
    StagedCollection {
        group: "grp.a",
        poster: "poster1",
        date: 1_700_000_000,
        xref: "grp.a:1",
        binaries: vec![StagedBinary {
            name: "Video",
            total_parts: 5,
            parts: &[("a@x", 100, 1), ("b@x", 200, 2), ("a@x", 100, 3)],
        }],
    }
}

/// Decompress a written `.nzb.gz`
pub fn read_nzb(path: &Path) -> String {
    let mut xml = String::new();
    GzDecoder::new(std::fs::File::open(path).unwrap())
        .read_to_string(&mut xml)
        .unwrap();
    xml
}
