use crate::db::*;
use crate::types::ReleaseId;


/// Staged ids of a release seeded by [`seed_release`]
struct Seeded {
    release_id: ReleaseId,
    collection_id: i64,
    binary_ids: Vec<i64>,
}

/// Insert a release with one collection, binaries `b.rar` and `a.rar`, and
/// three parts each
async fn seed_release(db: &Database, guid: &str) -> Seeded {
    let category_id = db.insert_category("Movies > HD").await.unwrap();
    let release_id = db
        .insert_release(&NewRelease {
            guid: guid.to_string(),
            name: format!("Release.{guid}"),
            category_id: Some(category_id),
        })
        .await
        .unwrap();

    let group_id = db.ensure_group("alt.binaries.test").await.unwrap();
    let collection_id = db
        .insert_collection(&NewCollection {
            release_id,
            group_id,
            from_name: "poster@example.com".to_string(),
            date: 1_700_000_000,
            xref: "alt.binaries.test:100".to_string(),
        })
        .await
        .unwrap();

    let mut binary_ids = Vec::new();
    for name in ["b.rar", "a.rar"] {
        let binary_id = db
            .insert_binary(&NewBinary {
                collection_id,
                name: name.to_string(),
                total_parts: 3,
            })
            .await
            .unwrap();
        let parts: Vec<NewPart> = (1..=3)
            .map(|n| NewPart {
                binary_id,
                message_id: format!("{name}.{n}@{guid}"),
                size: 1000 * n,
                part_number: n,
            })
            .collect();
        db.insert_parts_batch(&parts).await.unwrap();
        binary_ids.push(binary_id);
    }

    Seeded {
        release_id,
        collection_id,
        binary_ids,
    }
}
