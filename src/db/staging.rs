//! Collection/binary/part staging rows.
//!
//! These rows are the flattened form of a release's NZB. They are read once by
//! the fragment loader and deleted once the NZB file is on disk.

use crate::error::DatabaseError;
use crate::types::ReleaseId;
use crate::{Error, Result};
use sqlx::SqliteConnection;

use super::{
    BinaryRow, CollectionRow, Database, NewBinary, NewCollection, NewPart, PartRow, StagingCounts,
};

impl Database {
    /// Collections matched to a release, with their group name
    ///
    /// Collections whose group row is missing are skipped.
    pub async fn collections_for_release(
        &self,
        release_id: ReleaseId,
    ) -> Result<Vec<CollectionRow>> {
        sqlx::query_as::<_, CollectionRow>(
            r#"
            SELECT c.id, c.fromname AS from_name, c.date, c.xref, g.name AS group_name
            FROM mgr_collections c
            INNER JOIN groups g ON c.group_id = g.id
            WHERE c.releaseid = ?
            ORDER BY c.id ASC
            "#,
        )
        .bind(release_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to load collections for release {}: {}",
                release_id, e
            )))
        })
    }

    /// Binaries of a collection, ordered by name
    pub async fn binaries_for_collection(&self, collection_id: i64) -> Result<Vec<BinaryRow>> {
        sqlx::query_as::<_, BinaryRow>(
            r#"
            SELECT b.id, b.name, b.totalparts AS total_parts
            FROM mgr_binaries b
            WHERE b.collection_id = ?
            ORDER BY b.name ASC, b.id ASC
            "#,
        )
        .bind(collection_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to load binaries for collection {}: {}",
                collection_id, e
            )))
        })
    }

    /// Parts of a binary, ordered by part number
    ///
    /// Exact duplicate rows are collapsed here; the fragment loader collapses
    /// rows that share a message-id but differ in size or number.
    pub async fn parts_for_binary(&self, binary_id: i64) -> Result<Vec<PartRow>> {
        sqlx::query_as::<_, PartRow>(
            r#"
            SELECT DISTINCT p.messageid AS message_id, p.size, p.partnumber AS part_number
            FROM mgr_parts p
            WHERE p.binaryid = ?
            ORDER BY p.partnumber ASC
            "#,
        )
        .bind(binary_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to load parts for binary {}: {}",
                binary_id, e
            )))
        })
    }

    /// Get the id of a group, inserting it if it doesn't exist yet
    pub async fn ensure_group(&self, name: &str) -> Result<i64> {
        sqlx::query("INSERT INTO groups (name) VALUES (?) ON CONFLICT(name) DO NOTHING")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to insert group {}: {}",
                    name, e
                )))
            })?;

        sqlx::query_scalar("SELECT id FROM groups WHERE name = ?")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to look up group {}: {}",
                    name, e
                )))
            })
    }

    /// Insert a staging collection
    pub async fn insert_collection(&self, collection: &NewCollection) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO mgr_collections (releaseid, group_id, fromname, date, xref)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(collection.release_id)
        .bind(collection.group_id)
        .bind(&collection.from_name)
        .bind(collection.date)
        .bind(&collection.xref)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert collection: {}",
                e
            )))
        })?;

        Ok(result.last_insert_rowid())
    }

    /// Insert a staging binary
    pub async fn insert_binary(&self, binary: &NewBinary) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO mgr_binaries (collection_id, name, totalparts)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(binary.collection_id)
        .bind(&binary.name)
        .bind(binary.total_parts)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert binary: {}",
                e
            )))
        })?;

        Ok(result.last_insert_rowid())
    }

    /// Insert multiple staging parts in a batch
    ///
    /// Automatically chunks the input to stay within SQLite's bind variable limit.
    pub async fn insert_parts_batch(&self, parts: &[NewPart]) -> Result<()> {
        if parts.is_empty() {
            return Ok(());
        }

        // SQLite default SQLITE_MAX_VARIABLE_NUMBER is 999.
        // Each part uses 4 bind variables, so max 249 parts per batch.
        const MAX_PARTS_PER_BATCH: usize = 249;

        for chunk in parts.chunks(MAX_PARTS_PER_BATCH) {
            let mut query_builder = sqlx::QueryBuilder::new(
                "INSERT INTO mgr_parts (binaryid, messageid, size, partnumber) ",
            );

            query_builder.push_values(chunk, |mut b, part| {
                b.push_bind(part.binary_id)
                    .push_bind(&part.message_id)
                    .push_bind(part.size)
                    .push_bind(part.part_number);
            });

            query_builder
                .build()
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to insert parts batch: {}",
                        e
                    )))
                })?;
        }

        Ok(())
    }

    /// Count the staging rows still held for a release
    pub async fn count_staging_rows(&self, release_id: ReleaseId) -> Result<StagingCounts> {
        let (collections, binaries, parts): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM mgr_collections c WHERE c.releaseid = ?1),
                (SELECT COUNT(*) FROM mgr_binaries b
                    JOIN mgr_collections c ON c.id = b.collection_id
                    WHERE c.releaseid = ?1),
                (SELECT COUNT(*) FROM mgr_parts p
                    JOIN mgr_binaries b ON b.id = p.binaryid
                    JOIN mgr_collections c ON c.id = b.collection_id
                    WHERE c.releaseid = ?1)
            "#,
        )
        .bind(release_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to count staging rows for release {}: {}",
                release_id, e
            )))
        })?;

        Ok(StagingCounts {
            collections,
            binaries,
            parts,
        })
    }

    /// Delete every collection, binary and part staged for a release
    ///
    /// The three deletes run in one transaction. Deleting a release that has
    /// no staging rows is a no-op. Returns the total number of rows removed.
    pub async fn delete_staging_for_release(&self, release_id: ReleaseId) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to begin staging delete: {}",
                e
            )))
        })?;

        let removed = Self::delete_staging_rows(&mut *tx, release_id).await?;

        tx.commit().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to commit staging delete: {}",
                e
            )))
        })?;

        Ok(removed)
    }

    /// Delete parts, then binaries, then collections of a release on `conn`
    pub(super) async fn delete_staging_rows(
        conn: &mut SqliteConnection,
        release_id: ReleaseId,
    ) -> Result<u64> {
        let statements = [
            (
                "parts",
                r#"
                DELETE FROM mgr_parts WHERE binaryid IN (
                    SELECT b.id FROM mgr_binaries b
                    JOIN mgr_collections c ON c.id = b.collection_id
                    WHERE c.releaseid = ?
                )
                "#,
            ),
            (
                "binaries",
                r#"
                DELETE FROM mgr_binaries WHERE collection_id IN (
                    SELECT c.id FROM mgr_collections c WHERE c.releaseid = ?
                )
                "#,
            ),
            ("collections", "DELETE FROM mgr_collections WHERE releaseid = ?"),
        ];

        let mut removed = 0;
        for (what, sql) in statements {
            let result = sqlx::query(sql)
                .bind(release_id)
                .execute(&mut *conn)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to delete staged {} for release {}: {}",
                        what, release_id, e
                    )))
                })?;
            removed += result.rows_affected();
        }

        Ok(removed)
    }
}
