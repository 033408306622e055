//! Release rows: insertion, NZB status updates, pending-release discovery.

use crate::error::DatabaseError;
use crate::types::{NzbStatus, ReleaseId, ReleaseTarget};
use crate::{Error, Result};
use sqlx::SqliteConnection;

use super::{Database, NewRelease, PendingReleaseRow, Release};

impl Database {
    /// Insert a category and return its id
    pub async fn insert_category(&self, title: &str) -> Result<i64> {
        let result = sqlx::query("INSERT INTO categories (title) VALUES (?)")
            .bind(title)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to insert category: {}",
                    e
                )))
            })?;

        Ok(result.last_insert_rowid())
    }

    /// Insert a new release with `nzbstatus` = NotAdded
    pub async fn insert_release(&self, release: &NewRelease) -> Result<ReleaseId> {
        let result = sqlx::query(
            r#"
            INSERT INTO releases (guid, name, categories_id, nzbstatus)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&release.guid)
        .bind(&release.name)
        .bind(release.category_id)
        .bind(NzbStatus::NotAdded.to_i32())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert release: {}",
                e
            )))
        })?;

        Ok(ReleaseId(result.last_insert_rowid()))
    }

    /// Get a release by id
    pub async fn get_release(&self, id: ReleaseId) -> Result<Option<Release>> {
        sqlx::query_as::<_, Release>(
            r#"
            SELECT id, guid, name, categories_id, nzbstatus, nzb_guid
            FROM releases
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get release {}: {}",
                id, e
            )))
        })
    }

    /// Releases that still wait for their NZB, oldest first
    ///
    /// Releases without staging collections are included; they get a
    /// head-only NZB like any other empty release.
    pub async fn pending_releases(&self, limit: i64) -> Result<Vec<ReleaseTarget>> {
        let rows = sqlx::query_as::<_, PendingReleaseRow>(
            r#"
            SELECT r.id, r.guid, r.name, COALESCE(cat.title, '') AS category_title
            FROM releases r
            LEFT JOIN categories cat ON cat.id = r.categories_id
            WHERE r.nzbstatus = ?
            ORDER BY r.id ASC
            LIMIT ?
            "#,
        )
        .bind(NzbStatus::NotAdded.to_i32())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list pending releases: {}",
                e
            )))
        })?;

        Ok(rows.into_iter().map(ReleaseTarget::from).collect())
    }

    /// Mark a release as having its NZB written
    ///
    /// `nzb_guid` is stored only when present; an absent guid leaves the
    /// column untouched.
    pub async fn mark_nzb_added(&self, id: ReleaseId, nzb_guid: Option<&[u8; 16]>) -> Result<()> {
        let mut conn = self.pool.acquire().await.map_err(|e| {
            Error::Database(DatabaseError::ConnectionFailed(format!(
                "Failed to acquire connection: {}",
                e
            )))
        })?;

        Self::set_nzb_added(&mut *conn, id, nzb_guid).await
    }

    /// Mark a release as added and delete its staging rows in one transaction
    pub async fn commit_release(&self, id: ReleaseId, nzb_guid: Option<&[u8; 16]>) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to begin release commit: {}",
                e
            )))
        })?;

        Self::set_nzb_added(&mut *tx, id, nzb_guid).await?;
        let removed = Self::delete_staging_rows(&mut *tx, id).await?;

        tx.commit().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to commit release {}: {}",
                id, e
            )))
        })?;

        Ok(removed)
    }

    async fn set_nzb_added(
        conn: &mut SqliteConnection,
        id: ReleaseId,
        nzb_guid: Option<&[u8; 16]>,
    ) -> Result<()> {
        let query = match nzb_guid {
            Some(digest) => {
                sqlx::query("UPDATE releases SET nzbstatus = ?, nzb_guid = ? WHERE id = ?")
                    .bind(NzbStatus::Added.to_i32())
                    .bind(digest.as_slice())
                    .bind(id)
            }
            None => sqlx::query("UPDATE releases SET nzbstatus = ? WHERE id = ?")
                .bind(NzbStatus::Added.to_i32())
                .bind(id),
        };

        query.execute(&mut *conn).await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to mark release {} as added: {}",
                id, e
            )))
        })?;

        Ok(())
    }
}
