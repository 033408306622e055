//! Database lifecycle and schema migrations.

use crate::error::DatabaseError;
use crate::{Error, Result};
use sqlx::SqliteConnection;
use sqlx::sqlite::SqlitePool;
use std::path::Path;

use super::Database;

impl Database {
    /// Create a new database connection
    ///
    /// Creates the database file if it doesn't exist and runs migrations.
    pub async fn new(path: &Path) -> Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::Database(DatabaseError::ConnectionFailed(format!(
                    "Failed to create database directory: {}",
                    e
                )))
            })?;
        }

        // Connect to database with foreign key enforcement and WAL mode
        use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
        use std::str::FromStr;

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(|e| {
                Error::Database(DatabaseError::ConnectionFailed(format!(
                    "Failed to parse database path: {}",
                    e
                )))
            })?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePool::connect_with(options).await.map_err(|e| {
            Error::Database(DatabaseError::ConnectionFailed(format!(
                "Failed to connect to database: {}",
                e
            )))
        })?;

        let db = Self { pool };

        db.run_migrations().await?;

        Ok(db)
    }

    /// Run database migrations
    async fn run_migrations(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await.map_err(|e| {
            Error::Database(DatabaseError::ConnectionFailed(format!(
                "Failed to acquire connection: {}",
                e
            )))
        })?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::MigrationFailed(format!(
                "Failed to create schema_version table: {}",
                e
            )))
        })?;

        let current_version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
                .fetch_optional(&mut *conn)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to query schema version: {}",
                        e
                    )))
                })?
                .flatten();

        let current_version = current_version.unwrap_or(0);

        if current_version < 1 {
            Self::migrate_v1(&mut conn).await?;
        }
        if current_version < 2 {
            Self::migrate_v2(&mut conn).await?;
        }

        Ok(())
    }

    /// Migration v1: groups, categories and releases
    async fn migrate_v1(conn: &mut SqliteConnection) -> Result<()> {
        tracing::info!("Applying database migration v1");

        Self::in_migration_transaction(conn, 1, |conn| {
            Box::pin(async move {
                Self::run_ddl(
                    conn,
                    "groups table",
                    r#"
                    CREATE TABLE groups (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        name TEXT NOT NULL UNIQUE
                    )
                    "#,
                )
                .await?;

                Self::run_ddl(
                    conn,
                    "categories table",
                    r#"
                    CREATE TABLE categories (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        title TEXT NOT NULL
                    )
                    "#,
                )
                .await?;

                Self::run_ddl(
                    conn,
                    "releases table",
                    r#"
                    CREATE TABLE releases (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        guid TEXT NOT NULL UNIQUE,
                        name TEXT NOT NULL,
                        categories_id INTEGER REFERENCES categories(id),
                        nzbstatus INTEGER NOT NULL DEFAULT 0,
                        nzb_guid BLOB
                    )
                    "#,
                )
                .await?;

                Self::run_ddl(
                    conn,
                    "releases nzbstatus index",
                    "CREATE INDEX idx_releases_nzbstatus ON releases(nzbstatus)",
                )
                .await
            })
        })
        .await?;

        tracing::info!("Database migration v1 complete");
        Ok(())
    }

    /// Migration v2: collection/binary/part staging tables
    async fn migrate_v2(conn: &mut SqliteConnection) -> Result<()> {
        tracing::info!("Applying database migration v2");

        Self::in_migration_transaction(conn, 2, |conn| {
            Box::pin(async move {
                Self::run_ddl(
                    conn,
                    "mgr_collections table",
                    r#"
                    CREATE TABLE mgr_collections (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        releaseid INTEGER NOT NULL,
                        group_id INTEGER NOT NULL REFERENCES groups(id),
                        fromname TEXT NOT NULL DEFAULT '',
                        date INTEGER NOT NULL DEFAULT 0,
                        xref TEXT NOT NULL DEFAULT ''
                    )
                    "#,
                )
                .await?;

                Self::run_ddl(
                    conn,
                    "mgr_binaries table",
                    r#"
                    CREATE TABLE mgr_binaries (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        collection_id INTEGER NOT NULL
                            REFERENCES mgr_collections(id) ON DELETE CASCADE,
                        name TEXT NOT NULL DEFAULT '',
                        totalparts INTEGER NOT NULL DEFAULT 0
                    )
                    "#,
                )
                .await?;

                Self::run_ddl(
                    conn,
                    "mgr_parts table",
                    r#"
                    CREATE TABLE mgr_parts (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        binaryid INTEGER NOT NULL
                            REFERENCES mgr_binaries(id) ON DELETE CASCADE,
                        messageid TEXT NOT NULL DEFAULT '',
                        size INTEGER NOT NULL DEFAULT 0,
                        partnumber INTEGER NOT NULL DEFAULT 0
                    )
                    "#,
                )
                .await?;

                Self::run_ddl(
                    conn,
                    "mgr_collections releaseid index",
                    "CREATE INDEX idx_mgr_collections_releaseid ON mgr_collections(releaseid)",
                )
                .await?;
                Self::run_ddl(
                    conn,
                    "mgr_binaries collection_id index",
                    "CREATE INDEX idx_mgr_binaries_collection_id ON mgr_binaries(collection_id)",
                )
                .await?;
                Self::run_ddl(
                    conn,
                    "mgr_parts binaryid index",
                    "CREATE INDEX idx_mgr_parts_binaryid ON mgr_parts(binaryid, partnumber)",
                )
                .await
            })
        })
        .await?;

        tracing::info!("Database migration v2 complete");
        Ok(())
    }

    /// Run `body` and record `version` inside one transaction
    ///
    /// A failing migration is rolled back so a partial schema never persists.
    async fn in_migration_transaction<F>(
        conn: &mut SqliteConnection,
        version: i32,
        body: F,
    ) -> Result<()>
    where
        F: for<'c> FnOnce(
            &'c mut SqliteConnection,
        ) -> std::pin::Pin<
            Box<dyn std::future::Future<Output = Result<()>> + Send + 'c>,
        >,
    {
        sqlx::query("BEGIN")
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::MigrationFailed(format!(
                    "Failed to begin transaction: {}",
                    e
                )))
            })?;

        let result = async {
            body(&mut *conn).await?;
            Self::record_migration(conn, version).await?;
            Ok::<(), Error>(())
        }
        .await;

        match result {
            Ok(()) => {
                sqlx::query("COMMIT")
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| {
                        Error::Database(DatabaseError::MigrationFailed(format!(
                            "Failed to commit migration v{}: {}",
                            version, e
                        )))
                    })?;
            }
            Err(e) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                return Err(e);
            }
        }

        Ok(())
    }

    async fn run_ddl(conn: &mut SqliteConnection, what: &str, sql: &str) -> Result<()> {
        sqlx::query(sql).execute(&mut *conn).await.map_err(|e| {
            Error::Database(DatabaseError::MigrationFailed(format!(
                "Failed to create {}: {}",
                what, e
            )))
        })?;
        Ok(())
    }

    async fn record_migration(conn: &mut SqliteConnection, version: i32) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query("INSERT INTO schema_version (version, applied_at) VALUES (?, ?)")
            .bind(version)
            .bind(now)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::MigrationFailed(format!(
                    "Failed to record migration: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Close the database connection
    pub async fn close(self) {
        self.pool.close().await;
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
