//! SQL schema definitions and migrations.
//!
//! This module contains the database schema used by SQL backends. Apart from
//! the auto-incrementing primary keys, every statement is portable between
//! SQLite and Postgres.
//!
//! # Migration System
//!
//! The migration system uses code-based migrations rather than SQL files to handle
//! dialect differences between SQLite and PostgreSQL. Each migration is a function
//! that receives the backend and can execute database-specific SQL as needed.
//!
//! ## Adding a New Migration
//!
//! 1. Increment `SCHEMA_VERSION`
//! 2. Add a new `migrate_vN_to_vM` async function
//! 3. Add the migration to the match statement in `run_migration`

use crate::Result;
use crate::backend::errors::BackendError;

use super::{DbKind, SqlxBackend, SqlxResultExt};

/// Current schema version.
///
/// Increment this when making schema changes that require migration.
pub const SCHEMA_VERSION: i64 = 1;

/// Placeholder in [`CREATE_TABLES`] replaced by the dialect's surrogate key column.
const ID_COLUMN: &str = "{id_column}";

/// SQL statements to create the schema tables.
///
/// Timestamps are BIGINT milliseconds; `ttl` is BIGINT seconds. Payload size
/// is stored because `length()` counts characters, not bytes, on Postgres.
pub const CREATE_TABLES: &[&str] = &[
    // Schema version tracking
    "CREATE TABLE IF NOT EXISTS schema_version (
        version BIGINT PRIMARY KEY
    )",
    "CREATE TABLE IF NOT EXISTS users (
        id {id_column},
        username TEXT NOT NULL UNIQUE,
        password TEXT NOT NULL,
        email TEXT NOT NULL
    )",
    // One row per (user, name); the constraint makes create-if-absent race free
    "CREATE TABLE IF NOT EXISTS collections (
        id {id_column},
        user_id BIGINT NOT NULL REFERENCES users(id),
        name TEXT NOT NULL,
        UNIQUE (user_id, name)
    )",
    "CREATE TABLE IF NOT EXISTS objects (
        id {id_column},
        collection_id BIGINT NOT NULL REFERENCES collections(id),
        object_id TEXT NOT NULL,
        parent_id TEXT,
        predecessor_id TEXT,
        modified BIGINT NOT NULL,
        ttl BIGINT,
        sort_index BIGINT,
        payload TEXT NOT NULL,
        payload_size BIGINT NOT NULL,
        UNIQUE (collection_id, object_id)
    )",
];

/// SQL statements to create indexes.
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_objects_parent ON objects(collection_id, parent_id)",
    "CREATE INDEX IF NOT EXISTS idx_objects_predecessor ON objects(collection_id, predecessor_id)",
    "CREATE INDEX IF NOT EXISTS idx_objects_modified ON objects(collection_id, modified)",
    "CREATE INDEX IF NOT EXISTS idx_objects_sort_index ON objects(collection_id, sort_index)",
    // The reaper scans across all users
    "CREATE INDEX IF NOT EXISTS idx_objects_ttl ON objects(ttl)",
];

/// Surrogate primary key column definition for a dialect.
pub fn id_column(kind: DbKind) -> &'static str {
    match kind {
        DbKind::Sqlite => "INTEGER PRIMARY KEY AUTOINCREMENT",
        DbKind::Postgres => "BIGSERIAL PRIMARY KEY",
    }
}

/// Initialize the database schema.
///
/// Creates tables and indexes if they don't exist, and handles migrations
/// if the schema version has changed.
pub async fn initialize(backend: &SqlxBackend) -> Result<()> {
    let pool = backend.pool();

    for template in CREATE_TABLES {
        let statement = template.replace(ID_COLUMN, id_column(backend.kind()));
        sqlx::query(&statement)
            .execute(pool)
            .await
            .map_err(|e| BackendError::SqlxError {
                reason: format!("Schema creation failed: {e} - SQL: {statement}"),
                source: Some(e),
            })?;
    }

    let row: Option<(i64,)> = sqlx::query_as("SELECT version FROM schema_version")
        .fetch_optional(pool)
        .await
        .sql_context("Failed to check schema version")?;

    match row {
        None => {
            sqlx::query("INSERT INTO schema_version (version) VALUES ($1)")
                .bind(SCHEMA_VERSION)
                .execute(pool)
                .await
                .sql_context("Failed to initialize schema version")?;
        }
        Some((current,)) if current < SCHEMA_VERSION => {
            migrate(backend, current, SCHEMA_VERSION).await?;
        }
        Some((current,)) if current > SCHEMA_VERSION => {
            return Err(BackendError::SqlxError {
                reason: format!(
                    "Database schema v{current} is newer than supported v{SCHEMA_VERSION}"
                ),
                source: None,
            }
            .into());
        }
        Some(_) => {}
    }

    for statement in CREATE_INDEXES {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| BackendError::SqlxError {
                reason: format!("Index creation failed: {e} - SQL: {statement}"),
                source: Some(e),
            })?;
    }

    Ok(())
}

/// Run migrations sequentially from one schema version to another.
async fn migrate(backend: &SqlxBackend, from: i64, to: i64) -> Result<()> {
    tracing::info!(from, to, "Starting SQL schema migration");

    let mut current = from;
    while current < to {
        let next = current + 1;
        tracing::info!(from = current, to = next, "Running migration");

        run_migration(backend, current, next).await?;

        sqlx::query("UPDATE schema_version SET version = $1")
            .bind(next)
            .execute(backend.pool())
            .await
            .sql_context(&format!("Failed to update schema version to {next}"))?;

        tracing::info!(version = next, "Migration completed");
        current = next;
    }

    tracing::info!(from, to, "All migrations completed successfully");
    Ok(())
}

/// Execute a single migration step.
///
/// There are no migrations yet, so any attempt to migrate is an error.
async fn run_migration(backend: &SqlxBackend, from: i64, to: i64) -> Result<()> {
    let _ = backend;

    Err(BackendError::SqlxError {
        reason: format!(
            "Unknown migration path: v{from} to v{to}. \
             This likely means SCHEMA_VERSION was incremented without adding a migration."
        ),
        source: None,
    }
    .into())
}
