//! SQL-based backend implementations for weavestore.
//!
//! This module provides SQL database backends that implement the `BackendImpl` trait,
//! storing users, collections and objects in relational tables.
//!
//! ## Available Backends
//!
//! - **SQLite** (feature: `sqlite`): Embedded database
//! - **PostgreSQL** (feature: `postgres`): PostgreSQL database
//!
//! ## Architecture
//!
//! The SQL backend uses sqlx with `AnyPool` for multi-database support. Both
//! dialects accept `$N` placeholders and `ON CONFLICT`, so almost every
//! statement is shared. Where they differ (auto-increment keys, `OFFSET`
//! without `LIMIT`) the backend branches on [`DbKind`].
//!
//! Uniqueness constraints do the concurrency work: a collection is created
//! with `INSERT ... ON CONFLICT DO NOTHING` against `UNIQUE (user_id, name)`
//! and objects are upserted against `UNIQUE (collection_id, object_id)`, so
//! racing writers converge without explicit locking.
//!
//! ## Schema and Migrations
//!
//! The database schema is defined in the [`schema`] module and automatically
//! initialized when connecting.

mod query;
mod storage;

/// Schema definition and migration system.
pub mod schema;

use std::any::Any;
#[cfg(feature = "postgres")]
use std::time::Duration;

use async_trait::async_trait;
use sqlx::AnyPool;
#[cfg(feature = "postgres")]
use sqlx::Executor;
use sqlx::any::AnyPoolOptions;

use crate::Result;
use crate::backend::BackendImpl;
use crate::backend::errors::BackendError;
use crate::entity::{
    BasicObject, Collection, CollectionId, CollectionStats, CollectionSummary, NewObject,
    NewUser, ObjectKey, Timestamp, User, UserId,
};
use crate::query::ObjectQuery;

/// Extension trait for sqlx Result types to simplify error handling.
///
/// Similar to `anyhow::Context`, this trait adds a method to convert
/// sqlx errors to `BackendError::SqlxError` with a context message.
pub(crate) trait SqlxResultExt<T> {
    /// Convert sqlx error to BackendError with context message.
    fn sql_context(self, context: &str) -> Result<T>;
}

impl<T> SqlxResultExt<T> for std::result::Result<T, sqlx::Error> {
    fn sql_context(self, context: &str) -> Result<T> {
        self.map_err(|e| {
            BackendError::SqlxError {
                reason: format!("{context}: {e}"),
                source: Some(e),
            }
            .into()
        })
    }
}

/// Database backend kind for SQL dialect selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbKind {
    /// SQLite database
    Sqlite,
    /// PostgreSQL database
    Postgres,
}

/// SQL-based backend implementing `BackendImpl` using sqlx.
///
/// This backend supports both SQLite and PostgreSQL through sqlx's `AnyPool`.
///
/// # Thread Safety
///
/// `SqlxBackend` is `Send + Sync` as required by `BackendImpl`. The underlying
/// sqlx pool handles connection pooling and thread safety.
///
/// # Test Isolation
///
/// For PostgreSQL, each backend instance can use its own schema for test isolation.
/// Use `connect_postgres_isolated()` to create an isolated backend for testing.
#[derive(Debug)]
pub struct SqlxBackend {
    pool: AnyPool,
    kind: DbKind,
}

impl SqlxBackend {
    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Get the database kind.
    pub fn kind(&self) -> DbKind {
        self.kind
    }

    /// Check if this backend is using SQLite.
    pub fn is_sqlite(&self) -> bool {
        self.kind == DbKind::Sqlite
    }

    /// Check if this backend is using PostgreSQL.
    pub fn is_postgres(&self) -> bool {
        self.kind == DbKind::Postgres
    }

    /// Close the pool, waiting for checked-out connections to be returned.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

// SQLite-specific implementations
#[cfg(feature = "sqlite")]
impl SqlxBackend {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// ```ignore
    /// use weavestore::backend::database::SqlxBackend;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let backend = SqlxBackend::open_sqlite("weave.db").await.unwrap();
    /// }
    /// ```
    pub async fn open_sqlite<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        // mode=rwc: read-write-create (create file if it doesn't exist)
        let url = format!("sqlite:{}?mode=rwc", path.as_ref().display());
        Self::connect_sqlite(&url).await
    }

    /// Connect to a SQLite database using a connection URL.
    ///
    /// # Arguments
    ///
    /// * `url` - SQLite connection URL (e.g., "sqlite:./weave.db")
    pub async fn connect_sqlite(url: &str) -> Result<Self> {
        sqlx::any::install_default_drivers();

        let is_in_memory = url.contains("mode=memory");

        // An in-memory database is destroyed when its last connection closes,
        // so the pool must always keep one open.
        let pool = if is_in_memory {
            AnyPoolOptions::new()
                .max_connections(5)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect(url)
                .await
                .sql_context("Failed to connect to SQLite")?
        } else {
            AnyPoolOptions::new()
                .max_connections(5)
                .connect(url)
                .await
                .sql_context("Failed to connect to SQLite")?
        };

        if is_in_memory {
            sqlx::query("PRAGMA busy_timeout = 5000;")
                .execute(&pool)
                .await
                .sql_context("Failed to configure SQLite")?;
        } else {
            // File-based SQLite:
            // - journal_mode=WAL: Write-Ahead Logging for better concurrency
            // - synchronous=NORMAL: Balanced durability (safe with WAL)
            // - busy_timeout=5000: Wait up to 5s for locks before failing
            sqlx::query(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA busy_timeout = 5000;",
            )
            .execute(&pool)
            .await
            .sql_context("Failed to configure SQLite")?;
        }

        let backend = Self {
            pool,
            kind: DbKind::Sqlite,
        };

        schema::initialize(&backend).await?;

        Ok(backend)
    }

    /// Create an in-memory SQLite database.
    ///
    /// The database exists only for the lifetime of this backend instance.
    /// Useful for testing.
    pub async fn sqlite_in_memory() -> Result<Self> {
        // Shared cache so every pooled connection sees the same database; a
        // unique name per instance keeps tests apart.
        let unique_id = uuid::Uuid::new_v4();
        let url = format!("sqlite:file:mem_{unique_id}?mode=memory&cache=shared");
        Self::connect_sqlite(&url).await
    }
}

// PostgreSQL-specific implementations
#[cfg(feature = "postgres")]
impl SqlxBackend {
    /// Connect to a PostgreSQL database using a connection URL.
    ///
    /// This connects to the default (public) schema. For test isolation,
    /// use `connect_postgres_isolated()` instead.
    ///
    /// ```ignore
    /// use weavestore::backend::database::SqlxBackend;
    ///
    /// let backend = SqlxBackend::connect_postgres("postgres://localhost/weave").await.unwrap();
    /// ```
    pub async fn connect_postgres(url: &str) -> Result<Self> {
        Self::connect_postgres_with_schema(url, None).await
    }

    /// Connect to a PostgreSQL database with a specific schema for isolation.
    async fn connect_postgres_with_schema(url: &str, schema_name: Option<String>) -> Result<Self> {
        sqlx::any::install_default_drivers();

        // Create the schema up front, then pin search_path on every pooled
        // connection in after_connect.
        if let Some(ref schema) = schema_name {
            let temp_pool = AnyPoolOptions::new()
                .max_connections(1)
                .connect(url)
                .await
                .sql_context("Failed to connect to PostgreSQL")?;

            let create_schema = format!("CREATE SCHEMA IF NOT EXISTS {schema}");
            sqlx::query(&create_schema)
                .execute(&temp_pool)
                .await
                .sql_context(&format!("Failed to create schema {schema}"))?;

            temp_pool.close().await;
        }

        let schema_for_hook = schema_name.clone();
        let mut pool_options = AnyPoolOptions::new();

        if schema_name.is_some() {
            // Isolated test pools stay small and wait rather than fail when
            // many tests share one server.
            pool_options = pool_options
                .max_connections(2)
                .acquire_timeout(Duration::from_secs(30));
        } else {
            pool_options = pool_options.max_connections(5);
        }

        let pool = pool_options
            .after_connect(move |conn, _meta| {
                let schema = schema_for_hook.clone();
                Box::pin(async move {
                    if let Some(ref s) = schema {
                        let set_path = format!("SET search_path TO {s}");
                        conn.execute(set_path.as_str()).await?;
                    }
                    Ok(())
                })
            })
            .connect(url)
            .await
            .sql_context("Failed to connect to PostgreSQL")?;

        let backend = Self {
            pool,
            kind: DbKind::Postgres,
        };

        schema::initialize(&backend).await?;

        Ok(backend)
    }

    /// Connect to a PostgreSQL database with test isolation.
    ///
    /// Creates a unique schema for this backend instance, ensuring tests
    /// don't interfere with each other when run in parallel.
    pub async fn connect_postgres_isolated(url: &str) -> Result<Self> {
        // PostgreSQL schema names must start with a letter and be lowercase
        let unique_id = uuid::Uuid::new_v4().simple().to_string();
        let schema_name = format!("test_{unique_id}");
        Self::connect_postgres_with_schema(url, Some(schema_name)).await
    }
}

#[async_trait]
impl BackendImpl for SqlxBackend {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        storage::create_user(self, user).await
    }

    async fn find_user(&self, username: &str) -> Result<Option<User>> {
        storage::find_user(self, username).await
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        storage::list_users(self).await
    }

    async fn update_password(&self, username: &str, password: &str) -> Result<()> {
        storage::update_user_field(self, username, "password", password).await
    }

    async fn update_email(&self, username: &str, email: &str) -> Result<()> {
        storage::update_user_field(self, username, "email", email).await
    }

    async fn delete_user(&self, username: &str) -> Result<()> {
        storage::delete_user(self, username).await
    }

    async fn resolve_collection(&self, user: UserId, name: &str) -> Result<Collection> {
        storage::resolve_collection(self, user, name).await
    }

    async fn find_collection(&self, user: UserId, name: &str) -> Result<Option<Collection>> {
        storage::find_collection(self, user, name).await
    }

    async fn list_collections(&self, user: UserId) -> Result<Vec<Collection>> {
        storage::list_collections(self, user).await
    }

    async fn delete_collection(&self, collection: CollectionId) -> Result<()> {
        storage::delete_collection(self, collection).await
    }

    async fn delete_collection_by_name(&self, user: UserId, name: &str) -> Result<()> {
        storage::delete_collection_by_name(self, user, name).await
    }

    async fn delete_all_collections(&self, user: UserId) -> Result<()> {
        storage::delete_all_collections(self, user).await
    }

    async fn collection_stats(
        &self,
        user: UserId,
        name: &str,
        as_of: Timestamp,
    ) -> Result<CollectionStats> {
        query::collection_stats(self, user, name, as_of).await
    }

    async fn collection_summaries(
        &self,
        user: UserId,
        as_of: Timestamp,
    ) -> Result<Vec<CollectionSummary>> {
        query::collection_summaries(self, user, as_of).await
    }

    async fn user_payload_bytes(&self, user: UserId, as_of: Timestamp) -> Result<u64> {
        query::user_payload_bytes(self, user, as_of).await
    }

    async fn get_object(
        &self,
        user: UserId,
        name: &str,
        id: &str,
        as_of: Timestamp,
    ) -> Result<Option<BasicObject>> {
        query::get_object(self, user, name, id, as_of).await
    }

    async fn query_objects(
        &self,
        user: UserId,
        name: &str,
        query: &ObjectQuery,
        as_of: Timestamp,
    ) -> Result<Vec<BasicObject>> {
        query::query_objects(self, user, name, query, as_of).await
    }

    async fn put_object(
        &self,
        user: UserId,
        name: &str,
        object: NewObject,
        modified: Timestamp,
    ) -> Result<BasicObject> {
        storage::put_object(self, user, name, object, modified).await
    }

    async fn delete_object(&self, key: ObjectKey) -> Result<()> {
        storage::delete_object(self, key).await
    }

    async fn purge_expired(&self, now: Timestamp) -> Result<u64> {
        storage::purge_expired(self, now).await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(feature = "sqlite")]
/// Convenience type alias for SQLite backend using sqlx.
pub type Sqlite = SqlxBackend;

#[cfg(feature = "postgres")]
/// Convenience type alias for PostgreSQL backend using sqlx.
pub type Postgres = SqlxBackend;
