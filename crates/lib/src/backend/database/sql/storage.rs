//! Write-side operations for SQL backends: users, collections and objects.
//!
//! Multi-statement writes run in one transaction and issue their first write
//! before any read, so SQLite takes the write lock up front instead of
//! failing a lock upgrade under contention.

use crate::Result;
use crate::backend::errors::BackendError;
use crate::entity::{
    BasicObject, Collection, CollectionId, NewObject, NewUser, ObjectKey, Timestamp, User, UserId,
};
use crate::expiry;

use super::{SqlxBackend, SqlxResultExt};

type UserRow = (i64, String, String, String);
type CollectionRow = (i64, String, i64);

fn user_from_row((id, username, password, email): UserRow) -> User {
    User {
        id: UserId::new(id),
        username,
        password,
        email,
    }
}

fn collection_from_row((id, name, user_id): CollectionRow) -> Collection {
    Collection {
        id: CollectionId::new(id),
        name,
        user: UserId::new(user_id),
    }
}

fn user_not_found(username: &str) -> crate::Error {
    BackendError::UserNotFound {
        username: username.to_string(),
    }
    .into()
}

/// Register a user, reporting a taken username instead of a constraint error.
pub async fn create_user(backend: &SqlxBackend, user: NewUser) -> Result<User> {
    let row: Option<(i64,)> = sqlx::query_as(
        "INSERT INTO users (username, password, email) VALUES ($1, $2, $3)
         ON CONFLICT (username) DO NOTHING
         RETURNING id",
    )
    .bind(&user.username)
    .bind(&user.password)
    .bind(&user.email)
    .fetch_optional(backend.pool())
    .await
    .sql_context("Failed to insert user")?;

    match row {
        Some((id,)) => Ok(User {
            id: UserId::new(id),
            username: user.username,
            password: user.password,
            email: user.email,
        }),
        None => Err(BackendError::UsernameTaken {
            username: user.username,
        }
        .into()),
    }
}

pub async fn find_user(backend: &SqlxBackend, username: &str) -> Result<Option<User>> {
    let row: Option<UserRow> =
        sqlx::query_as("SELECT id, username, password, email FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(backend.pool())
            .await
            .sql_context("Failed to look up user")?;
    Ok(row.map(user_from_row))
}

pub async fn list_users(backend: &SqlxBackend) -> Result<Vec<User>> {
    let rows: Vec<UserRow> =
        sqlx::query_as("SELECT id, username, password, email FROM users ORDER BY username")
            .fetch_all(backend.pool())
            .await
            .sql_context("Failed to list users")?;
    Ok(rows.into_iter().map(user_from_row).collect())
}

/// Overwrite one credential column of a user.
///
/// `column` is always a literal chosen by the caller, never user input.
pub async fn update_user_field(
    backend: &SqlxBackend,
    username: &str,
    column: &'static str,
    value: &str,
) -> Result<()> {
    let sql = format!("UPDATE users SET {column} = $1 WHERE username = $2");
    let result = sqlx::query(&sql)
        .bind(value)
        .bind(username)
        .execute(backend.pool())
        .await
        .sql_context(&format!("Failed to update user {column}"))?;

    if result.rows_affected() == 0 {
        return Err(user_not_found(username));
    }
    Ok(())
}

/// Delete a user together with every collection and object they own.
pub async fn delete_user(backend: &SqlxBackend, username: &str) -> Result<()> {
    let mut tx = backend
        .pool()
        .begin()
        .await
        .sql_context("Failed to begin transaction")?;

    sqlx::query(
        "DELETE FROM objects WHERE collection_id IN (
            SELECT c.id FROM collections c
            JOIN users u ON u.id = c.user_id
            WHERE u.username = $1
        )",
    )
    .bind(username)
    .execute(&mut *tx)
    .await
    .sql_context("Failed to delete user objects")?;

    sqlx::query(
        "DELETE FROM collections WHERE user_id IN (SELECT id FROM users WHERE username = $1)",
    )
    .bind(username)
    .execute(&mut *tx)
    .await
    .sql_context("Failed to delete user collections")?;

    let result = sqlx::query("DELETE FROM users WHERE username = $1")
        .bind(username)
        .execute(&mut *tx)
        .await
        .sql_context("Failed to delete user")?;

    if result.rows_affected() == 0 {
        // Dropping the transaction rolls it back
        return Err(user_not_found(username));
    }

    tx.commit().await.sql_context("Failed to commit user deletion")?;
    Ok(())
}

pub async fn find_collection(
    backend: &SqlxBackend,
    user: UserId,
    name: &str,
) -> Result<Option<Collection>> {
    let row: Option<CollectionRow> =
        sqlx::query_as("SELECT id, name, user_id FROM collections WHERE user_id = $1 AND name = $2")
            .bind(user.get())
            .bind(name)
            .fetch_optional(backend.pool())
            .await
            .sql_context("Failed to look up collection")?;
    Ok(row.map(collection_from_row))
}

/// Insert `(user, name)` unless present and return its id.
///
/// The insert is gated on the owner existing, so a stale [`UserId`] yields
/// [`BackendError::OwnerNotFound`] rather than an orphaned collection.
async fn ensure_collection(
    conn: &mut sqlx::AnyConnection,
    user: UserId,
    name: &str,
) -> Result<i64> {
    let inserted = sqlx::query(
        "INSERT INTO collections (user_id, name)
         SELECT $1, $2 WHERE EXISTS (SELECT 1 FROM users WHERE id = $1)
         ON CONFLICT (user_id, name) DO NOTHING",
    )
    .bind(user.get())
    .bind(name)
    .execute(&mut *conn)
    .await;
    owner_context(inserted, user, "Failed to create collection")?;

    let row: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM collections WHERE user_id = $1 AND name = $2")
            .bind(user.get())
            .bind(name)
            .fetch_optional(&mut *conn)
            .await
            .sql_context("Failed to resolve collection")?;
    row.map(|(id,)| id)
        .ok_or_else(|| BackendError::OwnerNotFound { user }.into())
}

/// Like `sql_context`, but a foreign key failure on a user-owned row
/// becomes `OwnerNotFound`. Postgres can still hit one when `delete_user`
/// commits between the gate and the insert.
fn owner_context<T>(
    result: std::result::Result<T, sqlx::Error>,
    user: UserId,
    context: &str,
) -> Result<T> {
    match result {
        Err(sqlx::Error::Database(db))
            if db.kind() == sqlx::error::ErrorKind::ForeignKeyViolation =>
        {
            Err(BackendError::OwnerNotFound { user }.into())
        }
        other => other.sql_context(context),
    }
}

/// Create-if-absent. Insert and read share one transaction, so two racing
/// callers both end up reading the single surviving row.
pub async fn resolve_collection(
    backend: &SqlxBackend,
    user: UserId,
    name: &str,
) -> Result<Collection> {
    let mut tx = backend
        .pool()
        .begin()
        .await
        .sql_context("Failed to begin transaction")?;
    let id = ensure_collection(&mut tx, user, name).await?;
    tx.commit()
        .await
        .sql_context("Failed to commit collection")?;

    Ok(Collection {
        id: CollectionId::new(id),
        name: name.to_string(),
        user,
    })
}

pub async fn list_collections(backend: &SqlxBackend, user: UserId) -> Result<Vec<Collection>> {
    let rows: Vec<CollectionRow> =
        sqlx::query_as("SELECT id, name, user_id FROM collections WHERE user_id = $1 ORDER BY name")
            .bind(user.get())
            .fetch_all(backend.pool())
            .await
            .sql_context("Failed to list collections")?;
    Ok(rows.into_iter().map(collection_from_row).collect())
}

pub async fn delete_collection(backend: &SqlxBackend, collection: CollectionId) -> Result<()> {
    let mut tx = backend
        .pool()
        .begin()
        .await
        .sql_context("Failed to begin transaction")?;

    sqlx::query("DELETE FROM objects WHERE collection_id = $1")
        .bind(collection.get())
        .execute(&mut *tx)
        .await
        .sql_context("Failed to delete collection objects")?;

    sqlx::query("DELETE FROM collections WHERE id = $1")
        .bind(collection.get())
        .execute(&mut *tx)
        .await
        .sql_context("Failed to delete collection")?;

    tx.commit()
        .await
        .sql_context("Failed to commit collection deletion")
}

/// Delete `(user, name)` and its objects, if present, in one transaction.
pub async fn delete_collection_by_name(
    backend: &SqlxBackend,
    user: UserId,
    name: &str,
) -> Result<()> {
    let mut tx = backend
        .pool()
        .begin()
        .await
        .sql_context("Failed to begin transaction")?;

    sqlx::query(
        "DELETE FROM objects WHERE collection_id IN
            (SELECT id FROM collections WHERE user_id = $1 AND name = $2)",
    )
    .bind(user.get())
    .bind(name)
    .execute(&mut *tx)
    .await
    .sql_context("Failed to delete collection objects")?;

    sqlx::query("DELETE FROM collections WHERE user_id = $1 AND name = $2")
        .bind(user.get())
        .bind(name)
        .execute(&mut *tx)
        .await
        .sql_context("Failed to delete collection")?;

    tx.commit()
        .await
        .sql_context("Failed to commit collection deletion")
}

pub async fn delete_all_collections(backend: &SqlxBackend, user: UserId) -> Result<()> {
    let mut tx = backend
        .pool()
        .begin()
        .await
        .sql_context("Failed to begin transaction")?;

    sqlx::query(
        "DELETE FROM objects WHERE collection_id IN (SELECT id FROM collections WHERE user_id = $1)",
    )
    .bind(user.get())
    .execute(&mut *tx)
    .await
    .sql_context("Failed to delete objects")?;

    sqlx::query("DELETE FROM collections WHERE user_id = $1")
        .bind(user.get())
        .execute(&mut *tx)
        .await
        .sql_context("Failed to delete collections")?;

    tx.commit()
        .await
        .sql_context("Failed to commit collection deletion")
}

/// Upsert an object, creating its collection on first use.
///
/// `ON CONFLICT ... DO UPDATE` keeps the existing row id, so a replaced
/// object retains its storage key.
pub async fn put_object(
    backend: &SqlxBackend,
    user: UserId,
    name: &str,
    object: NewObject,
    modified: Timestamp,
) -> Result<BasicObject> {
    let payload_size = i64::try_from(object.payload.len()).map_err(|_| {
        BackendError::CorruptRow {
            table: "objects",
            reason: "payload too large".to_string(),
        }
    })?;

    let mut tx = backend
        .pool()
        .begin()
        .await
        .sql_context("Failed to begin transaction")?;

    let collection_id = ensure_collection(&mut tx, user, name).await?;

    let stored: std::result::Result<(i64,), sqlx::Error> = sqlx::query_as(
        "INSERT INTO objects (
            collection_id, object_id, parent_id, predecessor_id,
            modified, ttl, sort_index, payload, payload_size
         ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         ON CONFLICT (collection_id, object_id) DO UPDATE SET
            parent_id = excluded.parent_id,
            predecessor_id = excluded.predecessor_id,
            modified = excluded.modified,
            ttl = excluded.ttl,
            sort_index = excluded.sort_index,
            payload = excluded.payload,
            payload_size = excluded.payload_size
         RETURNING id",
    )
    .bind(collection_id)
    .bind(&object.id)
    .bind(object.parent_id.clone())
    .bind(object.predecessor_id.clone())
    .bind(modified.as_millis())
    .bind(object.ttl)
    .bind(object.sort_index)
    .bind(&object.payload)
    .bind(payload_size)
    .fetch_one(&mut *tx)
    .await;
    let (key,) = owner_context(stored, user, "Failed to store object")?;

    tx.commit().await.sql_context("Failed to commit object")?;

    Ok(object.into_object(
        ObjectKey::new(key),
        CollectionId::new(collection_id),
        modified,
    ))
}

pub async fn delete_object(backend: &SqlxBackend, key: ObjectKey) -> Result<()> {
    sqlx::query("DELETE FROM objects WHERE id = $1")
        .bind(key.get())
        .execute(backend.pool())
        .await
        .sql_context("Failed to delete object")?;
    Ok(())
}

/// Physically remove every expired object across all users.
pub async fn purge_expired(backend: &SqlxBackend, now: Timestamp) -> Result<u64> {
    let result = sqlx::query("DELETE FROM objects WHERE ttl IS NOT NULL AND ttl < $1")
        .bind(expiry::horizon_secs(now))
        .execute(backend.pool())
        .await
        .sql_context("Failed to purge expired objects")?;
    Ok(result.rows_affected())
}
