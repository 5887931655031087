//! Read-side operations for SQL backends.
//!
//! [`ObjectQuery`] is translated into a parameterized `SELECT`. Every read is
//! scoped to one user through a join on `collections` and carries the expiry
//! predicate, so expired rows are invisible whether or not the reaper has run.

use crate::Result;
use crate::backend::errors::BackendError;
use crate::entity::{
    BasicObject, CollectionId, CollectionStats, CollectionSummary, ObjectKey, Timestamp, UserId,
};
use crate::expiry;
use crate::query::{ObjectQuery, SortOrder};

use super::{DbKind, SqlxBackend, SqlxResultExt};

/// Columns selected for a [`BasicObject`], in [`ObjectRow`] order.
const OBJECT_COLUMNS: &str = "o.id, o.collection_id, o.object_id, o.parent_id, \
     o.predecessor_id, o.modified, o.ttl, o.sort_index, o.payload";

/// Objects of one named collection of one user that are not expired.
/// Binds `$1` user id, `$2` collection name, `$3` expiry horizon.
const VISIBLE_IN_COLLECTION: &str = "FROM objects o
     JOIN collections c ON c.id = o.collection_id
     WHERE c.user_id = $1 AND c.name = $2 AND (o.ttl IS NULL OR o.ttl >= $3)";

type ObjectRow = (
    i64,
    i64,
    String,
    Option<String>,
    Option<String>,
    i64,
    Option<i64>,
    Option<i64>,
    String,
);

/// Aggregate row: newest modified, count, summed payload bytes.
type StatsRow = (Option<i64>, i64, i64);

fn object_from_row(row: ObjectRow) -> BasicObject {
    let (key, collection, id, parent_id, predecessor_id, modified, ttl, sort_index, payload) = row;
    BasicObject {
        key: ObjectKey::new(key),
        id,
        parent_id,
        predecessor_id,
        modified: Timestamp::from_millis(modified),
        ttl,
        sort_index,
        payload,
        collection: CollectionId::new(collection),
    }
}

fn non_negative(column: &'static str, value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| {
        BackendError::CorruptRow {
            table: "objects",
            reason: format!("negative {column}: {value}"),
        }
        .into()
    })
}

fn stats_from_row((last_modified, count, bytes): StatsRow) -> Result<CollectionStats> {
    Ok(CollectionStats::from_totals(
        last_modified.map(Timestamp::from_millis),
        non_negative("count", count)?,
        non_negative("payload_size", bytes)?,
    ))
}

/// Bind value of a dynamically built statement.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SqlArg {
    Int(i64),
    Text(String),
}

/// A SQL string under construction together with its positional arguments.
#[derive(Debug)]
struct Statement {
    sql: String,
    args: Vec<SqlArg>,
}

impl Statement {
    fn new(sql: impl Into<String>, args: Vec<SqlArg>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }

    /// Register an argument and return its placeholder.
    fn arg(&mut self, arg: SqlArg) -> String {
        self.args.push(arg);
        format!("${}", self.args.len())
    }

    fn push(&mut self, fragment: &str) {
        self.sql.push_str(fragment);
    }

    async fn fetch_objects(self, backend: &SqlxBackend) -> Result<Vec<BasicObject>> {
        let mut query = sqlx::query_as::<sqlx::Any, ObjectRow>(&self.sql);
        for arg in self.args {
            query = match arg {
                SqlArg::Int(value) => query.bind(value),
                SqlArg::Text(value) => query.bind(value),
            };
        }
        let rows = query
            .fetch_all(backend.pool())
            .await
            .sql_context("Failed to query objects")?;
        Ok(rows.into_iter().map(object_from_row).collect())
    }
}

fn clamp(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Build the full `SELECT` for a query. Expects a satisfiable filter.
fn build_select(
    kind: DbKind,
    user: UserId,
    name: &str,
    query: &ObjectQuery,
    as_of: Timestamp,
) -> Statement {
    let mut stmt = Statement::new(
        format!("SELECT {OBJECT_COLUMNS} {VISIBLE_IN_COLLECTION}"),
        vec![
            SqlArg::Int(user.get()),
            SqlArg::Text(name.to_string()),
            SqlArg::Int(expiry::horizon_secs(as_of)),
        ],
    );
    let filter = &query.filter;

    if let Some(ids) = &filter.ids {
        let placeholders: Vec<String> = ids
            .iter()
            .map(|id| stmt.arg(SqlArg::Text(id.clone())))
            .collect();
        stmt.push(&format!(" AND o.object_id IN ({})", placeholders.join(", ")));
    }
    if let Some(predecessor) = &filter.predecessor_id {
        let p = stmt.arg(SqlArg::Text(predecessor.clone()));
        stmt.push(&format!(" AND o.predecessor_id = {p}"));
    }
    if let Some(parent) = &filter.parent_id {
        let p = stmt.arg(SqlArg::Text(parent.clone()));
        stmt.push(&format!(" AND o.parent_id = {p}"));
    }
    if let Some(before) = filter.modified_before {
        let p = stmt.arg(SqlArg::Int(before.as_millis()));
        stmt.push(&format!(" AND o.modified < {p}"));
    }
    if let Some(since) = filter.modified_since {
        let p = stmt.arg(SqlArg::Int(since.as_millis()));
        stmt.push(&format!(" AND o.modified >= {p}"));
    }
    if let Some(above) = filter.sort_index_above {
        let p = stmt.arg(SqlArg::Int(above));
        stmt.push(&format!(" AND o.sort_index > {p}"));
    }
    if let Some(below) = filter.sort_index_below {
        let p = stmt.arg(SqlArg::Int(below));
        stmt.push(&format!(" AND o.sort_index < {p}"));
    }

    stmt.push(match query.sort {
        None => " ORDER BY o.id ASC",
        Some(SortOrder::Oldest) => " ORDER BY o.modified ASC, o.id ASC",
        Some(SortOrder::Newest) => " ORDER BY o.modified DESC, o.id ASC",
        Some(SortOrder::Index) => {
            " ORDER BY (o.sort_index IS NULL) ASC, o.sort_index DESC, o.id ASC"
        }
    });

    if let Some(limit) = query.limit {
        let p = stmt.arg(SqlArg::Int(clamp(limit)));
        stmt.push(&format!(" LIMIT {p}"));
    }
    if let Some(offset) = query.offset {
        // SQLite only accepts OFFSET after a LIMIT; -1 means unbounded
        if query.limit.is_none() && kind == DbKind::Sqlite {
            stmt.push(" LIMIT -1");
        }
        let p = stmt.arg(SqlArg::Int(clamp(offset)));
        stmt.push(&format!(" OFFSET {p}"));
    }

    stmt
}

pub async fn query_objects(
    backend: &SqlxBackend,
    user: UserId,
    name: &str,
    query: &ObjectQuery,
    as_of: Timestamp,
) -> Result<Vec<BasicObject>> {
    // `IN ()` is not valid SQL; an empty id set matches nothing anyway
    if query.filter.is_unsatisfiable() {
        return Ok(Vec::new());
    }
    build_select(backend.kind(), user, name, query, as_of)
        .fetch_objects(backend)
        .await
}

pub async fn get_object(
    backend: &SqlxBackend,
    user: UserId,
    name: &str,
    id: &str,
    as_of: Timestamp,
) -> Result<Option<BasicObject>> {
    let sql = format!("SELECT {OBJECT_COLUMNS} {VISIBLE_IN_COLLECTION} AND o.object_id = $4");
    let row: Option<ObjectRow> = sqlx::query_as(&sql)
        .bind(user.get())
        .bind(name)
        .bind(expiry::horizon_secs(as_of))
        .bind(id)
        .fetch_optional(backend.pool())
        .await
        .sql_context("Failed to get object")?;
    Ok(row.map(object_from_row))
}

pub async fn collection_stats(
    backend: &SqlxBackend,
    user: UserId,
    name: &str,
    as_of: Timestamp,
) -> Result<CollectionStats> {
    let sql = format!(
        "SELECT MAX(o.modified), COUNT(o.id), CAST(COALESCE(SUM(o.payload_size), 0) AS BIGINT)
         {VISIBLE_IN_COLLECTION}"
    );
    let row: StatsRow = sqlx::query_as(&sql)
        .bind(user.get())
        .bind(name)
        .bind(expiry::horizon_secs(as_of))
        .fetch_one(backend.pool())
        .await
        .sql_context("Failed to aggregate collection")?;
    stats_from_row(row)
}

pub async fn collection_summaries(
    backend: &SqlxBackend,
    user: UserId,
    as_of: Timestamp,
) -> Result<Vec<CollectionSummary>> {
    let rows: Vec<(String, Option<i64>, i64, i64)> = sqlx::query_as(
        "SELECT c.name, MAX(o.modified), COUNT(o.id),
                CAST(COALESCE(SUM(o.payload_size), 0) AS BIGINT)
         FROM collections c
         LEFT JOIN objects o
           ON o.collection_id = c.id AND (o.ttl IS NULL OR o.ttl >= $2)
         WHERE c.user_id = $1
         GROUP BY c.id, c.name
         ORDER BY c.name",
    )
    .bind(user.get())
    .bind(expiry::horizon_secs(as_of))
    .fetch_all(backend.pool())
    .await
    .sql_context("Failed to summarize collections")?;

    rows.into_iter()
        .map(|(name, last_modified, count, bytes)| {
            Ok(CollectionSummary {
                name,
                stats: stats_from_row((last_modified, count, bytes))?,
            })
        })
        .collect()
}

pub async fn user_payload_bytes(
    backend: &SqlxBackend,
    user: UserId,
    as_of: Timestamp,
) -> Result<u64> {
    let (bytes,): (i64,) = sqlx::query_as(
        "SELECT CAST(COALESCE(SUM(o.payload_size), 0) AS BIGINT)
         FROM objects o
         JOIN collections c ON c.id = o.collection_id
         WHERE c.user_id = $1 AND (o.ttl IS NULL OR o.ttl >= $2)",
    )
    .bind(user.get())
    .bind(expiry::horizon_secs(as_of))
    .fetch_one(backend.pool())
    .await
    .sql_context("Failed to sum user payloads")?;
    non_negative("payload_size", bytes)
}
