//! Query model for reading objects out of a collection.
//!
//! [`ObjectQuery`] is a plain, backend-neutral description of a read: a
//! conjunction of optional predicates ([`ObjectFilter`]), an optional
//! [`SortOrder`] and `limit`/`offset` pagination. Backends translate it into
//! their native mechanism; the in-memory backend uses the evaluation helpers
//! defined here directly, and the SQL backend builds a `WHERE` clause with the
//! same semantics.
//!
//! The expiry rule is not part of the filter. Backends always apply it on top
//! of whatever the caller asks for.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

mod errors;

pub use errors::QueryError;

use crate::entity::{BasicObject, Timestamp};

/// Order in which a query returns objects.
///
/// Ties (and unsorted queries) are broken by ascending storage key so repeated
/// pages over an unchanged collection are stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOrder {
    /// Ascending `modified`.
    Oldest,
    /// Descending `modified`.
    Newest,
    /// Descending `sort_index`; objects without one come last.
    Index,
}

impl SortOrder {
    /// Wire name of the order.
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Oldest => "oldest",
            SortOrder::Newest => "newest",
            SortOrder::Index => "index",
        }
    }

    /// Total order over objects for this sort, including the key tie-break.
    pub fn compare(self, a: &BasicObject, b: &BasicObject) -> Ordering {
        let primary = match self {
            SortOrder::Oldest => a.modified.cmp(&b.modified),
            SortOrder::Newest => b.modified.cmp(&a.modified),
            SortOrder::Index => match (a.sort_index, b.sort_index) {
                (Some(x), Some(y)) => y.cmp(&x),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        };
        primary.then_with(|| a.key.cmp(&b.key))
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "oldest" => Ok(SortOrder::Oldest),
            "newest" => Ok(SortOrder::Newest),
            "index" => Ok(SortOrder::Index),
            _ => Err(QueryError::UnknownSortOrder {
                value: s.to_string(),
            }),
        }
    }
}

/// Optional predicates, all combined with AND.
///
/// A `None` field leaves that attribute unconstrained. `ids: Some(vec![])` is
/// *not* the same as `None`: it matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectFilter {
    pub ids: Option<Vec<String>>,
    pub predecessor_id: Option<String>,
    pub parent_id: Option<String>,
    /// Strictly before (`<`).
    pub modified_before: Option<Timestamp>,
    /// At or after (`>=`).
    pub modified_since: Option<Timestamp>,
    /// Strictly above (`>`).
    pub sort_index_above: Option<i64>,
    /// Strictly below (`<`).
    pub sort_index_below: Option<i64>,
}

impl ObjectFilter {
    /// True when the filter can match nothing regardless of data.
    pub fn is_unsatisfiable(&self) -> bool {
        matches!(&self.ids, Some(ids) if ids.is_empty())
    }

    /// Evaluate the predicates against one object. Expiry is not considered.
    pub fn matches(&self, object: &BasicObject) -> bool {
        if let Some(ids) = &self.ids
            && !ids.iter().any(|id| *id == object.id)
        {
            return false;
        }
        if let Some(predecessor) = &self.predecessor_id
            && object.predecessor_id.as_ref() != Some(predecessor)
        {
            return false;
        }
        if let Some(parent) = &self.parent_id
            && object.parent_id.as_ref() != Some(parent)
        {
            return false;
        }
        if let Some(before) = self.modified_before
            && object.modified >= before
        {
            return false;
        }
        if let Some(since) = self.modified_since
            && object.modified < since
        {
            return false;
        }
        // A missing sort index satisfies neither bound, as with SQL NULL
        if let Some(above) = self.sort_index_above
            && !object.sort_index.is_some_and(|index| index > above)
        {
            return false;
        }
        if let Some(below) = self.sort_index_below
            && !object.sort_index.is_some_and(|index| index < below)
        {
            return false;
        }
        true
    }
}

/// A complete read request against one collection.
///
/// ```
/// use weavestore::query::{ObjectQuery, SortOrder};
///
/// let query = ObjectQuery::new()
///     .parent_id("folder-1")
///     .sort(SortOrder::Newest)
///     .limit(10);
/// assert_eq!(query.limit, Some(10));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectQuery {
    pub filter: ObjectFilter,
    pub sort: Option<SortOrder>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl ObjectQuery {
    /// An unconstrained query: every visible object, in key order.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter.ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn predecessor_id(mut self, predecessor_id: impl Into<String>) -> Self {
        self.filter.predecessor_id = Some(predecessor_id.into());
        self
    }

    pub fn parent_id(mut self, parent_id: impl Into<String>) -> Self {
        self.filter.parent_id = Some(parent_id.into());
        self
    }

    pub fn modified_before(mut self, before: Timestamp) -> Self {
        self.filter.modified_before = Some(before);
        self
    }

    pub fn modified_since(mut self, since: Timestamp) -> Self {
        self.filter.modified_since = Some(since);
        self
    }

    pub fn sort_index_above(mut self, above: i64) -> Self {
        self.filter.sort_index_above = Some(above);
        self
    }

    pub fn sort_index_below(mut self, below: i64) -> Self {
        self.filter.sort_index_below = Some(below);
        self
    }

    pub fn sort(mut self, sort: SortOrder) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Sort in place according to `self.sort`, falling back to key order.
    pub fn order(&self, objects: &mut [BasicObject]) {
        match self.sort {
            Some(sort) => objects.sort_by(|a, b| sort.compare(a, b)),
            None => objects.sort_by_key(|object| object.key),
        }
    }

    /// Apply `offset` then `limit` to an already ordered sequence.
    pub fn paginate(&self, objects: Vec<BasicObject>) -> Vec<BasicObject> {
        let offset = self
            .offset
            .map_or(0, |offset| usize::try_from(offset).unwrap_or(usize::MAX));
        let limit = self
            .limit
            .map_or(usize::MAX, |limit| usize::try_from(limit).unwrap_or(usize::MAX));
        objects.into_iter().skip(offset).take(limit).collect()
    }
}
