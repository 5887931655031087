//! TTL expiry policy.
//!
//! Two mechanisms cooperate:
//!
//! * **Read-time filtering.** Every read takes an `as_of` horizon, fixed once
//!   per logical request, and hides objects whose `ttl` lies before it. Backends
//!   apply [`is_expired`] (or its SQL equivalent `ttl IS NULL OR ttl >= as_of`)
//!   to every read and aggregate.
//! * **Background reclamation.** [`Reaper`] periodically calls
//!   [`Storage::purge_expired`](crate::Storage::purge_expired), which physically
//!   removes expired rows across all users. Reads never depend on it.
//!
//! `ttl` is whole seconds, so the horizon is compared in whole seconds too.

mod errors;
mod reaper;

pub use errors::ReaperError;
pub use reaper::{DEFAULT_REAP_INTERVAL, Reaper, ReaperHandle};

use crate::entity::Timestamp;

/// Whether an object with the given `ttl` is logically gone at `as_of`.
pub fn is_expired(ttl: Option<i64>, as_of: Timestamp) -> bool {
    matches!(ttl, Some(ttl) if ttl < horizon_secs(as_of))
}

/// The expiry horizon in the unit `ttl` is stored in.
pub fn horizon_secs(as_of: Timestamp) -> i64 {
    as_of.as_secs()
}
