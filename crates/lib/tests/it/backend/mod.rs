//! Backend tests.
//!
//! `conformance` runs the same assertions against every local backend so the
//! in-memory and SQL implementations cannot drift apart.

mod save_load;
#[cfg(feature = "sqlite")]
mod sqlite_file;
