//! Subcommand implementations.

pub mod info;
pub mod reap;
pub mod user;
