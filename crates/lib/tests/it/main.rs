/*! Integration tests for weavestore.
 *
 * This test suite is organized as a single integration test binary
 * following the pattern described by matklad in
 * https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html
 *
 * The module structure mirrors the main library structure:
 * - backend: Tests run against every `BackendImpl` implementation, plus persistence
 * - storage: Tests for the Storage engine (registry, queries, writes, cascades)
 * - expiry: Tests for read-time expiry and the background reaper
 * - user: Tests for user account management
 */

use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("weavestore=info".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

mod backend;
mod expiry;
mod storage;
mod user;
