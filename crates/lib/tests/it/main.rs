/*! Integration tests for Roster.
 *
 * This test suite is organized as a single integration test binary
 * following the pattern described by matklad in
 * https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html
 *
 * The module structure mirrors the main library structure:
 * - lock: Tests for the keyed lock service
 * - files: Tests for per-user upload management and its serialization
 * - privileges: Tests for privilege reconciliation and checks
 * - stats: Tests for statistics derived from the submission log
 * - account: Tests for cache-aware account reads and destruction
 * - backend: Tests run against every persistence backend
 */

use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("roster=info".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

mod account;
mod files;
mod helpers;
mod privileges;
