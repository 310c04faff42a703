//! Shared helpers for the integration tests: tracing setup and small `i64`
//! tasks for wiring test workflows.

pub mod tasks;

use std::sync::Once;

use tracing_subscriber::fmt;

static INIT: Once = Once::new();

/// Install a test subscriber once per test binary.
///
/// Output goes through `with_test_writer()`, so it only shows up for failing
/// tests unless run with `-- --nocapture`. The filter follows the binary's
/// rules (`TASKDAG_LOG`, then `RUST_LOG`) and defaults to `info`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = fmt()
            .with_env_filter(taskdag::logging::env_filter(None, "info"))
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}
