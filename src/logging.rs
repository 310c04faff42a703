// src/logging.rs

//! Logging setup for `taskdag` using `tracing` + `tracing-subscriber`.
//!
//! The filter is taken from the first of these that parses:
//! 1. `--log-level` CLI flag
//! 2. `TASKDAG_LOG` environment variable (any `EnvFilter` directive, e.g.
//!    `"debug"` or `"taskdag::workflow=trace"`)
//! 3. `RUST_LOG`
//! 4. the caller's default
//!
//! The binary logs to STDERR so that stdout carries only results; the test
//! helpers in `taskdag-test-utils` use the same filter with the test writer.

use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

/// Crate-specific filter variable, consulted before `RUST_LOG`.
pub const LOG_ENV: &str = "TASKDAG_LOG";

/// Install the global subscriber for the binary.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    fmt()
        .with_env_filter(env_filter(cli_level, "info"))
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))?;

    Ok(())
}

/// Filter for the given CLI level and the current environment.
pub fn env_filter(cli_level: Option<LogLevel>, default: &str) -> EnvFilter {
    let from_env = |var: &str| std::env::var(var).ok();

    select_filter(
        [
            cli_level.map(|lvl| directive(lvl).to_string()),
            from_env(LOG_ENV),
            from_env("RUST_LOG"),
        ],
        default,
    )
}

fn select_filter<I>(candidates: I, default: &str) -> EnvFilter
where
    I: IntoIterator<Item = Option<String>>,
{
    candidates
        .into_iter()
        .flatten()
        .filter(|d| !d.trim().is_empty())
        .find_map(|d| EnvFilter::try_new(d.trim()).ok())
        .unwrap_or_else(|| EnvFilter::new(default))
}

fn directive(lvl: LogLevel) -> &'static str {
    match lvl {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}
