//! Logging setup shared by both binaries.
//!
//! Console output goes to stderr so it does not interleave with the panel
//! printed on stdout. `RUST_LOG` overrides the configured level.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;

/// File name prefix for daily log files.
pub const LOG_FILE_PREFIX: &str = "robot-arm.log";

/// Pick the filter directive: `RUST_LOG` when set and non-empty, otherwise the
/// configured level.
fn filter_directive(env: Option<String>, level: &str) -> String {
    match env {
        Some(directive) if !directive.trim().is_empty() => directive,
        _ => level.to_string(),
    }
}

/// Install the global subscriber.
///
/// Returns the appender guard when file logging is enabled; keep it alive
/// until exit or buffered lines are lost.
pub fn init(config: &LoggingConfig) -> Option<WorkerGuard> {
    let directive = filter_directive(std::env::var(EnvFilter::DEFAULT_ENV).ok(), &config.level);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"));
    let console = fmt::layer().with_writer(std::io::stderr);

    if config.directory.is_empty() {
        tracing_subscriber::registry().with(filter).with(console).init();
        return None;
    }

    let appender = tracing_appender::rolling::daily(&config.directory, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let file = fmt::layer().with_ansi(false).with_writer(writer);

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .init();
    Some(guard)
}
