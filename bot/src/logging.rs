//! Diagnostic tracing for the bot.
//!
//! # Separation of Concerns
//!
//! - **Tracing (this module)**: Diagnostics via `RUST_LOG`, output to stderr.
//!   Not persisted.
//!
//! - **Record log (`io/record`)**: One line per cycle outcome in the record
//!   file. Always written, unaffected by `RUST_LOG`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset, empty, or unparsable: the bot's own
/// progress (video resolved, comment posted or rejected) plus warnings from
/// dependencies.
pub const DEFAULT_FILTER: &str = "warn,countbot=info";

/// Initialize the tracing subscriber.
///
/// Output: stderr, compact format. A long-running `countbot run` under a
/// service manager keeps the record file on stdout and diagnostics on stderr.
///
/// # Example
/// ```bash
/// RUST_LOG=countbot=debug countbot run --max-cycles 1
/// ```
pub fn init() {
    let spec = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    tracing_subscriber::registry()
        .with(build_filter(spec.as_deref()))
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}

fn build_filter(spec: Option<&str>) -> EnvFilter {
    spec.filter(|spec| !spec.trim().is_empty())
        .and_then(|spec| EnvFilter::try_new(spec).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}
