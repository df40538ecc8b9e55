//! `tracing`-based logging setup, analogous in spirit to the teacher's use of
//! `tracing_subscriber` in its test harness, promoted here to a small runtime
//! helper since this crate has no GUI/TUI consumer fighting for stdout.

use tracing_subscriber::EnvFilter;

/// Install a process-wide `tracing` subscriber.
///
/// Honors `RUST_LOG` if set, defaulting to `info` for this crate and `warn`
/// for dependencies so that retailer-adapter parse warnings (`spec.md §7`)
/// are visible without drowning in library chatter.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,pricehound=info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
