// 📝 Logging setup shared by both binaries

use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_directive` applies.
/// Calling this twice is harmless, the second install is ignored.
pub fn init(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// True when the user asked for log output explicitly.
pub fn requested() -> bool {
    std::env::var_os("RUST_LOG").is_some()
}
