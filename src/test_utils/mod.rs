//! Helpers shared by unit tests

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
});

/// Installs the test log subscriber once per test binary; `RUST_LOG` selects levels.
pub fn enable_logger() {
    *LOGGER_INIT;
    println!("setup logger for unit test.");
}
