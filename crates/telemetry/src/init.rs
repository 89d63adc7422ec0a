// Path: crates/telemetry/src/init.rs
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

static TEST_LOGGING: OnceCell<()> = OnceCell::new();

/// Initializes the global `tracing` subscriber for structured JSON logging.
pub fn init_tracing() -> Result<(), anyhow::Error> {
    let fmt_layer = fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_target(true);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = Registry::default().with(filter).with(fmt_layer);
    tracing_log::LogTracer::init()?;
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Initializes compact stderr logging for tests. Safe to call from every
/// test; only the first call installs the subscriber.
pub fn init_test_logging() {
    TEST_LOGGING.get_or_init(|| {
        let fmt_layer = fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_test_writer();
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
        let subscriber = Registry::default().with(filter).with(fmt_layer);
        let _ = tracing_log::LogTracer::init();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
