//! Structured logging setup.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::GatewayConfig;

/// Initialize the tracing subscriber from the configuration snapshot.
///
/// RUST_LOG takes precedence over the configured level. With a logs
/// directory configured, output goes to `gateway.log` inside it;
/// otherwise to stderr — pretty in development, compact without ANSI in
/// production.
pub fn init(config: &GatewayConfig) -> io::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    match &config.observability.logs_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(Path::new(dir).join("gateway.log"))?;
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(Arc::new(file))
                        .with_ansi(false),
                )
                .init();
        }
        None if config.environment.is_production() => {
            registry
                .with(tracing_subscriber::fmt::layer().compact().with_ansi(false))
                .init();
        }
        None => {
            registry.with(tracing_subscriber::fmt::layer()).init();
        }
    }
    Ok(())
}
