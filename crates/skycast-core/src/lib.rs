pub mod config;
pub mod debounce;
pub mod error;

pub use config::{
    Config, LocationConfig, SearchConfig, StorageConfig, ValidationResult, WeatherConfig,
};
pub use debounce::{Debouncer, Throttle};
pub use error::{AppError, ConfigError, NetworkError, ReqwestErrorExt, RusqliteErrorExt, StorageError};

use anyhow::Result;

/// Initialize logging. Honors `RUST_LOG`, defaulting to `info`.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    tracing::info!("SkyCast core initialized");
    Ok(())
}
