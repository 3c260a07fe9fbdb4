//! Device position sources.

use async_trait::async_trait;
use chrono::Utc;
use skycast_core::LocationConfig;
use std::sync::Arc;
use std::time::Duration;

use crate::types::{LocationError, Position};

/// Options for a position request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionOptions {
    pub enable_high_accuracy: bool,
    /// `None` waits indefinitely
    pub timeout: Option<Duration>,
    /// Age up to which a previous fix may be reused; zero always asks again
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: false,
            timeout: None,
            maximum_age: Duration::ZERO,
        }
    }
}

impl PositionOptions {
    /// Options for the first position request of a session
    pub fn initial() -> Self {
        Self {
            enable_high_accuracy: true,
            timeout: Some(Duration::from_secs(10)),
            maximum_age: Duration::from_secs(300),
        }
    }

    pub fn from_config(config: &LocationConfig) -> Self {
        Self {
            enable_high_accuracy: true,
            timeout: Some(Duration::from_secs(config.timeout_secs)),
            maximum_age: Duration::from_secs(config.maximum_age_secs),
        }
    }
}

/// Something that can report where the device is.
#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn current_position(&self, options: &PositionOptions) -> Result<Position, LocationError>;
}

/// Reports a configured position, for hosts without a positioning service.
#[derive(Debug, Clone)]
pub struct FixedPositionSource {
    lat: f64,
    lon: f64,
}

impl FixedPositionSource {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

#[async_trait]
impl PositionSource for FixedPositionSource {
    async fn current_position(&self, _options: &PositionOptions) -> Result<Position, LocationError> {
        Ok(Position {
            lat: self.lat,
            lon: self.lon,
            accuracy: None,
            timestamp: Utc::now(),
        })
    }
}

/// Platform without geolocation support; every request fails.
#[derive(Debug, Clone, Default)]
pub struct UnsupportedPositionSource;

#[async_trait]
impl PositionSource for UnsupportedPositionSource {
    async fn current_position(&self, _options: &PositionOptions) -> Result<Position, LocationError> {
        Err(LocationError::Unsupported)
    }
}

/// Position source for this host
pub fn platform_source(config: &LocationConfig) -> Arc<dyn PositionSource> {
    match config.fixed_position() {
        Some((lat, lon)) => {
            tracing::info!("Using configured device position: {}, {}", lat, lon);
            Arc::new(FixedPositionSource::new(lat, lon))
        }
        None => {
            tracing::debug!("No positioning service available");
            Arc::new(UnsupportedPositionSource)
        }
    }
}
