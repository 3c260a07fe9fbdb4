//! Resolves the device location on startup and on demand.
//!
//! The first resolution never leaves callers empty-handed: on failure the
//! configured fallback city is used and the error is kept for diagnostics.
//! A manual refresh has no fallback; it reports the error and keeps the
//! previous location.

use parking_lot::Mutex;
use skycast_core::LocationConfig;
use std::sync::Arc;
use std::time::Duration;

use crate::location::{PositionOptions, PositionSource};
use crate::types::{Location, LocationError, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverStatus {
    Pending,
    Resolved,
    FailedWithFallback,
    /// A manual refresh failed; the previous location is still current
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolverState {
    pub status: ResolverStatus,
    pub location: Option<Location>,
    pub error: Option<String>,
}

impl Default for ResolverState {
    fn default() -> Self {
        Self {
            status: ResolverStatus::Pending,
            location: None,
            error: None,
        }
    }
}

pub struct GeolocationResolver {
    source: Arc<dyn PositionSource>,
    initial_options: PositionOptions,
    fallback: Location,
    state: Mutex<ResolverState>,
    last_fix: Mutex<Option<Position>>,
}

impl GeolocationResolver {
    /// Resolver with the stock request options and New York as fallback
    pub fn new(source: Arc<dyn PositionSource>) -> Self {
        Self::from_config(source, &LocationConfig::default())
    }

    pub fn from_config(source: Arc<dyn PositionSource>, config: &LocationConfig) -> Self {
        let fallback = Location {
            name: Some(config.fallback_name.clone()).filter(|name| !name.is_empty()),
            ..Location::new(config.fallback_latitude, config.fallback_longitude)
        };

        Self {
            source,
            initial_options: PositionOptions::from_config(config),
            fallback,
            state: Mutex::new(ResolverState::default()),
            last_fix: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ResolverState {
        self.state.lock().clone()
    }

    pub fn status(&self) -> ResolverStatus {
        self.state.lock().status
    }

    pub fn location(&self) -> Option<Location> {
        self.state.lock().location.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    pub fn fallback(&self) -> &Location {
        &self.fallback
    }

    fn cached_fix(&self, maximum_age: Duration) -> Option<Position> {
        if maximum_age.is_zero() {
            return None;
        }

        let last_fix = self.last_fix.lock();
        let fix = last_fix.as_ref()?;
        let age = (chrono::Utc::now() - fix.timestamp)
            .to_std()
            .unwrap_or(Duration::ZERO);
        (age <= maximum_age).then(|| fix.clone())
    }

    async fn request_position(&self, options: &PositionOptions) -> Result<Position, LocationError> {
        if let Some(fix) = self.cached_fix(options.maximum_age) {
            tracing::debug!("Reusing position fix from {}", fix.timestamp);
            return Ok(fix);
        }

        let request = self.source.current_position(options);
        let position = match options.timeout {
            Some(limit) => tokio::time::timeout(limit, request)
                .await
                .map_err(|_| LocationError::Timeout)??,
            None => request.await?,
        };

        *self.last_fix.lock() = Some(position.clone());
        Ok(position)
    }

    /// First resolution of a session. Always yields a location.
    pub async fn resolve_initial(&self) -> Location {
        self.state.lock().status = ResolverStatus::Pending;

        let options = self.initial_options;
        let (status, location, error) = match self.request_position(&options).await {
            Ok(position) => {
                tracing::info!("Got location: {}, {}", position.lat, position.lon);
                (ResolverStatus::Resolved, Location::from(&position), None)
            }
            Err(e) => {
                tracing::warn!(
                    "Geolocation failed ({}), falling back to {}",
                    e,
                    self.fallback.label()
                );
                (
                    ResolverStatus::FailedWithFallback,
                    self.fallback.clone(),
                    Some(e.to_string()),
                )
            }
        };

        let mut state = self.state.lock();
        state.status = status;
        state.location = Some(location.clone());
        state.error = error;
        location
    }

    /// Ask for the position again. On failure the previous location stays.
    pub async fn refresh_location(&self) -> Result<Location, LocationError> {
        {
            let mut state = self.state.lock();
            state.status = ResolverStatus::Pending;
            state.error = None;
        }

        let result = self.request_position(&PositionOptions::default()).await;

        let mut state = self.state.lock();
        match result {
            Ok(position) => {
                let location = Location::from(&position);
                tracing::info!("Refreshed location: {}, {}", location.lat, location.lon);
                state.status = ResolverStatus::Resolved;
                state.location = Some(location.clone());
                Ok(location)
            }
            Err(e) => {
                tracing::error!("Location refresh failed: {}", e);
                state.status = ResolverStatus::Failed;
                state.error = Some(e.to_string());
                Err(e)
            }
        }
    }
}
