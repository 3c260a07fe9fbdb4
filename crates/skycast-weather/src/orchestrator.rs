//! Keeps the displayed weather in step with the active location and units.
//!
//! Fetches are neither coalesced nor ordered: each one flips `loading` on and
//! off on its own and overwrites the snapshot or error when it completes, so
//! the last fetch to *complete* wins. A failed fetch leaves the previous
//! snapshot in place.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::client::WeatherClient;
use crate::preferences::PreferencesStore;
use crate::types::{Location, UnitSystem, WeatherSnapshot};

#[derive(Debug, Default)]
struct OrchestratorState {
    location: Option<Location>,
    /// Coordinates of the most recently issued fetch
    fetched_for: Option<(f64, f64)>,
    snapshot: Option<Arc<WeatherSnapshot>>,
    loading: bool,
    error: Option<String>,
    units: UnitSystem,
}

impl OrchestratorState {
    fn fetch_target(&self) -> Option<(f64, f64, UnitSystem)> {
        self.location
            .as_ref()
            .filter(|location| location.is_valid())
            .map(|location| (location.lat, location.lon, self.units))
    }
}

pub struct WeatherOrchestrator {
    client: WeatherClient,
    state: Mutex<OrchestratorState>,
}

impl WeatherOrchestrator {
    /// Units start from the stored preference.
    pub fn new(client: WeatherClient, prefs: &PreferencesStore) -> Self {
        Self {
            client,
            state: Mutex::new(OrchestratorState {
                units: prefs.preferred_units(),
                ..OrchestratorState::default()
            }),
        }
    }

    pub fn client(&self) -> &WeatherClient {
        &self.client
    }

    pub fn snapshot(&self) -> Option<Arc<WeatherSnapshot>> {
        self.state.lock().snapshot.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    pub fn units(&self) -> UnitSystem {
        self.state.lock().units
    }

    pub fn location(&self) -> Option<Location> {
        self.state.lock().location.clone()
    }

    /// Make `location` active. Fetches when it is valid and its coordinates
    /// differ from the last fetch's. Returns whether a fetch ran.
    pub async fn set_location(&self, location: Location) -> bool {
        let target = {
            let mut state = self.state.lock();
            let moved = state.fetched_for != Some(location.coordinates());
            state.location = Some(location);
            state.fetch_target().filter(|_| moved)
        };

        match target {
            Some((lat, lon, units)) => {
                self.fetch(lat, lon, units).await;
                true
            }
            None => false,
        }
    }

    /// Re-fetch for the active location. No-op without a valid location.
    pub async fn refresh_weather(&self) -> bool {
        let target = self.state.lock().fetch_target();
        match target {
            Some((lat, lon, units)) => {
                self.fetch(lat, lon, units).await;
                true
            }
            None => {
                tracing::debug!("Refresh skipped: no valid location");
                false
            }
        }
    }

    /// Switch units and re-fetch, since the provider converts server-side.
    pub async fn change_units(&self, units: UnitSystem) -> bool {
        let target = {
            let mut state = self.state.lock();
            state.units = units;
            state.fetch_target()
        };

        match target {
            Some((lat, lon, units)) => {
                self.fetch(lat, lon, units).await;
                true
            }
            None => false,
        }
    }

    async fn fetch(&self, lat: f64, lon: f64, units: UnitSystem) {
        {
            let mut state = self.state.lock();
            state.loading = true;
            state.error = None;
            state.fetched_for = Some((lat, lon));
        }

        tracing::info!("Fetching weather for: {}, {} ({})", lat, lon, units);
        let result = self.client.fetch_by_coordinates(lat, lon, units).await;

        let mut state = self.state.lock();
        match result {
            Ok(snapshot) => state.snapshot = Some(Arc::new(snapshot)),
            Err(e) => {
                tracing::error!("Weather fetch error: {}", e);
                state.error = Some(format!("Failed to fetch weather data: {}", e));
            }
        }
        state.loading = false;
    }
}
