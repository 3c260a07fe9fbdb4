//! Session-level glue: picks the starting location, applies user actions and
//! records them in the preferences.

use skycast_core::Config;
use std::sync::Arc;

use crate::client::WeatherClient;
use crate::location::PositionSource;
use crate::orchestrator::WeatherOrchestrator;
use crate::preferences::PreferencesStore;
use crate::resolver::GeolocationResolver;
use crate::search::CitySearch;
use crate::types::{Backdrop, Location, LocationError, UnitSystem, WeatherError};

pub struct Dashboard {
    prefs: PreferencesStore,
    resolver: GeolocationResolver,
    orchestrator: WeatherOrchestrator,
}

impl Dashboard {
    pub fn new(client: WeatherClient, prefs: PreferencesStore, resolver: GeolocationResolver) -> Self {
        let orchestrator = WeatherOrchestrator::new(client, &prefs);
        Self {
            prefs,
            resolver,
            orchestrator,
        }
    }

    pub fn from_config(
        config: &Config,
        prefs: PreferencesStore,
        source: Arc<dyn PositionSource>,
    ) -> Result<Self, WeatherError> {
        let client = WeatherClient::new(&config.weather, config.api_key.clone())?;
        let resolver = GeolocationResolver::from_config(source, &config.location);
        Ok(Self::new(client, prefs, resolver))
    }

    pub fn orchestrator(&self) -> &WeatherOrchestrator {
        &self.orchestrator
    }

    pub fn resolver(&self) -> &GeolocationResolver {
        &self.resolver
    }

    pub fn preferences(&self) -> &PreferencesStore {
        &self.prefs
    }

    /// Show the last viewed location if there is one, otherwise the device
    /// location (or the fallback city). Returns the location shown.
    pub async fn start(&self) -> Location {
        let location = match self.prefs.last_location() {
            Some(last) => {
                tracing::info!("Restoring last location: {}", last.label());
                last
            }
            None => self.resolver.resolve_initial().await,
        };

        self.orchestrator.set_location(location.clone()).await;
        location
    }

    /// Make a searched or favorite city the active location.
    pub async fn select_city(&self, city: Location) -> bool {
        self.prefs.set_last_location(&city);
        self.orchestrator.set_location(city).await
    }

    pub async fn set_units(&self, units: UnitSystem) {
        self.prefs.set_preferred_units(units);
        self.orchestrator.change_units(units).await;
    }

    /// Flip between metric and imperial; returns the new system.
    pub async fn toggle_units(&self) -> UnitSystem {
        let units = self.orchestrator.units().toggled();
        self.set_units(units).await;
        units
    }

    pub fn toggle_favorite(&self, city: &Location) -> Vec<Location> {
        self.prefs.toggle_favorite(city)
    }

    pub fn favorites(&self) -> Vec<Location> {
        self.prefs.favorite_cities()
    }

    pub async fn refresh(&self) -> bool {
        self.orchestrator.refresh_weather().await
    }

    /// Re-read the device position and follow it. On failure the current
    /// location and weather stay as they are.
    pub async fn refresh_location(&self) -> Result<Location, LocationError> {
        let location = self.resolver.refresh_location().await?;
        self.orchestrator.set_location(location.clone()).await;
        Ok(location)
    }

    pub fn city_search(&self, config: &skycast_core::SearchConfig) -> CitySearch {
        CitySearch::new(self.orchestrator.client().clone(), config)
    }

    /// Backdrop for the current snapshot at the given local hour
    pub fn backdrop(&self, local_hour: u32) -> Option<Backdrop> {
        self.orchestrator
            .snapshot()
            .map(|snapshot| Backdrop::select(snapshot.condition(), local_hour))
    }
}
