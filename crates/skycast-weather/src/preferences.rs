//! Favorites, unit preference and last viewed location.
//!
//! Reads never fail: a missing, unreadable or corrupt value yields the
//! default (no favorites, metric, no last location). Writes are best-effort
//! and only log on failure.

use std::sync::Arc;

use crate::store::KeyValueStore;
use crate::types::{Location, UnitSystem};

pub const FAVORITES_KEY: &str = "skycast-favorites";
pub const UNITS_KEY: &str = "skycast-units";
pub const LAST_LOCATION_KEY: &str = "skycast-last-location";

/// Shared handle to the preferences; clones see the same store.
#[derive(Clone)]
pub struct PreferencesStore {
    store: Arc<dyn KeyValueStore>,
}

impl PreferencesStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Error reading preference {}: {}", key, e);
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) -> bool {
        match self.store.set(key, value) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Error saving preference {}: {}", key, e);
                false
            }
        }
    }

    pub fn favorite_cities(&self) -> Vec<Location> {
        let Some(raw) = self.read(FAVORITES_KEY) else {
            return Vec::new();
        };

        match serde_json::from_str(&raw) {
            Ok(favorites) => favorites,
            Err(e) => {
                tracing::warn!("Error loading favorite cities: {}", e);
                Vec::new()
            }
        }
    }

    fn write_favorites(&self, favorites: &[Location]) -> bool {
        match serde_json::to_string(favorites) {
            Ok(json) => self.write(FAVORITES_KEY, &json),
            Err(e) => {
                tracing::warn!("Error serializing favorite cities: {}", e);
                false
            }
        }
    }

    /// Append `city` unless a favorite with the same coordinates exists.
    /// Returns the list as stored afterwards.
    pub fn save_favorite_city(&self, city: &Location) -> Vec<Location> {
        let mut favorites = self.favorite_cities();
        if !city.is_valid() {
            tracing::warn!(
                "Not saving favorite with invalid coordinates: {}, {}",
                city.lat,
                city.lon
            );
            return favorites;
        }
        if favorites.iter().any(|fav| fav.same_place(city)) {
            return favorites;
        }

        favorites.push(city.clone());
        if self.write_favorites(&favorites) {
            tracing::info!("Added favorite city: {}", city.label());
            favorites
        } else {
            self.favorite_cities()
        }
    }

    /// Drop every favorite at the coordinates of `city`.
    /// Returns the list as stored afterwards.
    pub fn remove_favorite_city(&self, city: &Location) -> Vec<Location> {
        let favorites: Vec<Location> = self
            .favorite_cities()
            .into_iter()
            .filter(|fav| !fav.same_place(city))
            .collect();

        if self.write_favorites(&favorites) {
            favorites
        } else {
            self.favorite_cities()
        }
    }

    pub fn is_favorite(&self, city: &Location) -> bool {
        self.favorite_cities().iter().any(|fav| fav.same_place(city))
    }

    pub fn toggle_favorite(&self, city: &Location) -> Vec<Location> {
        if self.is_favorite(city) {
            self.remove_favorite_city(city)
        } else {
            self.save_favorite_city(city)
        }
    }

    pub fn preferred_units(&self) -> UnitSystem {
        self.read(UNITS_KEY)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default()
    }

    pub fn set_preferred_units(&self, units: UnitSystem) {
        self.write(UNITS_KEY, units.as_str());
    }

    pub fn last_location(&self) -> Option<Location> {
        let raw = self.read(LAST_LOCATION_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(location) => location,
            Err(e) => {
                tracing::warn!("Error loading last location: {}", e);
                None
            }
        }
    }

    pub fn set_last_location(&self, location: &Location) {
        if !location.is_valid() {
            tracing::warn!(
                "Not saving last location with invalid coordinates: {}, {}",
                location.lat,
                location.lon
            );
            return;
        }
        match serde_json::to_string(location) {
            Ok(json) => {
                self.write(LAST_LOCATION_KEY, &json);
            }
            Err(e) => tracing::warn!("Error serializing last location: {}", e),
        }
    }
}
