//! Weather service for SkyCast
//!
//! Provides OpenWeatherMap data for the device location or a searched city,
//! with unit switching and persistent favorites.

pub mod client;
pub mod dashboard;
pub mod location;
pub mod orchestrator;
pub mod preferences;
pub mod resolver;
pub mod search;
pub mod store;
pub mod types;

pub use client::WeatherClient;
pub use dashboard::Dashboard;
pub use location::{platform_source, PositionOptions, PositionSource};
pub use orchestrator::WeatherOrchestrator;
pub use preferences::PreferencesStore;
pub use resolver::{GeolocationResolver, ResolverState, ResolverStatus};
pub use search::{CitySearch, SearchState};
pub use store::{KeyValueStore, MemoryStore, SqliteStore};
pub use types::*;
