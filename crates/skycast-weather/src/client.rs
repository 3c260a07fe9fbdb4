//! OpenWeatherMap-compatible weather and geocoding client.
//!
//! Every call is a single GET: no retries, no caching.

use reqwest::Client;
use serde::de::DeserializeOwned;
use skycast_core::WeatherConfig;
use tracing::instrument;

use crate::types::{Location, UnitSystem, WeatherError, WeatherSnapshot};

/// Maximum number of candidates returned by a city search
pub const SEARCH_LIMIT: usize = 5;

const USER_AGENT: &str = concat!("SkyCast/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: Client,
    api_key: String,
    base_url: String,
    geo_base_url: String,
}

impl WeatherClient {
    pub fn new(config: &WeatherConfig, api_key: Option<String>) -> Result<Self, WeatherError> {
        Self::with_base_urls(
            api_key.as_deref().unwrap_or_default(),
            &config.api_base_url,
            &config.geo_base_url,
        )
    }

    pub fn with_base_urls(
        api_key: &str,
        base_url: &str,
        geo_base_url: &str,
    ) -> Result<Self, WeatherError> {
        if api_key.is_empty() {
            tracing::warn!("No weather API key configured; requests will be rejected");
        }

        let client = Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            geo_base_url: geo_base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, WeatherError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .query(&[("appid", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::Fetch {
                status: status.as_u16(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| WeatherError::Parse(e.to_string()))
    }

    /// Weather at the given coordinates
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch_by_coordinates(
        &self,
        lat: f64,
        lon: f64,
        units: UnitSystem,
    ) -> Result<WeatherSnapshot, WeatherError> {
        let url = format!("{}/weather", self.base_url);
        let query = [
            ("lat", lat.to_string()),
            ("lon", lon.to_string()),
            ("units", units.as_str().to_string()),
        ];

        self.get_json(&url, &query).await.inspect_err(|e| {
            tracing::error!("Error fetching weather data: {}", e);
        })
    }

    /// Weather for a city looked up by name on the provider side
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch_by_city_name(
        &self,
        name: &str,
        units: UnitSystem,
    ) -> Result<WeatherSnapshot, WeatherError> {
        let url = format!("{}/weather", self.base_url);
        let query = [("q", name.to_string()), ("units", units.as_str().to_string())];

        self.get_json(&url, &query).await.inspect_err(|e| {
            tracing::error!("Error fetching city weather: {}", e);
        })
    }

    /// Up to five candidate locations for `query`. Never fails: any error
    /// is logged and yields no candidates.
    #[instrument(skip(self), level = "debug")]
    pub async fn search_cities(&self, query: &str) -> Vec<Location> {
        let url = format!("{}/direct", self.geo_base_url);
        let params = [("q", query.to_string()), ("limit", SEARCH_LIMIT.to_string())];

        match self.get_json::<Vec<Location>>(&url, &params).await {
            Ok(mut cities) => {
                cities.truncate(SEARCH_LIMIT);
                tracing::debug!("City search '{}' returned {} results", query, cities.len());
                cities
            }
            Err(e) => {
                tracing::warn!("Error searching cities: {}", e);
                Vec::new()
            }
        }
    }
}
