use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skycast_core::{AppError, NetworkError, ReqwestErrorExt};
use std::fmt;
use std::str::FromStr;

/// Measurement convention used for requests and display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

impl UnitSystem {
    /// Value sent as the provider's `units` query parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Imperial => "imperial",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Self::Metric => Self::Imperial,
            Self::Imperial => Self::Metric,
        }
    }

    pub fn temperature_symbol(&self) -> &'static str {
        match self {
            Self::Metric => "C",
            Self::Imperial => "F",
        }
    }

    pub fn wind_speed_unit(&self) -> &'static str {
        match self {
            Self::Metric => "m/s",
            Self::Imperial => "mph",
        }
    }

    /// Rounded temperature with its unit, e.g. `21°C`
    pub fn format_temperature(&self, value: f64) -> String {
        format!("{}°{}", value.round(), self.temperature_symbol())
    }

    pub fn format_wind_speed(&self, value: f64) -> String {
        format!("{} {}", value.round(), self.wind_speed_unit())
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown unit system: {0}")]
pub struct ParseUnitSystemError(pub String);

impl FromStr for UnitSystem {
    type Err = ParseUnitSystemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "metric" => Ok(Self::Metric),
            "imperial" => Ok(Self::Imperial),
            other => Err(ParseUnitSystemError(other.to_string())),
        }
    }
}

/// Geographic location. Two locations are the same place when their
/// coordinates are exactly equal; name, country and accuracy are annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default)]
    pub accuracy: Option<f64>,
}

impl Location {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            name: None,
            country: None,
            accuracy: None,
        }
    }

    pub fn named(lat: f64, lon: f64, name: impl Into<String>, country: Option<String>) -> Self {
        Self {
            name: Some(name.into()),
            country,
            ..Self::new(lat, lon)
        }
    }

    pub fn with_accuracy(mut self, accuracy: Option<f64>) -> Self {
        self.accuracy = accuracy;
        self
    }

    pub fn coordinates(&self) -> (f64, f64) {
        (self.lat, self.lon)
    }

    pub fn same_place(&self, other: &Location) -> bool {
        self.lat == other.lat && self.lon == other.lon
    }

    /// Finite coordinates inside the latitude/longitude ranges
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    /// "Paris, FR", "Paris", or "Current Location" for unnamed fixes
    pub fn label(&self) -> String {
        match (&self.name, &self.country) {
            (Some(name), Some(country)) if !country.is_empty() => format!("{}, {}", name, country),
            (Some(name), _) => name.clone(),
            (None, _) => "Current Location".to_string(),
        }
    }
}

/// A device position fix
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
    pub accuracy: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl From<&Position> for Location {
    fn from(position: &Position) -> Self {
        Location::new(position.lat, position.lon).with_accuracy(position.accuracy)
    }
}

/// Condition categories keyed by the provider's `main` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    #[default]
    Clear,
    Clouds,
    Rain,
    Drizzle,
    Snow,
    Mist,
    Fog,
    Haze,
    Thunderstorm,
    Other,
}

impl WeatherCondition {
    pub fn from_main(main: &str) -> Self {
        match main.trim().to_ascii_lowercase().as_str() {
            "clear" => Self::Clear,
            "clouds" => Self::Clouds,
            "rain" => Self::Rain,
            "drizzle" => Self::Drizzle,
            "snow" => Self::Snow,
            "mist" => Self::Mist,
            "fog" => Self::Fog,
            "haze" => Self::Haze,
            "thunderstorm" => Self::Thunderstorm,
            _ => Self::Other,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::Clouds => "Cloudy",
            Self::Rain => "Rain",
            Self::Drizzle => "Drizzle",
            Self::Snow => "Snow",
            Self::Mist => "Mist",
            Self::Fog => "Fog",
            Self::Haze => "Haze",
            Self::Thunderstorm => "Thunderstorm",
            Self::Other => "Unsettled",
        }
    }

    pub fn icon_name(&self) -> &'static str {
        match self {
            Self::Clear => "sun",
            Self::Clouds => "cloud",
            Self::Rain | Self::Drizzle => "cloud_rain",
            Self::Snow => "cloud_snow",
            Self::Mist | Self::Fog | Self::Haze => "cloud_fog",
            Self::Thunderstorm => "cloud_lightning",
            Self::Other => "cloud_sun",
        }
    }
}

/// Background mood chosen from the current condition and local hour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backdrop {
    Clear,
    Cloudy,
    Rainy,
    Snowy,
    Mist,
    Night,
}

impl Backdrop {
    /// Night (before 06:00 or after 18:59) overrides the condition.
    pub fn select(condition: WeatherCondition, local_hour: u32) -> Self {
        if local_hour < 6 || local_hour > 18 {
            return Self::Night;
        }

        match condition {
            WeatherCondition::Clouds => Self::Cloudy,
            WeatherCondition::Rain | WeatherCondition::Drizzle => Self::Rainy,
            WeatherCondition::Snow => Self::Snowy,
            WeatherCondition::Mist | WeatherCondition::Fog | WeatherCondition::Haze => Self::Mist,
            _ => Self::Clear,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Cloudy => "cloudy",
            Self::Rainy => "rainy",
            Self::Snowy => "snowy",
            Self::Mist => "mist",
            Self::Night => "night",
        }
    }
}

/// One entry of a reading's `weather` array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ConditionTag {
    pub id: i64,
    pub main: String,
    pub description: String,
    pub icon: String,
}

fn primary_condition(tags: &[ConditionTag]) -> WeatherCondition {
    tags.first()
        .map(|tag| WeatherCondition::from_main(&tag.main))
        .unwrap_or_default()
}

/// Current conditions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CurrentReading {
    pub dt: i64,
    pub temp: f64,
    pub feels_like: f64,
    pub humidity: u8,
    pub pressure: f64,
    pub wind_speed: f64,
    pub visibility: Option<f64>,
    pub sunrise: Option<i64>,
    pub sunset: Option<i64>,
    pub weather: Vec<ConditionTag>,
}

impl CurrentReading {
    pub fn condition(&self) -> WeatherCondition {
        primary_condition(&self.weather)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HourlyReading {
    pub dt: i64,
    pub temp: f64,
    /// Probability of precipitation, 0..1
    pub pop: f64,
    pub weather: Vec<ConditionTag>,
}

impl HourlyReading {
    pub fn condition(&self) -> WeatherCondition {
        primary_condition(&self.weather)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DailyTemperature {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DailyReading {
    pub dt: i64,
    pub temp: DailyTemperature,
    pub pop: f64,
    pub weather: Vec<ConditionTag>,
}

impl DailyReading {
    pub fn condition(&self) -> WeatherCondition {
        primary_condition(&self.weather)
    }
}

/// Provider payload as of one fetch. Fields other than `current`, `hourly`
/// and `daily` are kept verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct WeatherSnapshot {
    #[serde(default)]
    pub current: Option<CurrentReading>,
    #[serde(default)]
    pub hourly: Vec<HourlyReading>,
    #[serde(default)]
    pub daily: Vec<DailyReading>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Layout of the `/weather` current-conditions endpoint
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FlatCurrent {
    dt: i64,
    main: FlatMain,
    wind: FlatWind,
    visibility: Option<f64>,
    sys: FlatSys,
    weather: Vec<ConditionTag>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FlatMain {
    temp: f64,
    feels_like: f64,
    humidity: u8,
    pressure: f64,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FlatWind {
    speed: f64,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FlatSys {
    sunrise: Option<i64>,
    sunset: Option<i64>,
}

impl WeatherSnapshot {
    /// Current conditions, reading either the `current` object or the flat
    /// `main`/`wind`/`sys` layout of the current-weather endpoint.
    pub fn current_conditions(&self) -> Option<CurrentReading> {
        if let Some(current) = &self.current {
            return Some(current.clone());
        }

        if !self.extra.contains_key("main") {
            return None;
        }

        let flat: FlatCurrent =
            serde_json::from_value(serde_json::Value::Object(self.extra.clone())).ok()?;
        Some(CurrentReading {
            dt: flat.dt,
            temp: flat.main.temp,
            feels_like: flat.main.feels_like,
            humidity: flat.main.humidity,
            pressure: flat.main.pressure,
            wind_speed: flat.wind.speed,
            visibility: flat.visibility,
            sunrise: flat.sys.sunrise,
            sunset: flat.sys.sunset,
            weather: flat.weather,
        })
    }

    /// Place name reported by the provider, if any
    pub fn place_name(&self) -> Option<&str> {
        self.extra
            .get("name")
            .and_then(|name| name.as_str())
            .filter(|name| !name.is_empty())
    }

    pub fn condition(&self) -> WeatherCondition {
        self.current_conditions()
            .map(|current| current.condition())
            .unwrap_or_default()
    }
}

/// Location service errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("User denied Geolocation")]
    PermissionDenied,
    #[error("Position unavailable")]
    Unavailable,
    #[error("Timeout expired")]
    Timeout,
    #[error("Geolocation is not supported on this platform")]
    Unsupported,
    #[error("Location error: {0}")]
    Other(String),
}

/// Weather provider errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Weather data fetch failed (HTTP {status})")]
    Fetch { status: u16 },
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<WeatherError> for AppError {
    fn from(e: WeatherError) -> Self {
        match e {
            WeatherError::Network(e) => AppError::Network(e.into_network_error()),
            WeatherError::Fetch { status } => AppError::Network(NetworkError::Status {
                code: status,
                detail: "weather request rejected".to_string(),
            }),
            WeatherError::Parse(msg) => AppError::Network(NetworkError::BadPayload(msg)),
        }
    }
}

impl From<LocationError> for AppError {
    fn from(e: LocationError) -> Self {
        AppError::Location(e.to_string())
    }
}
