//! Error types shared by the SkyCast crates.
//!
//! Each family keeps the underlying detail for logs and offers
//! `user_message()` for text shown to the user.

use rusqlite::ErrorCode;
use thiserror::Error;

/// Any failure that can reach the user.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("weather service: {0}")]
    Network(#[from] NetworkError),

    #[error("preferences: {0}")]
    Storage(#[from] StorageError),

    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("location: {0}")]
    Location(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Network(e) => e.user_message(),
            AppError::Storage(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::Location(_) => "Your location could not be determined.",
            AppError::Other(_) => "Something went wrong. Please try again.",
        }
    }
}

/// Failures talking to the weather provider.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("unreachable: {0}")]
    Unreachable(String),

    #[error("timed out")]
    TimedOut,

    #[error("HTTP {code}: {detail}")]
    Status { code: u16, detail: String },

    #[error("unreadable payload: {0}")]
    BadPayload(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::Unreachable(_) => {
                "Could not reach the weather service. Check your connection."
            }
            NetworkError::TimedOut => "The weather service took too long to answer.",
            NetworkError::Status { code: 401, .. } => {
                "Weather API key is missing or invalid. Set SKYCAST_API_KEY."
            }
            NetworkError::Status { code: 404, .. } => "No weather found for that place.",
            NetworkError::Status { code: 429, .. } => {
                "Too many requests to the weather service. Try again shortly."
            }
            NetworkError::Status { code, .. } if *code >= 500 => {
                "The weather service is having problems. Try again later."
            }
            NetworkError::Status { .. } => "Failed to fetch weather data.",
            NetworkError::BadPayload(_) => "The weather service sent data SkyCast could not read.",
        }
    }
}

/// Local preference storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("query failed: {0}")]
    QueryFailed(String),

    #[error("corrupt data: {0}")]
    Corruption(String),
}

impl StorageError {
    pub fn user_message(&self) -> &'static str {
        match self {
            StorageError::Unavailable(_) => "Preferences could not be saved.",
            StorageError::QueryFailed(_) => "A preferences operation failed.",
            StorageError::Corruption(_) => "Saved preferences were unreadable and have been ignored.",
        }
    }
}

/// Problems with the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot access {path}: {reason}")]
    Unreadable { path: String, reason: String },

    #[error("malformed TOML: {0}")]
    Malformed(String),

    #[error("invalid settings: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Unreadable { .. } => "The configuration file could not be read or written.",
            ConfigError::Malformed(_) => "The configuration file is not valid TOML.",
            ConfigError::Invalid(_) => "The configuration has invalid settings. Check config.toml.",
        }
    }
}

/// Classifies a reqwest failure.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            return NetworkError::TimedOut;
        }
        if self.is_decode() || self.is_body() {
            return NetworkError::BadPayload(self.to_string());
        }
        match self.status() {
            Some(status) => NetworkError::Status {
                code: status.as_u16(),
                detail: self.to_string(),
            },
            None => NetworkError::Unreachable(self.to_string()),
        }
    }
}

/// Classifies a SQLite failure by its result code.
pub trait RusqliteErrorExt {
    fn into_storage_error(self) -> StorageError;
}

impl RusqliteErrorExt for rusqlite::Error {
    fn into_storage_error(self) -> StorageError {
        match self.sqlite_error_code() {
            Some(ErrorCode::DatabaseCorrupt | ErrorCode::NotADatabase) => {
                StorageError::Corruption(self.to_string())
            }
            Some(
                ErrorCode::CannotOpen
                | ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::ReadOnly
                | ErrorCode::DiskFull
                | ErrorCode::PermissionDenied,
            ) => StorageError::Unavailable(self.to_string()),
            _ => StorageError::QueryFailed(self.to_string()),
        }
    }
}
