use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use url::Url;

use crate::workflows::nearby::bbox::DEFAULT_MARGIN;
use crate::workflows::nearby::domain::{CategoryParseError, CategorySet};

pub const DEFAULT_BASE_URL: &str = "https://api.mapbox.com/geocoding/v5/mapbox.places";
/// `key:query:marker` form of [`CategorySet::standard`].
pub const DEFAULT_CATEGORIES: &str = "restaurants:restaurant:restaurant,religious:temple:religious";
pub const DEFAULT_SEARCH_LIMIT: usize = 50;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub provider: ProviderConfig,
    pub search: SearchSettings,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            provider: ProviderConfig::from_env()?,
            search: SearchSettings::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Connection details for the geocoding/place-search provider.
///
/// Handed to the clients at construction time; nothing reads the token from
/// the environment after [`AppConfig::load`].
#[derive(Clone)]
pub struct ProviderConfig {
    pub base_url: Url,
    pub access_token: String,
    pub timeout: Duration,
}

impl ProviderConfig {
    pub fn new(base_url: Url, access_token: impl Into<String>) -> Self {
        Self {
            base_url,
            access_token: access_token.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    fn from_env() -> Result<Self, ConfigError> {
        let access_token = env::var("MAPBOX_ACCESS_TOKEN")
            .ok()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
            .ok_or(ConfigError::MissingAccessToken)?;

        let raw_base = env::var("MAPBOX_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let base_url = Url::parse(raw_base.trim()).map_err(|source| ConfigError::InvalidBaseUrl {
            value: raw_base.clone(),
            source,
        })?;

        let timeout_secs = match env::var("MAPBOX_TIMEOUT_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidNumber {
                    variable: "MAPBOX_TIMEOUT_SECS",
                    value: raw,
                })?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            base_url,
            access_token,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url.as_str())
            .field("access_token", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Knobs for a single orchestrator run.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSettings {
    pub categories: CategorySet,
    pub margin: f64,
    pub limit: usize,
    /// Number of records processed at once. `1` keeps the batch strictly sequential.
    pub concurrency: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            categories: CategorySet::standard(),
            margin: DEFAULT_MARGIN,
            limit: DEFAULT_SEARCH_LIMIT,
            concurrency: 1,
        }
    }
}

impl SearchSettings {
    pub fn with_categories(categories: CategorySet) -> Self {
        Self {
            categories,
            ..Self::default()
        }
    }

    fn from_env() -> Result<Self, ConfigError> {
        let categories = match env::var("NEARBY_CATEGORIES") {
            Ok(raw) => CategorySet::parse(&raw)
                .map_err(|source| ConfigError::InvalidCategories { source })?,
            Err(_) => CategorySet::standard(),
        };

        let margin = match env::var("NEARBY_MARGIN") {
            Ok(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|margin| margin.is_finite() && *margin > 0.0)
                .ok_or(ConfigError::InvalidNumber {
                    variable: "NEARBY_MARGIN",
                    value: raw,
                })?,
            Err(_) => DEFAULT_MARGIN,
        };

        Ok(Self {
            categories,
            margin,
            limit: positive_usize("NEARBY_LIMIT", DEFAULT_SEARCH_LIMIT)?,
            concurrency: positive_usize("NEARBY_CONCURRENCY", 1)?,
        })
    }
}

fn positive_usize(variable: &'static str, default: usize) -> Result<usize, ConfigError> {
    match env::var(variable) {
        Ok(raw) => raw
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|value| *value > 0)
            .ok_or(ConfigError::InvalidNumber {
                variable,
                value: raw,
            }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost {
        source: std::net::AddrParseError,
    },
    MissingAccessToken,
    InvalidBaseUrl {
        value: String,
        source: url::ParseError,
    },
    InvalidCategories {
        source: CategoryParseError,
    },
    InvalidNumber {
        variable: &'static str,
        value: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::MissingAccessToken => {
                write!(f, "MAPBOX_ACCESS_TOKEN must be set to a non-empty token")
            }
            ConfigError::InvalidBaseUrl { value, .. } => {
                write!(f, "MAPBOX_BASE_URL '{}' is not a valid URL", value)
            }
            ConfigError::InvalidCategories { source } => {
                write!(f, "NEARBY_CATEGORIES is invalid: {}", source)
            }
            ConfigError::InvalidNumber { variable, value } => {
                write!(f, "{} must be a positive number, got '{}'", variable, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidBaseUrl { source, .. } => Some(source),
            ConfigError::InvalidCategories { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::MissingAccessToken
            | ConfigError::InvalidNumber { .. } => None,
        }
    }
}
