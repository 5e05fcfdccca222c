//! Runtime configuration for the map core.
//!
//! The hosted map/geocoding service key is never compiled in. Native shells
//! call [`GeoviewConfig::from_env`]; web and mobile shells build the config
//! themselves and hand it to the core with `Event::Configure`.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use url::Url;

pub const API_KEY_ENV: &str = "GEOVIEW_API_KEY";
pub const GEOCODING_URL_ENV: &str = "GEOVIEW_GEOCODING_URL";
pub const STYLE_URL_ENV: &str = "GEOVIEW_STYLE_URL";
pub const TILES_URL_ENV: &str = "GEOVIEW_TILES_URL";

pub const DEFAULT_GEOCODING_URL: &str = "https://api.maptiler.com/geocoding";
pub const DEFAULT_STYLE_URL: &str = "https://api.maptiler.com/maps/basic-v2/style.json";
pub const DEFAULT_TILES_URL: &str = "https://api.maptiler.com/tiles/v3/tiles.json";

const KEY_PARAM: &str = "key";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("API key cannot be empty")]
    EmptyApiKey,

    #[error("invalid URL for {setting}: {reason}")]
    InvalidUrl {
        setting: &'static str,
        reason: String,
    },
}

/// Service API key. Redacted in `Debug`, zeroized on drop by `secrecy`.
pub struct ApiKey(SecretString);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Result<Self, ConfigError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(ConfigError::EmptyApiKey);
        }
        Ok(Self(SecretString::new(key)))
    }

    pub(crate) fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Clone for ApiKey {
    fn clone(&self) -> Self {
        Self(SecretString::new(self.expose().to_owned()))
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

#[derive(Clone, Debug)]
pub struct GeoviewConfig {
    api_key: ApiKey,
    geocoding_base: Url,
    style_url: Url,
    tiles_url: Url,
}

impl GeoviewConfig {
    /// Config against the default hosted endpoints.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: ApiKey::new(api_key)?,
            geocoding_base: parse_service_url(GEOCODING_URL_ENV, DEFAULT_GEOCODING_URL)?,
            style_url: parse_service_url(STYLE_URL_ENV, DEFAULT_STYLE_URL)?,
            tiles_url: parse_service_url(TILES_URL_ENV, DEFAULT_TILES_URL)?,
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let key = std::env::var(API_KEY_ENV).map_err(|_| ConfigError::Missing(API_KEY_ENV))?;
        let mut config = Self::new(key)?;

        if let Ok(value) = std::env::var(GEOCODING_URL_ENV) {
            config.geocoding_base = parse_service_url(GEOCODING_URL_ENV, &value)?;
        }
        if let Ok(value) = std::env::var(STYLE_URL_ENV) {
            config.style_url = parse_service_url(STYLE_URL_ENV, &value)?;
        }
        if let Ok(value) = std::env::var(TILES_URL_ENV) {
            config.tiles_url = parse_service_url(TILES_URL_ENV, &value)?;
        }

        Ok(config)
    }

    pub fn with_geocoding_base(mut self, url: &str) -> Result<Self, ConfigError> {
        self.geocoding_base = parse_service_url(GEOCODING_URL_ENV, url)?;
        Ok(self)
    }

    pub fn with_style_url(mut self, url: &str) -> Result<Self, ConfigError> {
        self.style_url = parse_service_url(STYLE_URL_ENV, url)?;
        Ok(self)
    }

    pub fn with_tiles_url(mut self, url: &str) -> Result<Self, ConfigError> {
        self.tiles_url = parse_service_url(TILES_URL_ENV, url)?;
        Ok(self)
    }

    pub fn api_key(&self) -> &ApiKey {
        &self.api_key
    }

    pub fn geocoding_base(&self) -> &Url {
        &self.geocoding_base
    }

    /// Style document URL with the key attached.
    pub fn style_url(&self) -> Url {
        self.keyed(&self.style_url)
    }

    /// Vector tiles JSON URL with the key attached.
    pub fn tiles_url(&self) -> Url {
        self.keyed(&self.tiles_url)
    }

    fn keyed(&self, url: &Url) -> Url {
        let mut url = url.clone();
        url.query_pairs_mut()
            .append_pair(KEY_PARAM, self.api_key.expose());
        url
    }
}

fn parse_service_url(setting: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidUrl {
        setting,
        reason: e.to_string(),
    })?;

    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(ConfigError::InvalidUrl {
            setting,
            reason: format!("invalid scheme '{scheme}', only 'http' and 'https' are allowed"),
        });
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl {
            setting,
            reason: "URL must have a host".to_string(),
        });
    }

    if !url.username().is_empty() || url.password().is_some() {
        return Err(ConfigError::InvalidUrl {
            setting,
            reason: "credentials in URL are not allowed".to_string(),
        });
    }

    Ok(url)
}

// Shells send the raw form; validation runs on the way in.
#[derive(Deserialize)]
struct RawConfig {
    api_key: String,
    #[serde(default)]
    geocoding_base: Option<String>,
    #[serde(default)]
    style_url: Option<String>,
    #[serde(default)]
    tiles_url: Option<String>,
}

impl TryFrom<RawConfig> for GeoviewConfig {
    type Error = ConfigError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        let mut config = Self::new(raw.api_key)?;
        if let Some(url) = raw.geocoding_base {
            config = config.with_geocoding_base(&url)?;
        }
        if let Some(url) = raw.style_url {
            config = config.with_style_url(&url)?;
        }
        if let Some(url) = raw.tiles_url {
            config = config.with_tiles_url(&url)?;
        }
        Ok(config)
    }
}

impl<'de> Deserialize<'de> for GeoviewConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawConfig::deserialize(deserializer)?;
        Self::try_from(raw).map_err(serde::de::Error::custom)
    }
}
