//! # Config — Counter Endpoint Configuration
//!
//! Where hits are sent: the CORS relay, the counting service base URL, the
//! namespace that scopes every counter key, and the `Origin` header the relay
//! forwards. Defaults reproduce the values the site has always used, so a bare
//! `CounterConfig::default()` talks to the same counters as the live pages.
//!
//! ## Layering
//!
//! Lowest to highest precedence:
//!
//! 1. [`CounterConfig::default`]
//! 2. TOML file: an explicit path, else `~/.pagehits/config.toml` if present
//! 3. [`ConfigOverrides`] (CLI flags and `PAGEHITS_*` environment variables)
//!
//! ```toml
//! relay_url = "https://api.cors.lol"
//! api_base = "https://api.counterapi.dev/v1"
//! namespace = "cgl_web_demos"
//! origin = "jaysmito101.github.io"
//! timeout_secs = 10
//! ```

use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_RELAY_URL: &str = "https://api.cors.lol";
pub const DEFAULT_API_BASE: &str = "https://api.counterapi.dev/v1";
pub const DEFAULT_NAMESPACE: &str = "cgl_web_demos";
pub const DEFAULT_ORIGIN: &str = "jaysmito101.github.io";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Counter endpoint settings. Every field may be omitted from a config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CounterConfig {
    /// CORS relay base URL. `None` calls the counting service directly.
    pub relay_url: Option<String>,
    pub api_base: String,
    pub namespace: String,
    pub origin: String,
    /// Per-request timeout. Unset means no timeout.
    pub timeout_secs: Option<u64>,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            relay_url: Some(DEFAULT_RELAY_URL.to_string()),
            api_base: DEFAULT_API_BASE.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            origin: DEFAULT_ORIGIN.to_string(),
            timeout_secs: None,
        }
    }
}

/// Values that win over the config file, usually from CLI flags or env vars.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub relay_url: Option<String>,
    pub no_relay: bool,
    pub api_base: Option<String>,
    pub namespace: Option<String>,
    pub origin: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl CounterConfig {
    /// Parse a TOML document on top of the defaults. Values are not validated
    /// here: overrides may still replace them, so [`CounterConfig::resolve`]
    /// validates the final result.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: CounterConfig = toml::from_str(content)?;
        // An empty relay in a file means "no relay".
        if config.relay_url.as_deref() == Some("") {
            config.relay_url = None;
        }
        Ok(config)
    }

    /// Load a config file without validating it.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Resolve the effective config: explicit file, else the per-user file if it
    /// exists, else defaults; then apply overrides and validate.
    pub fn resolve(
        path: Option<&Path>,
        overrides: &ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::load(p)?,
            None => match default_config_path() {
                Some(p) if p.is_file() => Self::load(&p)?,
                _ => Self::default(),
            },
        };
        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        if let Some(relay) = &overrides.relay_url {
            self.relay_url = Some(relay.clone()).filter(|r| !r.is_empty());
        }
        if overrides.no_relay {
            self.relay_url = None;
        }
        if let Some(base) = &overrides.api_base {
            self.api_base = base.clone();
        }
        if let Some(ns) = &overrides.namespace {
            self.namespace = ns.clone();
        }
        if let Some(origin) = &overrides.origin {
            self.origin = origin.clone();
        }
        if overrides.timeout_secs.is_some() {
            self.timeout_secs = overrides.timeout_secs;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // Both URLs get path or query text appended, so neither may end in a
        // query or fragment.
        validate_base_url("api_base", &self.api_base)?;
        if let Some(relay) = &self.relay_url {
            validate_base_url("relay_url", relay)?;
        }
        if self.namespace.is_empty() {
            return Err(ConfigError::Validation("namespace must not be empty".into()));
        }
        if self
            .namespace
            .chars()
            .any(|c| matches!(c, '/' | '?' | '#') || c.is_whitespace())
        {
            return Err(ConfigError::Validation(format!(
                "namespace must be a single path segment: {:?}",
                self.namespace
            )));
        }
        self.origin_header()?;
        if self.timeout_secs == Some(0) {
            return Err(ConfigError::Validation(
                "timeout_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// The `Origin` request header value.
    pub fn origin_header(&self) -> Result<HeaderValue, ConfigError> {
        HeaderValue::from_str(&self.origin).map_err(|_| {
            ConfigError::Validation(format!(
                "origin is not a valid header value: {:?}",
                self.origin
            ))
        })
    }

    /// Render as TOML that [`CounterConfig::from_toml_str`] reads back unchanged.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        let mut out = self.clone();
        if out.relay_url.is_none() {
            out.relay_url = Some(String::new());
        }
        toml::to_string_pretty(&out)
    }
}

fn validate_base_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(value).map_err(|e| {
        ConfigError::Validation(format!("{} is not a valid URL ({}): {}", field, e, value))
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::Validation(format!(
            "{} must use http or https, got {}",
            field,
            parsed.scheme()
        )));
    }
    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(ConfigError::Validation(format!(
            "{} must not carry a query string or fragment: {}",
            field, value
        )));
    }
    Ok(())
}

/// `~/.pagehits/config.toml`, or `None` when no home directory is known.
pub fn default_config_path() -> Option<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .ok()?;
    Some(PathBuf::from(home).join(".pagehits").join("config.toml"))
}
