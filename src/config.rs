// Service configuration: optional JSON file plus PORT / BASE_URL environment overrides

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::cache::CacheConfig;
use crate::health::DEFAULT_PROBE_CITY;
use crate::retry::RetryConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SupplierConfig {
    pub name: String,
    // Absolute URL, or a path joined onto `base_url`
    pub url: String,
}

impl SupplierConfig {
    pub fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
        }
    }

    pub fn resolve_url(&self, base_url: &str) -> String {
        if self.url.starts_with("http://") || self.url.starts_with("https://") {
            self.url.clone()
        } else {
            format!(
                "{}/{}",
                base_url.trim_end_matches('/'),
                self.url.trim_start_matches('/')
            )
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub listen_addr: String,
    pub base_url: String,
    // Configuration order decides equal-price tie-breaks
    pub suppliers: Vec<SupplierConfig>,
    pub fetch_timeout_ms: u64,
    pub probe_timeout_ms: u64,
    pub probe_city: String,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
    pub mock_suppliers: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".to_string(),
            base_url: "http://localhost:3000".to_string(),
            suppliers: vec![
                SupplierConfig::new("Supplier A", "/supplierA/hotels"),
                SupplierConfig::new("Supplier B", "/supplierB/hotels"),
            ],
            fetch_timeout_ms: 5000,
            probe_timeout_ms: 3000,
            probe_city: DEFAULT_PROBE_CITY.to_string(),
            retry: RetryConfig::default(),
            cache: CacheConfig::default(),
            mock_suppliers: true,
        }
    }
}

impl AppConfig {
    // Load from an optional JSON file, then apply environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        let config = config.with_env_overrides(
            std::env::var("PORT").ok(),
            std::env::var("BASE_URL").ok(),
        )?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn with_env_overrides(
        mut self,
        port: Option<String>,
        base_url: Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(port) = port.filter(|p| !p.is_empty()) {
            let port: u16 = port
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("PORT is not a valid port: {}", port)))?;
            let host = self
                .listen_addr
                .rsplit_once(':')
                .map(|(host, _)| host.to_string())
                .unwrap_or_else(|| "0.0.0.0".to_string());
            self.listen_addr = format!("{}:{}", host, port);
        }

        if let Some(base_url) = base_url.filter(|u| !u.is_empty()) {
            self.base_url = base_url;
        }

        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.suppliers.is_empty() {
            return Err(ConfigError::Invalid("at least one supplier is required".to_string()));
        }

        let mut names = HashSet::new();
        for supplier in &self.suppliers {
            if supplier.name.trim().is_empty() {
                return Err(ConfigError::Invalid("supplier name must not be empty".to_string()));
            }
            if !names.insert(supplier.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate supplier name: {}",
                    supplier.name
                )));
            }
        }

        if self.fetch_timeout_ms == 0 || self.probe_timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeouts must be greater than 0".to_string()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry.max_attempts must be at least 1".to_string()));
        }
        if self.retry.max_backoff_ms < self.retry.initial_backoff_ms {
            return Err(ConfigError::Invalid(
                "retry.max_backoff_ms must be >= retry.initial_backoff_ms".to_string(),
            ));
        }
        if self.cache.ttl_seconds == 0 {
            return Err(ConfigError::Invalid("cache.ttl_seconds must be greater than 0".to_string()));
        }

        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    // Outer bound on one supplier's fetch: every attempt at full timeout plus the
    // longest possible wait between attempts
    pub fn fetch_deadline(&self) -> Duration {
        let attempts = u64::from(self.retry.max_attempts.max(1));
        Duration::from_millis(
            self.fetch_timeout_ms * attempts + self.retry.max_backoff_ms * (attempts - 1),
        )
    }
}
