//! Layered configuration.
//!
//! Loads configuration from, in increasing precedence:
//! 1. Default values
//! 2. User-level config: ~/.brickscan/brickscan.toml
//! 3. Project-level config: ./.brickscan/brickscan.toml
//! 4. An explicit file (TOML, YAML or JSON, picked by extension)
//! 5. `BRICKSCAN_*` environment variables
//!
//! Command-line flags are applied on top by the caller as one more
//! [`ConfigLayer`].

use crate::client::ClientConfig;
use crate::error::{BrickscanError, Result};
use crate::models::Condition;
use crate::recognition::RecognitionEndpoint;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_API_BASE: &str = "http://localhost:3001";
pub const DEFAULT_RECOGNITION_FIELD: &str = "image";
pub const DEFAULT_FALLBACK_FIELD: &str = "query_image";

const ENV_PREFIX: &str = "BRICKSCAN_";

/// One recognition endpoint. A missing URL means "use the default" for the
/// primary endpoint and "disabled" for the fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSettings {
    pub url: Option<String>,
    pub field: String,
}

/// Effective configuration for a scan session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Price-guide backend, also hosting `/recognize` unless overridden.
    pub api_base: String,

    /// Initial price condition.
    pub condition: Condition,

    /// Request timeout in seconds; unset keeps the transport default.
    pub timeout_secs: Option<u64>,

    pub user_agent: String,

    pub recognition: EndpointSettings,

    pub fallback: EndpointSettings,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            condition: Condition::default(),
            timeout_secs: None,
            user_agent: format!("brickscan/{}", env!("CARGO_PKG_VERSION")),
            recognition: EndpointSettings {
                url: None,
                field: DEFAULT_RECOGNITION_FIELD.to_string(),
            },
            fallback: EndpointSettings {
                url: None,
                field: DEFAULT_FALLBACK_FIELD.to_string(),
            },
        }
    }
}

impl ScanConfig {
    /// Overlay every value set in `layer`.
    pub fn apply(&mut self, layer: ConfigLayer) {
        if let Some(api_base) = layer.api_base {
            self.api_base = api_base;
        }
        if let Some(condition) = layer.condition {
            self.condition = condition;
        }
        if let Some(timeout) = layer.timeout_secs {
            self.timeout_secs = Some(timeout);
        }
        if let Some(user_agent) = layer.user_agent {
            self.user_agent = user_agent;
        }
        if let Some(endpoint) = layer.recognition {
            endpoint.apply_to(&mut self.recognition);
        }
        if let Some(endpoint) = layer.fallback {
            endpoint.apply_to(&mut self.fallback);
        }
    }

    /// Check URLs and field names before any request is made.
    pub fn validate(&self) -> Result<()> {
        validate_url("api_base", &self.api_base)?;

        if let Some(url) = &self.recognition.url {
            validate_url("recognition.url", url)?;
        }
        if let Some(url) = &self.fallback.url {
            validate_url("fallback.url", url)?;
        }
        if self.recognition.field.trim().is_empty() {
            return Err(BrickscanError::Config("recognition.field is empty".to_string()));
        }
        if self.fallback.field.trim().is_empty() {
            return Err(BrickscanError::Config("fallback.field is empty".to_string()));
        }

        Ok(())
    }

    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new().with_user_agent(self.user_agent.clone());
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        config
    }

    pub fn recognition_endpoint(&self) -> RecognitionEndpoint {
        let url = self.recognition.url.clone().unwrap_or_else(|| {
            format!("{}/recognize", self.api_base.trim_end_matches('/'))
        });
        RecognitionEndpoint::new(url, self.recognition.field.clone())
    }

    pub fn fallback_endpoint(&self) -> Option<RecognitionEndpoint> {
        self.fallback
            .url
            .as_ref()
            .map(|url| RecognitionEndpoint::new(url.clone(), self.fallback.field.clone()))
    }
}

fn validate_url(key: &str, value: &str) -> Result<()> {
    let url = reqwest::Url::parse(value)
        .map_err(|e| BrickscanError::Config(format!("{} '{}' is not a URL: {}", key, value, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(BrickscanError::Config(format!(
            "{} must use http or https, got '{}'",
            key, other
        ))),
    }
}

/// Partial endpoint settings from one source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointLayer {
    pub url: Option<String>,
    pub field: Option<String>,
}

impl EndpointLayer {
    fn apply_to(self, settings: &mut EndpointSettings) {
        if let Some(url) = self.url {
            settings.url = Some(url);
        }
        if let Some(field) = self.field {
            settings.field = field;
        }
    }

    fn is_empty(&self) -> bool {
        self.url.is_none() && self.field.is_none()
    }
}

/// Configuration values from one source; unset fields leave lower layers alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigLayer {
    pub api_base: Option<String>,
    pub condition: Option<Condition>,
    pub timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
    pub recognition: Option<EndpointLayer>,
    pub fallback: Option<EndpointLayer>,
}

impl ConfigLayer {
    /// Read `BRICKSCAN_*` variables from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a layer from any key lookup (the environment, in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |name: &str| {
            lookup(&format!("{}{}", ENV_PREFIX, name)).filter(|v| !v.trim().is_empty())
        };

        let condition = get("CONDITION")
            .map(|v| {
                v.parse::<Condition>()
                    .map_err(|e| BrickscanError::Config(format!("BRICKSCAN_CONDITION: {}", e)))
            })
            .transpose()?;

        let timeout_secs = get("TIMEOUT_SECS")
            .map(|v| {
                v.trim().parse::<u64>().map_err(|e| {
                    BrickscanError::Config(format!("BRICKSCAN_TIMEOUT_SECS '{}': {}", v, e))
                })
            })
            .transpose()?;

        let recognition = EndpointLayer {
            url: get("RECOGNITION_URL"),
            field: get("RECOGNITION_FIELD"),
        };
        let fallback = EndpointLayer {
            url: get("FALLBACK_URL"),
            field: get("FALLBACK_FIELD"),
        };

        Ok(Self {
            api_base: get("API_BASE"),
            condition,
            timeout_secs,
            user_agent: get("USER_AGENT"),
            recognition: Some(recognition).filter(|e| !e.is_empty()),
            fallback: Some(fallback).filter(|e| !e.is_empty()),
        })
    }
}

/// Load a layer from a file, picking the format from its extension.
pub async fn load_layer_file(path: impl AsRef<Path>) -> Result<ConfigLayer> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .ok_or_else(|| {
            BrickscanError::Config(format!("Unable to determine file extension for {:?}", path))
        })?;

    let content = tokio::fs::read_to_string(path).await?;
    let parse_err = |e: String| {
        BrickscanError::Config(format!("Failed to parse config from {:?}: {}", path, e))
    };

    match extension.as_str() {
        "toml" => toml::from_str(&content).map_err(|e| parse_err(e.to_string())),
        "yaml" | "yml" => serde_yaml::from_str(&content).map_err(|e| parse_err(e.to_string())),
        "json" => serde_json::from_str(&content).map_err(|e| parse_err(e.to_string())),
        other => Err(BrickscanError::Config(format!(
            "Unsupported config file extension: {}",
            other
        ))),
    }
}

/// Resolves the configuration layers in order.
pub struct ConfigLoader {
    user_path: Option<PathBuf>,
    project_path: Option<PathBuf>,
    explicit_path: Option<PathBuf>,
    read_env: bool,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            user_path: dirs::home_dir().map(|home| home.join(".brickscan").join("brickscan.toml")),
            project_path: std::env::current_dir()
                .ok()
                .map(|cwd| cwd.join(".brickscan").join("brickscan.toml")),
            explicit_path: None,
            read_env: true,
        }
    }

    /// Loader that reads only what is explicitly configured on it.
    pub fn isolated() -> Self {
        Self {
            user_path: None,
            project_path: None,
            explicit_path: None,
            read_env: false,
        }
    }

    pub fn with_user_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.user_path = Some(path.into());
        self
    }

    pub fn with_project_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.project_path = Some(path.into());
        self
    }

    /// A file that must exist.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit_path = Some(path.into());
        self
    }

    pub fn with_env(mut self, read_env: bool) -> Self {
        self.read_env = read_env;
        self
    }

    pub async fn load(&self) -> Result<ScanConfig> {
        let mut config = ScanConfig::default();

        for path in [&self.user_path, &self.project_path].into_iter().flatten() {
            if !tokio::fs::try_exists(path).await.unwrap_or(false) {
                debug!(path = %path.display(), "Config file not found, skipping");
                continue;
            }
            config.apply(load_layer_file(path).await?);
            debug!(path = %path.display(), "Loaded config file");
        }

        if let Some(path) = &self.explicit_path {
            config.apply(load_layer_file(path).await?);
            info!(path = %path.display(), "Loaded config file");
        }

        if self.read_env {
            config.apply(ConfigLayer::from_env()?);
        }

        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ScanConfig::default();
        assert_eq!(config.api_base, "http://localhost:3001");
        assert_eq!(config.condition, Condition::New);
        assert!(config.timeout_secs.is_none());
        assert!(config.user_agent.starts_with("brickscan/"));
        assert_eq!(
            config.recognition_endpoint(),
            RecognitionEndpoint::new("http://localhost:3001/recognize", "image")
        );
        assert!(config.fallback_endpoint().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_recognition_url_follows_api_base() {
        let mut config = ScanConfig::default();
        config.apply(ConfigLayer {
            api_base: Some("https://bricks.example.com/".to_string()),
            ..Default::default()
        });
        assert_eq!(
            config.recognition_endpoint().url,
            "https://bricks.example.com/recognize"
        );
    }

    #[test]
    fn test_partial_endpoint_layer_keeps_field() {
        let mut config = ScanConfig::default();
        config.apply(ConfigLayer {
            fallback: Some(EndpointLayer {
                url: Some("https://api.brickognize.com/predict/".to_string()),
                field: None,
            }),
            ..Default::default()
        });

        let fallback = config.fallback_endpoint().unwrap();
        assert_eq!(fallback.url, "https://api.brickognize.com/predict/");
        assert_eq!(fallback.field, "query_image");
    }

    #[test]
    fn test_env_layer() {
        let layer = ConfigLayer::from_lookup(lookup(&[
            ("BRICKSCAN_API_BASE", "http://prices:8080"),
            ("BRICKSCAN_CONDITION", "used"),
            ("BRICKSCAN_TIMEOUT_SECS", "20"),
            ("BRICKSCAN_FALLBACK_URL", "https://legacy.example/predict"),
        ]))
        .unwrap();

        assert_eq!(layer.api_base.as_deref(), Some("http://prices:8080"));
        assert_eq!(layer.condition, Some(Condition::Used));
        assert_eq!(layer.timeout_secs, Some(20));
        assert!(layer.recognition.is_none());
        assert_eq!(
            layer.fallback.and_then(|f| f.url).as_deref(),
            Some("https://legacy.example/predict")
        );
    }

    #[test]
    fn test_env_layer_ignores_blank_values() {
        let layer = ConfigLayer::from_lookup(lookup(&[("BRICKSCAN_API_BASE", "  ")])).unwrap();
        assert!(layer.api_base.is_none());
    }

    #[test]
    fn test_env_layer_invalid_values() {
        let result = ConfigLayer::from_lookup(lookup(&[("BRICKSCAN_TIMEOUT_SECS", "soon")]));
        assert!(matches!(result, Err(BrickscanError::Config(_))));

        let result = ConfigLayer::from_lookup(lookup(&[("BRICKSCAN_CONDITION", "mint")]));
        assert!(matches!(result, Err(BrickscanError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_urls() {
        let mut config = ScanConfig::default();
        config.api_base = "localhost:3001".to_string();
        assert!(config.validate().is_err());

        let mut config = ScanConfig::default();
        config.fallback.url = Some("ftp://legacy.example".to_string());
        assert!(config.validate().is_err());

        let mut config = ScanConfig::default();
        config.recognition.field = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_client_config_timeout() {
        let mut config = ScanConfig::default();
        assert!(config.client_config().timeout.is_none());

        config.timeout_secs = Some(5);
        assert_eq!(config.client_config().timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_toml_roundtrip_of_effective_config() {
        let mut config = ScanConfig::default();
        config.fallback.url = Some("https://legacy.example/predict".to_string());

        let text = toml::to_string(&config).unwrap();
        let parsed: ScanConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
