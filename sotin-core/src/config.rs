use std::collections::HashMap;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::SotinError;

pub const DEFAULT_ENDPOINT_URL: &str = "http://127.0.0.1:8000/chat";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SotinConfig {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub gateway: GatewaySettings,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_user_id")]
    pub user_id: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            user_id: default_user_id(),
        }
    }
}

/// Gateway section as it appears in `sotin.toml`.
#[derive(Debug, Deserialize, Clone)]
pub struct GatewaySettings {
    #[serde(default = "default_endpoint_url")]
    pub endpoint_url: String,
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
    /// Header name -> value, forwarded verbatim on every backend call.
    #[serde(default)]
    pub api_keys: HashMap<String, String>,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            endpoint_url: default_endpoint_url(),
            request_timeout_seconds: default_request_timeout_seconds(),
            api_keys: HashMap::new(),
        }
    }
}

/// Resolved configuration handed to `HttpGateway::new`.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub endpoint_url: String,
    pub request_timeout: Duration,
    pub api_keys: HashMap<String, String>,
}

impl GatewayConfig {
    pub fn new(endpoint_url: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            request_timeout,
            api_keys: HashMap::new(),
        }
    }
}

impl From<&GatewaySettings> for GatewayConfig {
    fn from(settings: &GatewaySettings) -> Self {
        Self {
            endpoint_url: settings.endpoint_url.clone(),
            request_timeout: Duration::from_secs(settings.request_timeout_seconds),
            api_keys: settings.api_keys.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExportConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub document: DocumentLayout,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            document: DocumentLayout::default(),
        }
    }
}

/// Page geometry for the PDF export, in PDF points.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct DocumentLayout {
    pub page_width: u32,
    pub page_height: u32,
    pub margin: u32,
    pub font_size: u32,
    pub line_height: u32,
    pub max_columns: usize,
}

impl Default for DocumentLayout {
    fn default() -> Self {
        // US Letter
        Self {
            page_width: 612,
            page_height: 792,
            margin: 40,
            font_size: 10,
            line_height: 14,
            max_columns: 88,
        }
    }
}

impl DocumentLayout {
    pub fn lines_per_page(&self) -> usize {
        let usable = self.page_height.saturating_sub(self.margin * 2);
        (usable / self.line_height.max(1)).max(1) as usize
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_user_id() -> String {
    "vk".to_string()
}

fn default_endpoint_url() -> String {
    DEFAULT_ENDPOINT_URL.to_string()
}

fn default_request_timeout_seconds() -> u64 {
    60
}

fn default_title() -> String {
    "SOTIN Chat Transcript".to_string()
}

impl SotinConfig {
    /// Load from an optional TOML file, then `SOTIN__SECTION__KEY` environment overrides.
    pub fn load(path: &str) -> Result<Self, SotinError> {
        let s = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("SOTIN")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(s.try_deserialize()?)
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig::from(&self.gateway)
    }
}
