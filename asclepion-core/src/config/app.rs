use super::error::ConfigError;
use std::path::Path;

/// Application configuration loaded from client.toml
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub model: String,
    pub response_modality: String,
    pub voice: Option<String>,
    pub system_instruction: Option<String>,
    pub enable_search: bool,
    pub live_endpoint: String,
    pub api_key: String,
    pub records_base_url: String,
    pub token_url: String,
}

impl AppConfig {
    /// Load configuration from a file path (or default path if None)
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        super::loader::load_config(path)
    }

    /// The live endpoint with the API key appended as a query parameter.
    pub fn live_url(&self) -> String {
        format!("{}?key={}", self.live_endpoint, self.api_key)
    }
}
