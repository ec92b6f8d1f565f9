use super::CONFIG_PATH;
use super::error::ConfigError;
use crate::constants::{API_KEY_ENV, DEFAULT_LIVE_ENDPOINT, DEFAULT_RESPONSE_MODALITY, DEFAULT_VOICE};
use dotenvy::from_filename;
use serde::Deserialize;
use std::sync::Once;
use std::path::Path;
use std::{env, fs, io};
use tracing::debug;

static ENV_LOADER: Once = Once::new();

/// Raw configuration structure for deserialization from TOML
#[derive(Debug, Deserialize, Default)]
pub(super) struct RawConfig {
    #[serde(default)]
    pub live: RawLive,
    #[serde(default)]
    pub records: RawRecords,
}

#[derive(Debug, Deserialize, Default)]
pub(super) struct RawLive {
    pub model: Option<String>,
    pub response_modality: Option<String>,
    pub voice: Option<String>,
    pub system_instruction: Option<String>,
    #[serde(default)]
    pub enable_search: bool,
    pub endpoint: Option<String>,
    pub api_key_env: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub(super) struct RawRecords {
    pub base_url: Option<String>,
    pub token_url: Option<String>,
}

/// Ensures environment variables are loaded from config/.env
pub fn ensure_env_loaded() {
    ENV_LOADER.call_once(|| {
        let _ = from_filename("config/.env");
    });
}

/// Load and validate configuration from a file path
pub fn load_config(path: Option<&Path>) -> Result<super::AppConfig, ConfigError> {
    ensure_env_loaded();
    let config_path = path.unwrap_or_else(|| Path::new(CONFIG_PATH));
    read_config(config_path)
}

fn read_config(path: &Path) -> Result<super::AppConfig, ConfigError> {
    debug!(path = %path.display(), "Reading client configuration file");

    let content = fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ConfigError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let parsed: RawConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    validate_and_build(parsed)
}

fn validate_and_build(parsed: RawConfig) -> Result<super::AppConfig, ConfigError> {
    let model = parsed.live.model.ok_or(ConfigError::MissingModel)?;
    let records_base_url = parsed
        .records
        .base_url
        .ok_or(ConfigError::MissingRecordsBaseUrl)?;
    let token_url = parsed.records.token_url.ok_or(ConfigError::MissingTokenUrl)?;

    let env_var = parsed
        .live
        .api_key_env
        .unwrap_or_else(|| API_KEY_ENV.to_string());
    let api_key = env::var(&env_var).map_err(|_| ConfigError::MissingApiKey {
        env_var: env_var.clone(),
    })?;

    let response_modality = parsed
        .live
        .response_modality
        .unwrap_or_else(|| DEFAULT_RESPONSE_MODALITY.to_string());
    // Audio sessions always get a voice; other modalities only if configured.
    let voice = parsed.live.voice.or_else(|| {
        (response_modality == DEFAULT_RESPONSE_MODALITY).then(|| DEFAULT_VOICE.to_string())
    });

    Ok(super::AppConfig {
        model,
        response_modality,
        voice,
        system_instruction: parsed.live.system_instruction,
        enable_search: parsed.live.enable_search,
        live_endpoint: parsed
            .live
            .endpoint
            .unwrap_or_else(|| DEFAULT_LIVE_ENDPOINT.to_string()),
        api_key,
        records_base_url,
        token_url,
    })
}
