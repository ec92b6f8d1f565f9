use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found at {path:?}")]
    NotFound { path: PathBuf },

    #[error("failed to read config from {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config from {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("missing required field 'model' in [live] configuration")]
    MissingModel,

    #[error("missing required field 'base_url' in [records] configuration")]
    MissingRecordsBaseUrl,

    #[error("missing required field 'token_url' in [records] configuration")]
    MissingTokenUrl,

    #[error("API key environment variable '{env_var}' is not set")]
    MissingApiKey { env_var: String },
}
