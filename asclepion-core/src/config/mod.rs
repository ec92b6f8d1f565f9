pub mod app;
pub mod error;
pub mod loader;

/// Default config file path - can be overridden via CLI argument
pub const CONFIG_PATH: &str = "config/client.toml";

pub use app::AppConfig;
pub use error::ConfigError;
