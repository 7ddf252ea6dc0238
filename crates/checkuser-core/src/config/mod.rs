//! Application configuration schemas.
//!
//! All configuration structs are deserialized via the `config` crate from
//! an optional TOML file overlaid with `CHECKUSER__*` environment
//! variables. Every field carries a default, so an empty source is a
//! valid configuration.

pub mod checker;
pub mod logging;
pub mod server;

use serde::{Deserialize, Serialize};
use validator::Validate;

pub use self::checker::{CheckerConfig, OpenVpnConfig};
pub use self::logging::LoggingConfig;
pub use self::server::ServerConfig;

use crate::error::AppError;

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    /// Request server settings.
    #[serde(default)]
    #[validate(nested)]
    pub server: ServerConfig,
    /// Connection checker settings.
    #[serde(default)]
    #[validate(nested)]
    pub checker: CheckerConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file and the environment.
    ///
    /// A missing file at the default path is tolerated; an explicitly
    /// requested path must exist.
    pub fn load(path: &str) -> Result<Self, AppError> {
        let required = path != DEFAULT_CONFIG_PATH;

        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(required))
            .add_source(
                config::Environment::with_prefix("CHECKUSER")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("checker.exclude"),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let app: AppConfig = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        app.check()?;
        Ok(app)
    }

    /// Validate value ranges.
    pub fn check(&self) -> Result<(), AppError> {
        self.validate()
            .map_err(|e| AppError::configuration(format!("Invalid configuration: {e}")))
    }
}
