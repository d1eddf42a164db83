//! Application configuration
//!
//! Re-exports the shared [`AppConfig`] from `esolog-types` and provides
//! platform-specific defaults and `confy`-backed persistence.

use std::path::PathBuf;

pub use esolog_types::AppConfig;

use crate::context::error::ConfigError;

/// Default per-log store root: `<platform data dir>/esolog/logdbs`.
pub fn default_log_store_dir() -> Result<PathBuf, ConfigError> {
    let base = dirs::data_dir().ok_or(ConfigError::NoDataDir)?;
    Ok(base.join("esolog").join("logdbs"))
}

/// Extension trait adding persistence and resolved-path helpers to [`AppConfig`].
pub trait AppConfigExt {
    fn load() -> Result<Self, ConfigError>
    where
        Self: Sized;
    fn save(&self) -> Result<(), ConfigError>;
    /// The resolved log-store directory: the configured override, or the
    /// platform default, created on disk if missing.
    fn resolved_log_store_dir(&self) -> Result<PathBuf, ConfigError>;
}

impl AppConfigExt for AppConfig {
    fn load() -> Result<Self, ConfigError> {
        Ok(confy::load("esolog", "config")?)
    }

    fn save(&self) -> Result<(), ConfigError> {
        confy::store("esolog", "config", self).map_err(ConfigError::Save)
    }

    fn resolved_log_store_dir(&self) -> Result<PathBuf, ConfigError> {
        let dir = match &self.log_store_dir {
            Some(custom) => PathBuf::from(custom),
            None => default_log_store_dir()?,
        };
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|source| ConfigError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(dir)
    }
}
