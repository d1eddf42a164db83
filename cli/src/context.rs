//! Shared CLI state: resolved configuration plus the engine it drives.

use std::path::PathBuf;

use esolog_core::{AppConfig, AppConfigExt, Engine};

pub struct CliContext {
    pub engine: Engine,
}

impl CliContext {
    pub fn load() -> Result<Self, String> {
        let config = AppConfig::load().map_err(|e| e.to_string())?;
        let store_root = config.resolved_log_store_dir().map_err(|e| e.to_string())?;
        let engine = Engine::open(store_root).map_err(|e| e.to_string())?;
        Ok(Self { engine })
    }

    pub fn store_root_override(path: PathBuf) -> Result<Self, String> {
        let engine = Engine::open(path).map_err(|e| e.to_string())?;
        Ok(Self { engine })
    }
}
