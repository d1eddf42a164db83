//! Shared configuration types for esolog
//!
//! Kept as its own crate so that future front-ends (CLI, or a future UI) can
//! depend on the configuration shape without pulling in the ingestion engine.

use serde::{Deserialize, Serialize};

fn default_retention_days() -> Option<u32> {
    None
}

/// Persisted, user-editable configuration for the ingestion/query engine.
///
/// Loaded and stored through `confy`, which picks a platform config directory
/// via `dirs` and serializes this struct as TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory under which per-log stores (`<base>_<timestamp>.log.db/`) are
    /// created. Defaults to `<app data dir>/logdbs`.
    pub log_store_dir: Option<String>,
    /// Directory the client writes raw `combat_*.log` files to, used by
    /// `listLogStores`/import helpers that scan for new input logs.
    pub watch_dir: Option<String>,
    /// Days after which old, already-imported stores may be pruned. `None`
    /// disables retention-based cleanup.
    #[serde(default = "default_retention_days")]
    pub retention_days: Option<u32>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_store_dir: None,
            watch_dir: None,
            retention_days: None,
        }
    }
}
