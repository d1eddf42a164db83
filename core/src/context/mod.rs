//! Cross-cutting context: string interning, configuration, shared error types.

mod config;
mod error;
mod interner;

pub use config::{AppConfigExt, default_log_store_dir};
pub use error::ConfigError;
pub use esolog_types::AppConfig;
pub use interner::{IStr, empty_istr, intern, resolve};
