//! Per-log parquet store: one directory per imported log, containing five
//! tables (`log_meta`, `sessions`, `fights`, `fight_details`,
//! `fight_series`) written as a single atomic unit.

mod error;
mod reader;
mod tables;
mod writer;

pub use error::StoreError;
pub use reader::{LogStore, open_log_store};
pub use writer::{set_session_display_name, write_log_store};
