//! Read-back for a committed per-log store directory.

use std::fs::File;
use std::path::Path;

use arrow::record_batch::RecordBatch;
use hashbrown::HashMap;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::fight::{FightDetail, FightSeriesPoint, FightSummary};
use crate::session::Session;
use crate::store::error::StoreError;
use crate::store::tables;

fn read_batches(path: &Path) -> Result<Vec<RecordBatch>, StoreError> {
    let file = File::open(path).map_err(|source| StoreError::OpenFile {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    Ok(reader.collect::<Result<Vec<_>, _>>()?)
}

/// The fully-materialised contents of one log's store directory.
#[derive(Debug, Clone, Default)]
pub struct LogStore {
    pub source_file_name: String,
    pub imported_at_unix_ms: i64,
    pub sessions: Vec<Session>,
    pub fights: Vec<FightSummary>,
    pub fight_details: HashMap<u64, FightDetail>,
    pub fight_series: Vec<(u64, FightSeriesPoint)>,
}

pub fn open_log_store(dir: &Path) -> Result<LogStore, StoreError> {
    if !dir.is_dir() {
        return Err(StoreError::NotFound {
            path: dir.to_path_buf(),
        });
    }

    let meta_batches = read_batches(&dir.join("log_meta.parquet"))?;
    let (source_file_name, imported_at_unix_ms) = meta_batches
        .first()
        .map(|b| {
            let name = b
                .column(0)
                .as_any()
                .downcast_ref::<arrow::array::StringArray>()
                .expect("log_meta.source_file_name column type")
                .value(0)
                .to_string();
            let imported = b
                .column(1)
                .as_any()
                .downcast_ref::<arrow::array::Int64Array>()
                .expect("log_meta.imported_at_unix_ms column type")
                .value(0);
            (name, imported)
        })
        .unwrap_or_default();

    let mut sessions = Vec::new();
    for batch in read_batches(&dir.join("sessions.parquet"))? {
        sessions.extend(tables::sessions_from_batch(&batch)?);
    }

    let mut fights = Vec::new();
    for batch in read_batches(&dir.join("fights.parquet"))? {
        fights.extend(tables::fights_from_batch(&batch)?);
    }

    let mut fight_details = HashMap::new();
    for batch in read_batches(&dir.join("fight_details.parquet"))? {
        fight_details.extend(tables::fight_details_from_batch(&batch)?);
    }

    let mut fight_series = Vec::new();
    for batch in read_batches(&dir.join("fight_series.parquet"))? {
        fight_series.extend(tables::fight_series_from_batch(&batch)?);
    }

    Ok(LogStore {
        source_file_name,
        imported_at_unix_ms,
        sessions,
        fights,
        fight_details,
        fight_series,
    })
}
