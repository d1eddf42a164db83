//! Transactional per-log store writer.
//!
//! "Commit" is modelled the way the store's `WriterProperties` stand in for
//! pragmas set once, before anything is written: every table for every
//! session in the log is assembled under a temporary directory name, and
//! only `fs::rename`d into place once every table has been written
//! successfully. A reader never observes a half-written store.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::session::SessionDetail;
use crate::store::error::StoreError;
use crate::store::tables::{
    self, FORMAT_VERSION, LogMetaRow,
};

const LOG_META_FILE: &str = "log_meta.parquet";
const SESSIONS_FILE: &str = "sessions.parquet";
const FIGHTS_FILE: &str = "fights.parquet";
const FIGHT_DETAILS_FILE: &str = "fight_details.parquet";
const FIGHT_SERIES_FILE: &str = "fight_series.parquet";

fn write_parquet(path: &Path, schema: Arc<Schema>, batch: &RecordBatch) -> Result<(), StoreError> {
    let file = File::create(path).map_err(|source| StoreError::CreateFile {
        path: path.to_path_buf(),
        source,
    })?;
    let props = WriterProperties::builder()
        .set_compression(Compression::ZSTD(Default::default()))
        .set_created_by("esolog".to_string())
        .build();
    let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}

/// Write every session parsed from one log file into `<store_root>/<log_key>/`.
///
/// `log_key` is a filesystem-safe identifier for this log (see
/// [`crate::index`] for how it's derived). Returns the path to the
/// committed store directory.
pub fn write_log_store(
    store_root: &Path,
    log_key: &str,
    source_file_name: &str,
    imported_at_unix_ms: i64,
    sessions: &[SessionDetail],
) -> Result<PathBuf, StoreError> {
    let final_dir = store_root.join(log_key);
    let tmp_dir = store_root.join(format!(".tmp-{log_key}"));

    if tmp_dir.exists() {
        fs::remove_dir_all(&tmp_dir).map_err(|source| StoreError::CreateDir {
            path: tmp_dir.clone(),
            source,
        })?;
    }
    fs::create_dir_all(&tmp_dir).map_err(|source| StoreError::CreateDir {
        path: tmp_dir.clone(),
        source,
    })?;

    let log_meta = LogMetaRow {
        source_file_name: source_file_name.to_string(),
        imported_at_unix_ms,
        session_count: sessions.len() as u32,
        format_version: FORMAT_VERSION,
    };
    write_parquet(
        &tmp_dir.join(LOG_META_FILE),
        tables::log_meta_schema(),
        &tables::log_meta_to_batch(&log_meta)?,
    )?;

    let session_rows: Vec<crate::session::Session> =
        sessions.iter().map(|sd| sd.session.clone()).collect();
    write_parquet(
        &tmp_dir.join(SESSIONS_FILE),
        tables::sessions_schema(),
        &tables::sessions_to_batch(&session_rows)?,
    )?;

    let fight_rows: Vec<crate::fight::FightSummary> = sessions
        .iter()
        .flat_map(|sd| sd.session.zones.iter().flat_map(|z| z.fights.iter().cloned()))
        .collect();
    write_parquet(
        &tmp_dir.join(FIGHTS_FILE),
        tables::fights_schema(),
        &tables::fights_to_batch(&fight_rows)?,
    )?;

    let detail_rows: Vec<(u64, u64, &crate::fight::FightDetail)> = sessions
        .iter()
        .flat_map(|sd| {
            sd.fight_details
                .iter()
                .map(move |(fid, detail)| (*fid, sd.session.id, detail))
        })
        .collect();
    write_parquet(
        &tmp_dir.join(FIGHT_DETAILS_FILE),
        tables::fight_details_schema(),
        &tables::fight_details_to_batch(&detail_rows)?,
    )?;

    let series_rows: Vec<(u64, &crate::fight::FightSeriesPoint)> = sessions
        .iter()
        .flat_map(|sd| {
            sd.fight_details
                .iter()
                .flat_map(|(fid, detail)| detail.series.iter().map(move |p| (*fid, p)))
        })
        .collect();
    write_parquet(
        &tmp_dir.join(FIGHT_SERIES_FILE),
        tables::fight_series_schema(),
        &tables::fight_series_to_batch(&series_rows)?,
    )?;

    if final_dir.exists() {
        fs::remove_dir_all(&final_dir).map_err(|source| StoreError::CreateDir {
            path: final_dir.clone(),
            source,
        })?;
    }
    fs::rename(&tmp_dir, &final_dir).map_err(|source| StoreError::Rename {
        from: tmp_dir.clone(),
        to: final_dir.clone(),
        source,
    })?;

    Ok(final_dir)
}

/// Updates one session's `display_name` in an already-committed store,
/// rewriting only the `sessions` table (temp file, then rename over the
/// original — the same commit discipline as [`write_log_store`], scoped to
/// a single file instead of a whole directory).
pub fn set_session_display_name(
    store_dir: &Path,
    session_id: u64,
    display_name: Option<String>,
) -> Result<(), StoreError> {
    let sessions_path = store_dir.join(SESSIONS_FILE);
    let mut sessions = {
        let file = File::open(&sessions_path).map_err(|source| StoreError::OpenFile {
            path: sessions_path.clone(),
            source,
        })?;
        let reader = parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder::try_new(file)?
            .build()?;
        let mut sessions = Vec::new();
        for batch in reader {
            sessions.extend(tables::sessions_from_batch(&batch?)?);
        }
        sessions
    };

    let found = sessions.iter_mut().find(|s| s.id == session_id);
    match found {
        Some(session) => session.display_name = display_name,
        None => {
            return Err(StoreError::NotFound {
                path: sessions_path,
            });
        }
    }

    let tmp_path = store_dir.join(format!(".tmp-{SESSIONS_FILE}"));
    write_parquet(&tmp_path, tables::sessions_schema(), &tables::sessions_to_batch(&sessions)?)?;
    fs::rename(&tmp_path, &sessions_path).map_err(|source| StoreError::Rename {
        from: tmp_path,
        to: sessions_path,
        source,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat_log::read_log_file;
    use crate::session::SessionBuilder;
    use crate::store::open_log_store;

    fn sample_log(dir: &Path) -> PathBuf {
        let path = dir.join("sample.log");
        fs::write(
            &path,
            concat!(
                "0,BEGIN_LOG,1700000000000,,NA,EN,10.0\n",
                "10,ZONE_CHANGED,1,Test Zone,VETERAN\n",
                "20,UNIT_ADDED,5,PLAYER,T,0,0,F,1,1,Tester,acct,1,50,0,0,PLAYER_ALLY,T\n",
                "30,BEGIN_COMBAT\n",
                "1030,COMBAT_EVENT,DAMAGE,GENERALIZED,0,100,0,0,7,5,100/100,50/50,50/50,500/500,0,1,2,3,*\n",
                "2030,END_COMBAT\n",
                "2040,END_LOG\n",
            ),
        )
        .unwrap();
        path
    }

    #[test]
    fn round_trips_a_single_session_store() {
        let tmp = tempfile::tempdir().unwrap();
        let log_path = sample_log(tmp.path());
        let events = read_log_file(&log_path).unwrap();
        let mut builder = SessionBuilder::new("sample.log".to_string(), 1700000001000);
        for event in events {
            builder.process(event);
        }
        let sessions = builder.finish();
        assert_eq!(sessions.len(), 1);

        let store_root = tmp.path().join("store");
        let committed = write_log_store(&store_root, "sample", "sample.log", 1700000001000, &sessions)
            .unwrap();
        assert!(committed.exists());
        assert!(!store_root.join(".tmp-sample").exists());

        let reopened = open_log_store(&committed).unwrap();
        assert_eq!(reopened.source_file_name, "sample.log");
        assert_eq!(reopened.sessions.len(), 1);
        assert_eq!(reopened.fights.len(), 1);
        assert_eq!(reopened.fight_details.len(), 1);
        assert!(!reopened.fight_series.is_empty());
    }
}
