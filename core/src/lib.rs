//! Combat log ingestion and query engine.
//!
//! A log file is parsed into [`combat_log::Event`]s, folded by
//! [`session::SessionBuilder`] into one or more finalised sessions, and
//! committed to a per-log [`store`]. [`index::LogIndex`] is the read path:
//! a routing table over every committed store, answering session/fight
//! queries without re-parsing anything.

pub mod combat_log;
pub mod context;
pub mod fight;
pub mod index;
pub mod query;
pub mod session;
pub mod store;

use std::path::Path;
use std::time::SystemTime;

use thiserror::Error;

pub use context::{AppConfig, AppConfigExt, ConfigError};
pub use index::{IndexError, LogIndex, SessionSummary};
pub use query::{AbilityAggregate, AggregateFilters, RangeStats};
pub use session::{Session, SessionDetail};

/// Errors surfaced by [`Engine::import_log`].
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to read log file {path}")]
    Read { path: std::path::PathBuf, #[source] source: combat_log::ReaderError },

    #[error(transparent)]
    Store(#[from] store::StoreError),

    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Owns the resolved store root and the index over it; the single entry
/// point a CLI (or any future front-end) drives.
pub struct Engine {
    store_root: std::path::PathBuf,
    index: LogIndex,
}

impl Engine {
    pub fn open(store_root: std::path::PathBuf) -> Result<Self, IndexError> {
        let index = LogIndex::open(store_root.clone())?;
        Ok(Self { store_root, index })
    }

    /// Parses `path`, folds it into one or more sessions, and commits each
    /// to its own directory under the store root. Returns a summary of
    /// every session produced (a log with multiple `BEGIN_LOG`/`END_LOG`
    /// pairs yields more than one).
    pub fn import_log(&mut self, path: &Path) -> Result<Vec<SessionSummary>, ImportError> {
        let span = tracing::info_span!("ingest", path = %path.display());
        let _enter = span.enter();

        let source_file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown.log")
            .to_string();

        let events = combat_log::read_log_file(path).map_err(|source| ImportError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let imported_at_unix_ms = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default();

        let mut builder = session::SessionBuilder::new(source_file_name.clone(), imported_at_unix_ms);
        for event in events {
            builder.process(event);
        }
        let sessions = builder.finish();

        let earliest_start = sessions
            .iter()
            .map(|s| s.session.unix_start_ms)
            .min()
            .unwrap_or(imported_at_unix_ms);
        let base = index::sanitize_base(&source_file_name);
        let mut log_key = index::friendly_store_name(&base, earliest_start, None);
        let mut suffix = 1u32;
        while self.store_root.join(&log_key).exists() {
            log_key = index::friendly_store_name(&base, earliest_start, Some(suffix));
            suffix += 1;
        }

        tracing::info_span!("write_store", %log_key).in_scope(|| {
            store::write_log_store(&self.store_root, &log_key, &source_file_name, imported_at_unix_ms, &sessions)
        })?;

        self.index.refresh()?;

        let written_ids: hashbrown::HashSet<u64> = sessions.iter().map(|s| s.session.id).collect();
        Ok(self
            .index
            .get_sessions()
            .into_iter()
            .filter(|s| written_ids.contains(&s.session_id))
            .collect())
    }

    pub fn list_sessions(&self) -> Vec<SessionSummary> {
        self.index.get_sessions()
    }

    pub fn get_session(&self, session_id: u64) -> Result<Session, IndexError> {
        self.index.get_session(session_id)
    }

    pub fn get_fight(&self, fight_id: u64) -> Result<fight::FightSummary, IndexError> {
        self.index.get_fight(fight_id)
    }

    pub fn get_fight_detail(&self, fight_id: u64) -> Result<fight::FightDetail, IndexError> {
        self.index.get_fight_detail(fight_id)
    }

    pub fn get_series(
        &self,
        fight_id: u64,
        filters: &AggregateFilters,
    ) -> Result<Vec<fight::FightSeriesPoint>, IndexError> {
        self.index.get_series(fight_id, filters)
    }

    pub fn get_aggregates(
        &self,
        fight_id: u64,
        filters: &AggregateFilters,
    ) -> Result<Vec<AbilityAggregate>, IndexError> {
        self.index.get_aggregates(fight_id, filters)
    }

    pub fn get_range(&self, fight_id: u64, from_ms: u64, to_ms: u64) -> Result<Option<RangeStats>, IndexError> {
        self.index.get_range(fight_id, from_ms, to_ms)
    }

    pub fn set_session_display_name(&mut self, session_id: u64, name: Option<String>) -> Result<(), IndexError> {
        self.index.set_session_display_name(session_id, name)
    }

    pub fn list_log_stores(&self) -> Vec<std::path::PathBuf> {
        self.index.list_log_stores()
    }

    pub fn delete_log_store(&mut self, path: &Path) -> Result<(), IndexError> {
        self.index.delete_log_store(path)
    }

    pub fn rename_legacy_stores(&mut self) -> Result<Vec<(std::path::PathBuf, std::path::PathBuf)>, IndexError> {
        tracing::info_span!("index_refresh").in_scope(|| self.index.rename_legacy_stores())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn sample_log(dir: &Path) -> std::path::PathBuf {
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
    fn import_log_is_queryable_end_to_end() {
        let tmp = tempfile::tempdir().unwrap();
        let log_path = sample_log(tmp.path());
        let store_root = tmp.path().join("stores");

        let mut engine = Engine::open(store_root).unwrap();
        let summaries = engine.import_log(&log_path).unwrap();
        assert_eq!(summaries.len(), 1);

        let sessions = engine.list_sessions();
        assert_eq!(sessions.len(), 1);
        let session = engine.get_session(sessions[0].session_id).unwrap();
        assert_eq!(session.fight_count(), 1);

        let fight_id = session.zones[0].fights[0].id;
        let aggregates = engine.get_aggregates(fight_id, &AggregateFilters::default()).unwrap();
        assert_eq!(aggregates.len(), 1);
        assert_eq!(aggregates[0].total, 100.0);
    }

    #[test]
    fn importing_the_same_log_twice_is_idempotent_in_content() {
        let tmp = tempfile::tempdir().unwrap();
        let log_path = sample_log(tmp.path());
        let store_root = tmp.path().join("stores");

        let mut engine = Engine::open(store_root).unwrap();
        engine.import_log(&log_path).unwrap();
        engine.import_log(&log_path).unwrap();

        // Two distinct store directories (friendly names collide, second
        // gets a numeric suffix), but both describe the same one session.
        assert_eq!(engine.list_log_stores().len(), 2);
        assert_eq!(engine.list_sessions().len(), 2);
    }
}
