//! The multi-log index: a directory of committed per-log stores, kept as a
//! read-only routing table from session/fight id to the store directory
//! that holds it.
//!
//! Mirrors the shape of a directory index over raw log files (see the
//! ingest side's filename bookkeeping), but scans committed store
//! directories instead of `.log` files and opens each one through
//! [`crate::store::open_log_store`] rather than re-parsing text.

mod error;

pub use error::IndexError;

use std::fs;
use std::path::{Path, PathBuf};

use hashbrown::HashMap;
use tokio::sync::watch;

use crate::fight::{FightDetail, FightSeriesPoint, FightSummary};
use crate::query::{self, AbilityAggregate, AggregateFilters, RangeStats};
use crate::session::Session;
use crate::store::open_log_store;

const LEGACY_SUFFIX: &str = ".log.db";

/// A lightweight row for `getSessions()`; full detail is fetched on demand
/// through [`LogIndex::get_session`].
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub session_id: u64,
    pub title: String,
    pub unix_start_ms: i64,
    pub display_name: Option<String>,
    pub fight_count: usize,
    pub store_path: PathBuf,
}

#[derive(Debug, Clone, Default)]
struct StoreEntry {
    sessions: Vec<SessionSummary>,
}

/// Routing table over every committed store directory under a store root.
pub struct LogIndex {
    store_root: PathBuf,
    entries: HashMap<PathBuf, StoreEntry>,
    session_locations: HashMap<u64, PathBuf>,
    fight_locations: HashMap<u64, PathBuf>,
    changed_tx: watch::Sender<u64>,
    generation: u64,
}

impl LogIndex {
    /// Opens (and immediately scans) the store root. The directory is
    /// created if missing, matching the config layer's
    /// `resolved_log_store_dir` behaviour.
    pub fn open(store_root: PathBuf) -> Result<Self, IndexError> {
        if !store_root.exists() {
            fs::create_dir_all(&store_root).map_err(|source| IndexError::Scan {
                path: store_root.clone(),
                source,
            })?;
        }
        let (changed_tx, _rx) = watch::channel(0);
        let mut index = Self {
            store_root,
            entries: HashMap::new(),
            session_locations: HashMap::new(),
            fight_locations: HashMap::new(),
            changed_tx,
            generation: 0,
        };
        index.refresh()?;
        Ok(index)
    }

    /// A receiver that ticks once per completed [`LogIndex::refresh`].
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changed_tx.subscribe()
    }

    /// Re-scans the store root, replacing every routing table. Stores that
    /// fail to open (a corrupt blob, a half-written directory left behind by
    /// a crashed import) are skipped rather than failing the whole refresh.
    pub fn refresh(&mut self) -> Result<(), IndexError> {
        let mut entries = HashMap::new();
        let mut session_locations = HashMap::new();
        let mut fight_locations = HashMap::new();

        let read_dir = fs::read_dir(&self.store_root).map_err(|source| IndexError::Scan {
            path: self.store_root.clone(),
            source,
        })?;
        for dir_entry in read_dir.filter_map(|e| e.ok()) {
            let path = dir_entry.path();
            if !path.is_dir() {
                continue;
            }
            let is_tmp = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(".tmp-"));
            if is_tmp {
                continue;
            }

            let store = match open_log_store(&path) {
                Ok(store) => store,
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "skipping unreadable log store");
                    continue;
                }
            };

            let mut sessions = Vec::with_capacity(store.sessions.len());
            for session in &store.sessions {
                session_locations.insert(session.id, path.clone());
                for zone in &session.zones {
                    for fight in &zone.fights {
                        fight_locations.insert(fight.id, path.clone());
                    }
                }
                sessions.push(SessionSummary {
                    session_id: session.id,
                    title: session.title.clone(),
                    unix_start_ms: session.unix_start_ms,
                    display_name: session.display_name.clone(),
                    fight_count: session.fight_count(),
                    store_path: path.clone(),
                });
            }
            entries.insert(path, StoreEntry { sessions });
        }

        self.entries = entries;
        self.session_locations = session_locations;
        self.fight_locations = fight_locations;
        self.generation += 1;
        let _ = self.changed_tx.send(self.generation);
        Ok(())
    }

    /// Every indexed session, newest first.
    pub fn get_sessions(&self) -> Vec<SessionSummary> {
        let mut rows: Vec<SessionSummary> = self
            .entries
            .values()
            .flat_map(|entry| entry.sessions.iter().cloned())
            .collect();
        rows.sort_by(|a, b| b.unix_start_ms.cmp(&a.unix_start_ms));
        rows
    }

    fn store_for_session(&self, session_id: u64) -> Result<PathBuf, IndexError> {
        self.session_locations
            .get(&session_id)
            .cloned()
            .ok_or(IndexError::SessionNotFound { session_id })
    }

    fn store_for_fight(&self, fight_id: u64) -> Result<PathBuf, IndexError> {
        self.fight_locations
            .get(&fight_id)
            .cloned()
            .ok_or(IndexError::FightNotFound { fight_id })
    }

    pub fn get_session(&self, session_id: u64) -> Result<Session, IndexError> {
        let path = self.store_for_session(session_id)?;
        let store = open_log_store(&path)?;
        store
            .sessions
            .into_iter()
            .find(|s| s.id == session_id)
            .ok_or(IndexError::SessionNotFound { session_id })
    }

    pub fn get_fight(&self, fight_id: u64) -> Result<FightSummary, IndexError> {
        let path = self.store_for_fight(fight_id)?;
        let store = open_log_store(&path)?;
        store
            .fights
            .into_iter()
            .find(|f| f.id == fight_id)
            .ok_or(IndexError::FightNotFound { fight_id })
    }

    pub fn get_fight_detail(&self, fight_id: u64) -> Result<FightDetail, IndexError> {
        let path = self.store_for_fight(fight_id)?;
        let mut store = open_log_store(&path)?;
        store
            .fight_details
            .remove(&fight_id)
            .ok_or(IndexError::FightNotFound { fight_id })
    }

    pub fn get_series(
        &self,
        fight_id: u64,
        filters: &AggregateFilters,
    ) -> Result<Vec<FightSeriesPoint>, IndexError> {
        let detail = self.get_fight_detail(fight_id)?;
        Ok(query::projected_series(&detail, filters))
    }

    pub fn get_aggregates(
        &self,
        fight_id: u64,
        filters: &AggregateFilters,
    ) -> Result<Vec<AbilityAggregate>, IndexError> {
        let detail = self.get_fight_detail(fight_id)?;
        Ok(query::projected_aggregates(&detail, filters))
    }

    pub fn get_range(
        &self,
        fight_id: u64,
        from_ms: u64,
        to_ms: u64,
    ) -> Result<Option<RangeStats>, IndexError> {
        let detail = self.get_fight_detail(fight_id)?;
        Ok(query::range_stats(&detail, from_ms, to_ms))
    }

    /// Every committed store directory under the root, in no particular
    /// order.
    pub fn list_log_stores(&self) -> Vec<PathBuf> {
        self.entries.keys().cloned().collect()
    }

    /// Removes a store directory from disk and the index. The caller is
    /// responsible for re-running [`LogIndex::refresh`]; this only touches
    /// the one entry so a batch delete doesn't re-scan between each removal.
    pub fn delete_log_store(&mut self, path: &Path) -> Result<(), IndexError> {
        if path.exists() {
            fs::remove_dir_all(path).map_err(|source| IndexError::Delete {
                path: path.to_path_buf(),
                source,
            })?;
        }
        if let Some(entry) = self.entries.remove(path) {
            self.session_locations.retain(|_, p| p != path);
            self.fight_locations.retain(|_, p| p != path);
            drop(entry);
        }
        self.generation += 1;
        let _ = self.changed_tx.send(self.generation);
        Ok(())
    }

    /// Renames legacy (pre-friendly-naming) store directories to
    /// `<base>_YYYY-MM-DD_HH-MM-SS.log.db`, resolving collisions with a
    /// numeric suffix. Returns the `(old, new)` path pairs actually renamed.
    pub fn rename_legacy_stores(&mut self) -> Result<Vec<(PathBuf, PathBuf)>, IndexError> {
        let legacy: Vec<PathBuf> = self
            .entries
            .keys()
            .filter(|p| is_legacy_store_name(p))
            .cloned()
            .collect();

        let mut renamed = Vec::new();
        for old_path in legacy {
            let store = open_log_store(&old_path)?;
            let earliest_start = store.sessions.iter().map(|s| s.unix_start_ms).min().unwrap_or(0);
            let base = sanitize_base(&store.source_file_name);
            let mut candidate = self.store_root.join(friendly_store_name(&base, earliest_start, None));
            let mut suffix = 1u32;
            while candidate.exists() {
                candidate = self
                    .store_root
                    .join(friendly_store_name(&base, earliest_start, Some(suffix)));
                suffix += 1;
            }
            fs::rename(&old_path, &candidate).map_err(|source| IndexError::Rename {
                from: old_path.clone(),
                to: candidate.clone(),
                source,
            })?;
            renamed.push((old_path, candidate));
        }

        if !renamed.is_empty() {
            self.refresh()?;
        }
        Ok(renamed)
    }

    pub fn set_session_display_name(
        &mut self,
        session_id: u64,
        name: Option<String>,
    ) -> Result<(), IndexError> {
        let path = self.store_for_session(session_id)?;
        crate::store::set_session_display_name(&path, session_id, name)?;
        self.refresh()
    }
}

fn is_legacy_store_name(path: &Path) -> bool {
    !path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(LEGACY_SUFFIX))
}

pub(crate) fn sanitize_base(source_file_name: &str) -> String {
    let stem = Path::new(source_file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("log");
    let sanitized: String = stem
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if sanitized.is_empty() { "log".to_string() } else { sanitized }
}

pub(crate) fn friendly_store_name(base: &str, unix_start_ms: i64, suffix: Option<u32>) -> String {
    let stamp = chrono::DateTime::from_timestamp_millis(unix_start_ms)
        .map(|dt| dt.format("%Y-%m-%d_%H-%M-%S").to_string())
        .unwrap_or_else(|| format!("t{unix_start_ms}"));
    match suffix {
        Some(n) => format!("{base}_{stamp}-{n}{LEGACY_SUFFIX}"),
        None => format!("{base}_{stamp}{LEGACY_SUFFIX}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat_log::read_log_file;
    use crate::session::SessionBuilder;
    use crate::store::write_log_store;

    fn write_sample_store(store_root: &Path, log_key: &str, source_file_name: &str) -> PathBuf {
        let log_path = store_root.join(format!("{source_file_name}.src"));
        fs::write(
            &log_path,
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
        let events = read_log_file(&log_path).unwrap();
        let mut builder = SessionBuilder::new(source_file_name.to_string(), 1_700_000_001_000);
        for event in events {
            builder.process(event);
        }
        let sessions = builder.finish();
        write_log_store(store_root, log_key, source_file_name, 1_700_000_001_000, &sessions).unwrap()
    }

    #[test]
    fn refresh_builds_routing_tables_and_notifies() {
        let tmp = tempfile::tempdir().unwrap();
        let store_root = tmp.path().join("stores");
        fs::create_dir_all(&store_root).unwrap();
        write_sample_store(&store_root, "sample_2023-11-14_00-00-00.log.db", "sample.log");

        let mut index = LogIndex::open(store_root.clone()).unwrap();
        let rx = index.subscribe();
        let sessions = index.get_sessions();
        assert_eq!(sessions.len(), 1);
        let session_id = sessions[0].session_id;

        let full = index.get_session(session_id).unwrap();
        assert_eq!(full.source_file_name, "sample.log");
        assert_eq!(full.fight_count(), 1);

        let fight_id = full.zones[0].fights[0].id;
        let detail = index.get_fight_detail(fight_id).unwrap();
        assert_eq!(detail.fight_id, fight_id);

        index.refresh().unwrap();
        assert!(*rx.borrow() >= 1);
    }

    #[test]
    fn set_session_display_name_persists_across_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let store_root = tmp.path().join("stores");
        fs::create_dir_all(&store_root).unwrap();
        write_sample_store(&store_root, "sample_2023-11-14_00-00-00.log.db", "sample.log");

        let mut index = LogIndex::open(store_root.clone()).unwrap();
        let session_id = index.get_sessions()[0].session_id;
        index
            .set_session_display_name(session_id, Some("Trash Clear".to_string()))
            .unwrap();

        let reopened = LogIndex::open(store_root).unwrap();
        let session = reopened.get_session(session_id).unwrap();
        assert_eq!(session.display_name.as_deref(), Some("Trash Clear"));
    }

    #[test]
    fn rename_legacy_stores_adopts_friendly_name() {
        let tmp = tempfile::tempdir().unwrap();
        let store_root = tmp.path().join("stores");
        fs::create_dir_all(&store_root).unwrap();
        let legacy_path = write_sample_store(
            &store_root,
            "3f29c1d2-8f0a-4a1e-9e3b-6e6f8b2b9a10",
            "sample.log",
        );
        assert!(legacy_path.exists());

        let mut index = LogIndex::open(store_root.clone()).unwrap();
        let renamed = index.rename_legacy_stores().unwrap();
        assert_eq!(renamed.len(), 1);
        assert!(!renamed[0].0.exists());
        assert!(renamed[0].1.exists());
        assert!(
            renamed[0]
                .1
                .file_name()
                .unwrap()
                .to_str()
                .unwrap()
                .ends_with(LEGACY_SUFFIX)
        );
    }

    #[test]
    fn delete_log_store_removes_from_disk_and_index() {
        let tmp = tempfile::tempdir().unwrap();
        let store_root = tmp.path().join("stores");
        fs::create_dir_all(&store_root).unwrap();
        let path = write_sample_store(&store_root, "sample_2023-11-14_00-00-00.log.db", "sample.log");

        let mut index = LogIndex::open(store_root).unwrap();
        index.delete_log_store(&path).unwrap();
        assert!(!path.exists());
        assert!(index.get_sessions().is_empty());
    }
}
