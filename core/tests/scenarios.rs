//! End-to-end scenarios driven through `Engine::import_log`, matching the
//! specification's numbered scenarios (S1, S2, S5, S6).

use std::fs;

use esolog_core::Engine;

fn write_log(dir: &std::path::Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

/// S1. Minimal session: just BEGIN_LOG/END_LOG, no zones or fights.
#[test]
fn s1_minimal_session() {
    let tmp = tempfile::tempdir().unwrap();
    let log = write_log(
        tmp.path(),
        "s1.log",
        "0,BEGIN_LOG,1700000000000,,NA,EN,10.0\n10,END_LOG\n",
    );

    let mut engine = Engine::open(tmp.path().join("stores")).unwrap();
    engine.import_log(&log).unwrap();

    let sessions = engine.list_sessions();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].unix_start_ms, 1_700_000_000_000);
    assert!(sessions[0].title.contains("2023"));

    let full = engine.get_session(sessions[0].session_id).unwrap();
    assert_eq!(full.fight_count(), 0);
    assert!(full.zones.is_empty());
}

/// S2. Synthesised zone: a MAP_CHANGED with no preceding ZONE_CHANGED still
/// yields one zone segment, with zoneId=0 and the map's own name.
#[test]
fn s2_synthesised_zone() {
    let tmp = tempfile::tempdir().unwrap();
    let log = write_log(
        tmp.path(),
        "s2.log",
        concat!(
            "0,BEGIN_LOG,1700000000000,,NA,EN,10.0\n",
            "5,MAP_CHANGED,1,Town,town\n",
            "10,END_LOG\n",
        ),
    );

    let mut engine = Engine::open(tmp.path().join("stores")).unwrap();
    engine.import_log(&log).unwrap();

    let sessions = engine.list_sessions();
    let full = engine.get_session(sessions[0].session_id).unwrap();
    assert_eq!(full.zones.len(), 1);
    assert_eq!(full.zones[0].zone_id, 0);
    assert_eq!(full.zones[0].zone_name, "Town");
    assert_eq!(full.zones[0].maps.len(), 1);
    assert_eq!(full.zones[0].maps[0].map_name, "Town");
}

/// S5. Unit id reuse: two UNIT_ADDED records for the same id with no
/// UNIT_REMOVED between them produce two lifetime entries.
#[test]
fn s5_unit_id_reuse() {
    let tmp = tempfile::tempdir().unwrap();
    let log = write_log(
        tmp.path(),
        "s5.log",
        concat!(
            "0,BEGIN_LOG,1700000000000,,NA,EN,10.0\n",
            "100,UNIT_ADDED,5,PLAYER,T,0,0,F,1,1,A,acctA,1,50,0,0,PLAYER_ALLY,T\n",
            "500,UNIT_ADDED,5,PLAYER,T,0,0,F,1,1,B,acctB,1,50,0,0,PLAYER_ALLY,T\n",
            "600,END_LOG\n",
        ),
    );

    let mut engine = Engine::open(tmp.path().join("stores")).unwrap();
    engine.import_log(&log).unwrap();

    let sessions = engine.list_sessions();
    let full = engine.get_session(sessions[0].session_id).unwrap();
    let entries: Vec<_> = full.units.iter().filter(|u| u.unit_id == 5).collect();
    assert_eq!(entries.len(), 2);
    assert!(!entries[0].is_active);
    assert_eq!(entries[0].last_seen_rel_ms, 500);
    assert_eq!(entries[0].name, "A");
    assert_eq!(entries[1].name, "B");
}

/// S6. Orphan END_CAST: no matching BEGIN_CAST still yields a CastEntry,
/// attributed to the sentinel caster, through the whole import pipeline.
#[test]
fn s6_orphan_end_cast() {
    let tmp = tempfile::tempdir().unwrap();
    let log = write_log(
        tmp.path(),
        "s6.log",
        concat!(
            "0,BEGIN_LOG,1700000000000,,NA,EN,10.0\n",
            "10,ZONE_CHANGED,1,Test Zone,VETERAN\n",
            "20,BEGIN_COMBAT\n",
            "500,END_CAST,COMPLETE,42,7\n",
            "600,END_COMBAT\n",
            "610,END_LOG\n",
        ),
    );

    let mut engine = Engine::open(tmp.path().join("stores")).unwrap();
    engine.import_log(&log).unwrap();

    let sessions = engine.list_sessions();
    let full = engine.get_session(sessions[0].session_id).unwrap();
    let fight_id = full.zones[0].fights[0].id;
    let detail = engine.get_fight_detail(fight_id).unwrap();

    assert_eq!(detail.casts.len(), 1);
    assert_eq!(detail.casts[0].caster_unit_id, esolog_core::fight::ORPHAN_CASTER_SENTINEL);
    assert!(detail.unit_totals.values().all(|t| t.casts == 0));
}
