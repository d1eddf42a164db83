//! Session-scoped domain model: the log-level state machine's owned data.

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};

use crate::combat_log::EntityType;
use crate::fight::{FightDetail, FightSummary};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AbilityDef {
    pub ability_id: i64,
    pub name: String,
    pub icon: String,
    pub is_passive: bool,
    pub is_player_ability: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EffectDef {
    pub ability_id: i64,
    pub kind: String,
    pub damage_type: String,
    pub duration_type: String,
    pub linked_ability_id: Option<i64>,
}

/// One lifetime interval of a unit id. Ids are reused across a log; each
/// reuse closes the prior entry and appends a new one (Invariant 3: the
/// union of `[firstSeenRelMs, lastSeenRelMs]` per id is non-overlapping and
/// ordered).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UnitInfo {
    pub unit_id: i64,
    pub unit_type: EntityType,
    pub is_local: bool,
    pub group_index: Option<i64>,
    pub monster_id: Option<i64>,
    pub is_boss: bool,
    pub class_id: Option<i64>,
    pub race_id: Option<i64>,
    pub name: String,
    pub account: String,
    pub character_id: i64,
    pub level: i64,
    pub champion_points: i64,
    pub disposition: String,
    pub is_grouped: bool,
    pub is_active: bool,
    pub first_seen_rel_ms: u64,
    pub last_seen_rel_ms: u64,
}

impl UnitInfo {
    pub fn is_friendly(&self) -> bool {
        self.unit_type == EntityType::Player
            || ["PLAYER_ALLY", "NPC_ALLY", "FRIENDLY"]
                .iter()
                .any(|d| self.disposition.contains(d))
    }

    pub fn is_hostile(&self) -> bool {
        self.disposition.contains("HOSTILE")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MapChange {
    pub rel_ms: u64,
    pub map_id: i64,
    pub map_name: String,
    pub map_key: String,
}

/// A maximal interval between `ZONE_CHANGED` boundaries.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ZoneSegment {
    pub id: u32,
    pub start_rel_ms: u64,
    pub end_rel_ms: Option<u64>,
    pub zone_id: i64,
    pub zone_name: String,
    pub difficulty: String,
    pub maps: Vec<MapChange>,
    pub fights: Vec<FightSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PlayerInfoSnapshot {
    pub rel_ms: u64,
    pub unit_id: i64,
    pub passives: Vec<i64>,
    pub ranks: Vec<i64>,
    pub gear: Vec<Vec<i64>>,
    pub front_bar: Vec<i64>,
    pub back_bar: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TrialRun {
    pub trial_key: i64,
    pub start_rel_ms: u64,
    pub end_rel_ms: u64,
    pub start_unix_ms: i64,
    pub end_unix_ms: i64,
    pub duration_ms: i64,
    pub success: bool,
    pub final_score: i64,
    pub vitality: i64,
    /// `true` if this entry was fabricated at `END_TRIAL` because no
    /// matching `BEGIN_TRIAL` was observed (Error Handling Design,
    /// "Missing BEGIN_TRIAL for END_TRIAL").
    pub synthesised: bool,
}

/// The finalised, in-memory result of one `BEGIN_LOG`/`END_LOG` interval.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Session {
    pub id: u64,
    pub title: String,
    pub unix_start_ms: i64,
    pub server: String,
    pub language: String,
    pub patch: String,
    pub abilities: HashMap<i64, AbilityDef>,
    pub effects: HashMap<i64, EffectDef>,
    pub units: Vec<UnitInfo>,
    pub zones: Vec<ZoneSegment>,
    pub player_infos: Vec<PlayerInfoSnapshot>,
    pub trials: Vec<TrialRun>,
    pub unhandled_counts: HashMap<String, u64>,
    pub trial_init_key: Option<i64>,
    pub source_file_name: String,
    pub imported_at_unix_ms: i64,
    pub display_name: Option<String>,
    /// Ability ids whose `ABILITY_INFO` name matched the hard-mode heuristic
    /// (Design Notes, Open Question iii: not guaranteed exact).
    pub hard_mode_marker_ids: HashSet<i64>,
}

impl Session {
    pub fn fight_count(&self) -> usize {
        self.zones.iter().map(|z| z.fights.len()).sum()
    }
}

/// A finalised session plus every fight's full detail, keyed by fight id —
/// the unit the store writer persists in one transaction.
#[derive(Debug, Clone, Default)]
pub struct SessionDetail {
    pub session: Session,
    pub fight_details: HashMap<u64, FightDetail>,
}
