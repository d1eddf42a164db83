//! Fight-scoped domain model: everything materialised at `END_COMBAT`.

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};

use crate::combat_log::{EffectChangeType, Pool, ResourceKind};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FightSummary {
    pub id: u64,
    pub session_id: u64,
    pub zone_segment_id: u32,
    pub start_rel_ms: u64,
    pub end_rel_ms: u64,
    pub title: String,
    pub zone_name: String,
    pub difficulty: String,
    pub map_name: Option<String>,
    pub map_key: Option<String>,
    pub is_hard_mode: bool,
    pub boss_unit_ids: Vec<i64>,
    pub boss_names: Vec<String>,
}

/// `(sourceUnitId, targetUnitId, abilityId)`-keyed accumulator.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CombatAgg {
    pub source_unit_id: i64,
    pub target_unit_id: i64,
    pub ability_id: i64,
    pub total: f64,
    pub hits: u32,
    pub crits: u32,
    pub active_seconds: u32,
    pub overheal: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UnitTotals {
    pub damage_done: f64,
    pub damage_taken: f64,
    pub healing_done: f64,
    pub healing_taken: f64,
    pub resource_gained: f64,
    pub deaths: u32,
    pub casts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ResourceSample {
    pub second: u64,
    pub unit_id: i64,
    pub health: Pool,
    pub magicka: Pool,
    pub stamina: Pool,
    pub ultimate: Pool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ResourceEvent {
    pub rel_ms: u64,
    /// The unit receiving the change (target if present, else source).
    pub unit_id: i64,
    pub ability_id: i64,
    pub kind: ResourceKind,
    /// Signed: negative for DRAIN, positive for ENERGIZE.
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
pub struct EffectUptimeKey {
    pub target_unit_id: i64,
    pub ability_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EffectUptime {
    pub target_unit_id: i64,
    pub ability_id: i64,
    pub total_ms: i64,
    pub applications: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CastEntry {
    pub cast_instance_id: i64,
    pub ability_id: i64,
    pub caster_unit_id: i64,
    pub start_rel_ms: u64,
    pub end_rel_ms: Option<u64>,
    /// Result code from `END_CAST`, or `"OPEN"` for a cast still open when
    /// the fight ended.
    pub result: String,
}

/// Sentinel caster id used for an orphan `END_CAST` with no matching open
/// cast (Scenario S6).
pub const ORPHAN_CASTER_SENTINEL: i64 = -1;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Death {
    pub unit_id: i64,
    pub rel_ms: u64,
    pub attributed_to_unit_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FightSeriesPoint {
    pub second: u64,
    pub damage: f64,
    pub heal: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EffectChangedEvent {
    pub rel_ms: u64,
    pub change_type: EffectChangeType,
    pub effect_slot: i64,
    pub effect_instance_id: i64,
    pub ability_id: i64,
    pub target_unit_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HealthRegenEvent {
    pub rel_ms: u64,
    pub unit_id: i64,
    pub regen: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CombatSample {
    pub rel_ms: u64,
    pub source_unit_id: i64,
    /// `0` when the record had no target.
    pub target_unit_id: i64,
    pub ability_id: i64,
    pub damage: f64,
    pub heal: f64,
    pub overheal: f64,
    pub is_crit: bool,
    pub result: String,
}

/// Optional, explicitly-lossy raw event arrays kept for forensics (Design
/// Notes; Testable Property 7's "fields explicitly documented as lossy").
/// Grouped so the store can omit or truncate them on schema migration
/// without touching the scored/aggregated fields above.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RawCounters {
    pub effect_changes: Vec<EffectChangedEvent>,
    pub health_regen_events: Vec<HealthRegenEvent>,
    pub combat_samples: Vec<CombatSample>,
    pub resource_events: Vec<ResourceEvent>,
}

/// Materialised at `END_COMBAT`; built entirely in memory and never streamed
/// to the store mid-fight (Design Notes: "Per-fight in-memory then
/// serialise").
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FightDetail {
    pub fight_id: u64,
    pub friendly_unit_ids: HashSet<i64>,
    pub enemy_unit_ids: HashSet<i64>,
    pub unit_totals: HashMap<i64, UnitTotals>,
    pub damage_done_by_unit_ability: HashMap<i64, HashMap<i64, f64>>,
    pub damage_taken_by_unit_ability: HashMap<i64, HashMap<i64, f64>>,
    pub heal_done_by_unit_ability: HashMap<i64, HashMap<i64, f64>>,
    pub heal_taken_by_unit_ability: HashMap<i64, HashMap<i64, f64>>,
    pub resource_gained_by_unit_ability: HashMap<i64, HashMap<i64, f64>>,
    pub resource_samples: HashMap<(i64, u64), ResourceSample>,
    pub effect_uptimes: HashMap<EffectUptimeKey, EffectUptime>,
    pub casts: Vec<CastEntry>,
    pub deaths: Vec<Death>,
    pub unhandled_counts: HashMap<String, u64>,
    pub damage_aggs: Vec<CombatAgg>,
    pub heal_aggs: Vec<CombatAgg>,
    pub series: Vec<FightSeriesPoint>,
    pub raw: RawCounters,
}
