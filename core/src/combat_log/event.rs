//! Sum-type event model: `parse_record` turns a framed record into a tagged
//! [`Event`] variant instead of leaving string dispatch to the state
//! machines. Every variant defaults missing trailing fields rather than
//! failing — the tokeniser already guarantees per-field text, never absence
//! of the whole record.

use crate::combat_log::unit_block::{UnitBlock, parse_unit_block};
use crate::context::IStr;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EntityType {
    #[default]
    Unknown,
    Player,
    Npc,
    Companion,
    Object,
}

impl EntityType {
    fn from_code(s: &str) -> EntityType {
        match s.trim() {
            "PLAYER" => EntityType::Player,
            "NPC" => EntityType::Npc,
            "COMPANION" => EntityType::Companion,
            "OBJECT" => EntityType::Object,
            _ => EntityType::Unknown,
        }
    }
}

/// Resource kind resolved from a record's `powerType` column. Both the
/// historical and current numeric encodings are accepted (Design Notes, Open
/// Question i).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResourceKind {
    Health,
    Magicka,
    Stamina,
    Ultimate,
    #[default]
    Unknown,
}

impl ResourceKind {
    pub fn from_power_type(code: i64) -> ResourceKind {
        match code {
            -2 | 32 => ResourceKind::Health,
            0 | 1 => ResourceKind::Magicka,
            6 | 4 => ResourceKind::Stamina,
            10 | 8 => ResourceKind::Ultimate,
            _ => ResourceKind::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EffectChangeType {
    #[default]
    Gained,
    Updated,
    Faded,
}

impl EffectChangeType {
    fn from_code(s: &str) -> EffectChangeType {
        match s.trim() {
            "FADED" => EffectChangeType::Faded,
            "UPDATED" => EffectChangeType::Updated,
            _ => EffectChangeType::Gained,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BeginLog {
    pub unix_start_ms: i64,
    pub server: IStr,
    pub language: IStr,
    pub patch: IStr,
}

#[derive(Debug, Clone, Default)]
pub struct ZoneChanged {
    pub zone_id: i64,
    pub zone_name: IStr,
    pub difficulty: IStr,
}

#[derive(Debug, Clone, Default)]
pub struct MapChanged {
    pub map_id: i64,
    pub map_name: IStr,
    pub map_key: IStr,
}

#[derive(Debug, Clone, Default)]
pub struct UnitAdded {
    pub unit_id: i64,
    pub unit_type: EntityType,
    pub is_local: bool,
    pub group_index: i64,
    pub monster_id: i64,
    pub is_boss: bool,
    pub class_id: i64,
    pub race_id: i64,
    pub name: IStr,
    pub account: IStr,
    pub character_id: i64,
    pub level: i64,
    pub champion_points: i64,
    pub disposition: IStr,
    pub is_grouped: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UnitChanged {
    pub unit_id: i64,
    pub class_id: i64,
    pub race_id: i64,
    pub name: IStr,
    pub account: IStr,
    pub character_id: i64,
    pub level: i64,
    pub champion_points: i64,
    pub disposition: IStr,
    pub is_grouped: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UnitRemoved {
    pub unit_id: i64,
}

#[derive(Debug, Clone, Default)]
pub struct AbilityInfo {
    pub ability_id: i64,
    pub name: IStr,
    pub icon: IStr,
    pub is_passive: bool,
    pub is_player_ability: bool,
}

#[derive(Debug, Clone, Default)]
pub struct EffectInfo {
    pub ability_id: i64,
    pub kind: IStr,
    pub damage_type: IStr,
    pub duration_type: IStr,
    pub linked_ability_id: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct PlayerInfo {
    pub unit_id: i64,
    pub passives: Vec<i64>,
    pub ranks: Vec<i64>,
    pub gear: Vec<Vec<i64>>,
    pub front_bar: Vec<i64>,
    pub back_bar: Vec<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct CombatEvent {
    pub result: IStr,
    pub damage_type: IStr,
    pub power_type: i64,
    pub damage: f64,
    pub heal: f64,
    pub source_instance_id: i64,
    pub ability_id: i64,
    pub source_unit_id: i64,
    pub source_block: UnitBlock,
    pub target_unit_id: Option<i64>,
    pub target_block: Option<UnitBlock>,
}

#[derive(Debug, Clone, Default)]
pub struct EffectChanged {
    pub change_type: EffectChangeType,
    pub effect_slot: i64,
    pub effect_instance_id: i64,
    pub ability_id: i64,
    pub target_unit_id: i64,
    pub target_block: UnitBlock,
}

#[derive(Debug, Clone, Default)]
pub struct BeginCast {
    pub cast_instance_id: i64,
    pub ability_id: i64,
    pub caster_unit_id: i64,
    pub caster_block: UnitBlock,
}

#[derive(Debug, Clone, Default)]
pub struct EndCast {
    pub result: IStr,
    pub cast_instance_id: i64,
    pub ability_id: i64,
}

#[derive(Debug, Clone, Default)]
pub struct HealthRegen {
    pub unit_id: i64,
    pub regen: f64,
    pub block: UnitBlock,
}

#[derive(Debug, Clone, Default)]
pub struct BeginTrial {
    pub trial_key: i64,
    pub unix_start_ms: i64,
}

#[derive(Debug, Clone, Default)]
pub struct EndTrial {
    pub trial_key: i64,
    pub duration_ms: i64,
    pub success: bool,
    pub final_score: i64,
    pub vitality: i64,
}

#[derive(Debug, Clone, Default)]
pub struct TrialInit {
    pub trial_key: i64,
}

/// A single parsed combat-log record. Carries `relMs` uniformly so callers
/// never need to re-derive it from the framer.
#[derive(Debug, Clone)]
pub enum Event {
    BeginLog(u64, BeginLog),
    EndLog(u64),
    ZoneChanged(u64, ZoneChanged),
    MapChanged(u64, MapChanged),
    UnitAdded(u64, UnitAdded),
    UnitChanged(u64, UnitChanged),
    UnitRemoved(u64, UnitRemoved),
    AbilityInfo(u64, AbilityInfo),
    EffectInfo(u64, EffectInfo),
    PlayerInfo(u64, PlayerInfo),
    BeginCombat(u64),
    EndCombat(u64),
    CombatEvent(u64, CombatEvent),
    EffectChanged(u64, EffectChanged),
    BeginCast(u64, BeginCast),
    EndCast(u64, EndCast),
    HealthRegen(u64, HealthRegen),
    TrialInit(u64, TrialInit),
    BeginTrial(u64, BeginTrial),
    EndTrial(u64, EndTrial),
    /// A syntactically well-formed record whose `type` is not recognised.
    Unknown(u64, String),
}

impl Event {
    pub fn rel_ms(&self) -> u64 {
        match self {
            Event::BeginLog(t, _)
            | Event::EndLog(t)
            | Event::ZoneChanged(t, _)
            | Event::MapChanged(t, _)
            | Event::UnitAdded(t, _)
            | Event::UnitChanged(t, _)
            | Event::UnitRemoved(t, _)
            | Event::AbilityInfo(t, _)
            | Event::EffectInfo(t, _)
            | Event::PlayerInfo(t, _)
            | Event::BeginCombat(t)
            | Event::EndCombat(t)
            | Event::CombatEvent(t, _)
            | Event::EffectChanged(t, _)
            | Event::BeginCast(t, _)
            | Event::EndCast(t, _)
            | Event::HealthRegen(t, _)
            | Event::TrialInit(t, _)
            | Event::BeginTrial(t, _)
            | Event::EndTrial(t, _)
            | Event::Unknown(t, _) => *t,
        }
    }
}

fn field<'a>(fields: &'a [String], idx: usize) -> &'a str {
    fields.get(idx).map(String::as_str).unwrap_or("")
}

fn pi64(fields: &[String], idx: usize) -> i64 {
    field(fields, idx).trim().parse().unwrap_or(0)
}

fn pf64(fields: &[String], idx: usize) -> f64 {
    field(fields, idx).trim().parse().unwrap_or(0.0)
}

fn pbool_tf(fields: &[String], idx: usize) -> bool {
    field(fields, idx).trim() == "T"
}

fn pistr(fields: &[String], idx: usize) -> IStr {
    crate::context::intern(field(fields, idx).trim())
}

/// Parse a list of integers from either a bare list (rest of record) or a
/// bracketed `[a,b,c]` field.
fn parse_int_list(token: &str) -> Vec<i64> {
    let inner = token
        .trim()
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(token.trim());
    if inner.is_empty() {
        return Vec::new();
    }
    inner
        .split(',')
        .map(|t| t.trim().parse().unwrap_or(0))
        .collect()
}

/// Parse the `[[a,b,c],[d,e,f]]` equipment shape: outer brackets stripped,
/// split on `],[`, each part split on `,`, tolerant of missing trailing
/// fields (defaulted to 0).
fn parse_gear_list(token: &str) -> Vec<Vec<i64>> {
    let trimmed = token.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(trimmed);
    if inner.is_empty() {
        return Vec::new();
    }
    inner
        .split("],[")
        .map(|part| {
            part.trim_matches(|c| c == '[' || c == ']')
                .split(',')
                .filter(|s| !s.is_empty())
                .map(|s| s.trim().parse().unwrap_or(0))
                .collect()
        })
        .collect()
}

/// Dispatch a framed record into a typed [`Event`]. Infallible: unknown
/// types fall through to [`Event::Unknown`]; missing trailing fields default.
pub fn parse_record(rel_ms: u64, record_type: &str, remainder: &str) -> Event {
    use crate::combat_log::tokenizer::{split_fields, split_fields_bracketed};

    match record_type {
        "BEGIN_LOG" => {
            let f = split_fields(remainder);
            Event::BeginLog(
                rel_ms,
                BeginLog {
                    unix_start_ms: pi64(&f, 0),
                    server: pistr(&f, 2),
                    language: pistr(&f, 3),
                    patch: pistr(&f, 4),
                },
            )
        }
        "END_LOG" => Event::EndLog(rel_ms),
        "ZONE_CHANGED" => {
            let f = split_fields(remainder);
            Event::ZoneChanged(
                rel_ms,
                ZoneChanged {
                    zone_id: pi64(&f, 0),
                    zone_name: pistr(&f, 1),
                    difficulty: pistr(&f, 2),
                },
            )
        }
        "MAP_CHANGED" => {
            let f = split_fields(remainder);
            Event::MapChanged(
                rel_ms,
                MapChanged {
                    map_id: pi64(&f, 0),
                    map_name: pistr(&f, 1),
                    map_key: pistr(&f, 2),
                },
            )
        }
        "UNIT_ADDED" => {
            let f = split_fields(remainder);
            Event::UnitAdded(
                rel_ms,
                UnitAdded {
                    unit_id: pi64(&f, 0),
                    unit_type: EntityType::from_code(field(&f, 1)),
                    is_local: pbool_tf(&f, 2),
                    group_index: pi64(&f, 3),
                    monster_id: pi64(&f, 4),
                    is_boss: pbool_tf(&f, 5),
                    class_id: pi64(&f, 6),
                    race_id: pi64(&f, 7),
                    name: pistr(&f, 8),
                    account: pistr(&f, 9),
                    character_id: pi64(&f, 10),
                    level: pi64(&f, 11),
                    champion_points: pi64(&f, 12),
                    disposition: pistr(&f, 14),
                    is_grouped: pbool_tf(&f, 15),
                },
            )
        }
        "UNIT_CHANGED" => {
            let f = split_fields(remainder);
            Event::UnitChanged(
                rel_ms,
                UnitChanged {
                    unit_id: pi64(&f, 0),
                    class_id: pi64(&f, 1),
                    race_id: pi64(&f, 2),
                    name: pistr(&f, 3),
                    account: pistr(&f, 4),
                    character_id: pi64(&f, 5),
                    level: pi64(&f, 6),
                    champion_points: pi64(&f, 7),
                    disposition: pistr(&f, 9),
                    is_grouped: pbool_tf(&f, 10),
                },
            )
        }
        "UNIT_REMOVED" => {
            let f = split_fields(remainder);
            Event::UnitRemoved(
                rel_ms,
                UnitRemoved {
                    unit_id: pi64(&f, 0),
                },
            )
        }
        "ABILITY_INFO" => {
            let f = split_fields(remainder);
            Event::AbilityInfo(
                rel_ms,
                AbilityInfo {
                    ability_id: pi64(&f, 0),
                    name: pistr(&f, 1),
                    icon: pistr(&f, 2),
                    is_passive: pbool_tf(&f, 3),
                    is_player_ability: pbool_tf(&f, 4),
                },
            )
        }
        "EFFECT_INFO" => {
            let f = split_fields(remainder);
            Event::EffectInfo(
                rel_ms,
                EffectInfo {
                    ability_id: pi64(&f, 0),
                    kind: pistr(&f, 1),
                    damage_type: pistr(&f, 2),
                    duration_type: pistr(&f, 3),
                    linked_ability_id: f.get(4).and_then(|s| s.trim().parse().ok()),
                },
            )
        }
        "PLAYER_INFO" => {
            let f = split_fields_bracketed(remainder);
            Event::PlayerInfo(
                rel_ms,
                PlayerInfo {
                    unit_id: pi64(&f, 0),
                    passives: f.get(1).map(|s| parse_int_list(s)).unwrap_or_default(),
                    ranks: f.get(2).map(|s| parse_int_list(s)).unwrap_or_default(),
                    gear: f.get(3).map(|s| parse_gear_list(s)).unwrap_or_default(),
                    front_bar: f.get(4).map(|s| parse_int_list(s)).unwrap_or_default(),
                    back_bar: f.get(5).map(|s| parse_int_list(s)).unwrap_or_default(),
                },
            )
        }
        "BEGIN_COMBAT" => Event::BeginCombat(rel_ms),
        "END_COMBAT" => Event::EndCombat(rel_ms),
        "COMBAT_EVENT" => {
            let f = split_fields(remainder);
            let result = pistr(&f, 0);
            let damage_type = pistr(&f, 1);
            let power_type = pi64(&f, 2);
            let damage = pf64(&f, 3);
            let heal = pf64(&f, 4);
            let source_instance_id = pi64(&f, 5);
            let ability_id = pi64(&f, 6);
            let source_unit_id = pi64(&f, 7);
            let (source_block, mut idx) = parse_unit_block(&f, 8);

            let target_unit_id = field(&f, idx).trim();
            let (target_unit_id, target_block) = if target_unit_id == "*" || target_unit_id.is_empty() {
                idx += 1;
                (None, None)
            } else {
                let tid: i64 = target_unit_id.parse().unwrap_or(0);
                idx += 1;
                let (block, _next) = parse_unit_block(&f, idx);
                (Some(tid), Some(block))
            };

            Event::CombatEvent(
                rel_ms,
                CombatEvent {
                    result,
                    damage_type,
                    power_type,
                    damage,
                    heal,
                    source_instance_id,
                    ability_id,
                    source_unit_id,
                    source_block,
                    target_unit_id,
                    target_block,
                },
            )
        }
        "EFFECT_CHANGED" => {
            let f = split_fields(remainder);
            let change_type = EffectChangeType::from_code(field(&f, 0));
            let effect_slot = pi64(&f, 1);
            let effect_instance_id = pi64(&f, 2);
            let ability_id = pi64(&f, 3);
            let target_unit_id = pi64(&f, 4);
            let (target_block, _next) = parse_unit_block(&f, 5);
            Event::EffectChanged(
                rel_ms,
                EffectChanged {
                    change_type,
                    effect_slot,
                    effect_instance_id,
                    ability_id,
                    target_unit_id,
                    target_block,
                },
            )
        }
        "BEGIN_CAST" => {
            let f = split_fields(remainder);
            let cast_instance_id = pi64(&f, 2);
            let ability_id = pi64(&f, 3);
            let caster_unit_id = pi64(&f, 4);
            let (caster_block, _next) = parse_unit_block(&f, 5);
            Event::BeginCast(
                rel_ms,
                BeginCast {
                    cast_instance_id,
                    ability_id,
                    caster_unit_id,
                    caster_block,
                },
            )
        }
        "END_CAST" => {
            let f = split_fields(remainder);
            Event::EndCast(
                rel_ms,
                EndCast {
                    result: pistr(&f, 0),
                    cast_instance_id: pi64(&f, 1),
                    ability_id: pi64(&f, 2),
                },
            )
        }
        "HEALTH_REGEN" => {
            let f = split_fields(remainder);
            let unit_id = pi64(&f, 0);
            let regen = pf64(&f, 1);
            let (block, _next) = parse_unit_block(&f, 2);
            Event::HealthRegen(
                rel_ms,
                HealthRegen {
                    unit_id,
                    regen,
                    block,
                },
            )
        }
        "TRIAL_INIT" | "TRAIL_INIT" => {
            let f = split_fields(remainder);
            Event::TrialInit(
                rel_ms,
                TrialInit {
                    trial_key: pi64(&f, 0),
                },
            )
        }
        "BEGIN_TRIAL" => {
            let f = split_fields(remainder);
            Event::BeginTrial(
                rel_ms,
                BeginTrial {
                    trial_key: pi64(&f, 0),
                    unix_start_ms: pi64(&f, 1),
                },
            )
        }
        "END_TRIAL" => {
            let f = split_fields(remainder);
            Event::EndTrial(
                rel_ms,
                EndTrial {
                    trial_key: pi64(&f, 0),
                    duration_ms: pi64(&f, 1),
                    success: pbool_tf(&f, 2),
                    final_score: pi64(&f, 3),
                    vitality: pi64(&f, 4),
                },
            )
        }
        other => Event::Unknown(rel_ms, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_begin_log() {
        let e = parse_record(0, "BEGIN_LOG", "1700000000000,,NA,EN,10.0");
        match e {
            Event::BeginLog(t, b) => {
                assert_eq!(t, 0);
                assert_eq!(b.unix_start_ms, 1700000000000);
                assert_eq!(crate::context::resolve(b.server), "NA");
            }
            _ => panic!("expected BeginLog"),
        }
    }

    #[test]
    fn unknown_type_is_preserved() {
        let e = parse_record(5, "SOMETHING_NEW", "a,b");
        match e {
            Event::Unknown(5, t) => assert_eq!(t, "SOMETHING_NEW"),
            _ => panic!("expected Unknown"),
        }
    }

    #[test]
    fn combat_event_with_no_target() {
        let e = parse_record(
            1000,
            "COMBAT_EVENT",
            "DAMAGE,GENERALIZED,0,100,0,0,7,1,100/100,50/50,50/50,500/500,0,1,2,3,*",
        );
        match e {
            Event::CombatEvent(_, ce) => {
                assert_eq!(ce.ability_id, 7);
                assert_eq!(ce.source_unit_id, 1);
                assert_eq!(ce.target_unit_id, None);
                assert_eq!(ce.damage, 100.0);
            }
            _ => panic!("expected CombatEvent"),
        }
    }

    #[test]
    fn combat_event_with_target_block() {
        let remainder =
            "DAMAGE,GENERALIZED,0,100,0,0,7,1,100/100,50/50,50/50,500/500,0,1,2,3,2,100/100,50/50,50/50,500/500,0,4,5,6";
        let e = parse_record(1000, "COMBAT_EVENT", remainder);
        match e {
            Event::CombatEvent(_, ce) => {
                assert_eq!(ce.target_unit_id, Some(2));
                let tb = ce.target_block.unwrap();
                assert_eq!((tb.x, tb.y, tb.z), (4.0, 5.0, 6.0));
            }
            _ => panic!("expected CombatEvent"),
        }
    }

    #[test]
    fn trail_init_misspelling_is_accepted() {
        let e = parse_record(0, "TRAIL_INIT", "42");
        match e {
            Event::TrialInit(_, t) => assert_eq!(t.trial_key, 42),
            _ => panic!("expected TrialInit"),
        }
    }

    #[test]
    fn parses_gear_list() {
        let parsed = parse_gear_list("[[1,2,3],[4,5]]");
        assert_eq!(parsed, vec![vec![1, 2, 3], vec![4, 5]]);
    }

    #[test]
    fn parses_bracketed_int_list() {
        assert_eq!(parse_int_list("[1,2,3]"), vec![1, 2, 3]);
        assert_eq!(parse_int_list(""), Vec::<i64>::new());
    }
}
