//! The log-level state machine: `BEGIN_LOG`/`END_LOG`, zone and unit
//! lifecycle tracking, trial tracking, and dispatch into the active fight
//! builder.

use hashbrown::HashMap;

use crate::combat_log::{AbilityInfo, Event, MapChanged, UnitAdded, UnitChanged, UnitRemoved};
use crate::combat_log::EffectInfo as EffectInfoRecord;
use crate::combat_log::PlayerInfo as PlayerInfoRecord;
use crate::context::resolve;
use crate::fight::FightBuilder;
use crate::session::model::{
    AbilityDef, EffectDef, MapChange, PlayerInfoSnapshot, Session, SessionDetail, TrialRun,
    UnitInfo, ZoneSegment,
};

fn session_title(unix_start_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(unix_start_ms)
        .map(|dt| dt.format("Session %Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| format!("Session @{unix_start_ms}"))
}

fn is_hard_mode_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("hard mode") || (lower.contains("hm") && lower.contains("mode"))
}

struct OpenTrial {
    trial_key: i64,
    start_rel_ms: u64,
    start_unix_ms: i64,
}

/// Everything tracked while a `BEGIN_LOG`/`END_LOG` interval is open.
struct InSession {
    session: Session,
    active_units: HashMap<i64, usize>,
    current_zone_idx: Option<usize>,
    current_fight: Option<FightBuilder>,
    fight_ordinal: u64,
    next_fight_id: u64,
    fight_details: HashMap<u64, crate::fight::FightDetail>,
    open_trial: Option<OpenTrial>,
}

impl InSession {
    fn unit_lookup(&self) -> HashMap<i64, &UnitInfo> {
        self.active_units
            .iter()
            .map(|(&uid, &idx)| (uid, &self.session.units[idx]))
            .collect()
    }

    fn ensure_zone(&mut self, _rel_ms: u64) -> usize {
        if let Some(idx) = self.current_zone_idx {
            return idx;
        }
        let id = self.session.zones.len() as u32;
        self.session.zones.push(ZoneSegment {
            id,
            start_rel_ms: 0,
            end_rel_ms: None,
            zone_id: 0,
            zone_name: String::new(),
            difficulty: String::new(),
            maps: Vec::new(),
            fights: Vec::new(),
        });
        let idx = self.session.zones.len() - 1;
        self.current_zone_idx = Some(idx);
        idx
    }
}

/// Drives the session/log-level state machine across an ordered event
/// stream, possibly producing several [`SessionDetail`]s if more than one
/// `BEGIN_LOG` occurs (each defensively finalises the previous one first).
pub struct SessionBuilder {
    source_file_name: String,
    imported_at_unix_ms: i64,
    next_session_id: u64,
    completed: Vec<SessionDetail>,
    state: Option<InSession>,
    last_rel_ms: u64,
}

impl SessionBuilder {
    pub fn new(source_file_name: String, imported_at_unix_ms: i64) -> Self {
        Self {
            source_file_name,
            imported_at_unix_ms,
            next_session_id: 1,
            completed: Vec::new(),
            state: None,
            last_rel_ms: 0,
        }
    }

    pub fn process(&mut self, event: Event) {
        self.last_rel_ms = self.last_rel_ms.max(event.rel_ms());
        match event {
            Event::BeginLog(rel_ms, b) => {
                if self.state.is_some() {
                    self.finalize(rel_ms);
                }
                let id = self.next_session_id;
                self.next_session_id += 1;
                self.state = Some(InSession {
                    session: Session {
                        id,
                        title: session_title(b.unix_start_ms),
                        unix_start_ms: b.unix_start_ms,
                        server: resolve(b.server).to_string(),
                        language: resolve(b.language).to_string(),
                        patch: resolve(b.patch).to_string(),
                        source_file_name: self.source_file_name.clone(),
                        imported_at_unix_ms: self.imported_at_unix_ms,
                        ..Default::default()
                    },
                    active_units: HashMap::new(),
                    current_zone_idx: None,
                    current_fight: None,
                    fight_ordinal: 0,
                    next_fight_id: 1,
                    fight_details: HashMap::new(),
                    open_trial: None,
                });
            }
            Event::EndLog(rel_ms) => self.finalize(rel_ms),
            other => {
                if let Some(state) = self.state.as_mut() {
                    Self::dispatch(state, other);
                }
                // Records outside any session are discarded per the state
                // machine contract (only BEGIN_LOG enters InSession).
            }
        }
    }

    /// Call once the event stream is exhausted; handles premature EOF.
    pub fn finish(mut self) -> Vec<SessionDetail> {
        if self.state.is_some() {
            let last = self.last_rel_ms;
            self.finalize(last);
        }
        self.completed
    }

    fn dispatch(state: &mut InSession, event: Event) {
        match event {
            Event::ZoneChanged(rel_ms, z) => {
                if let Some(idx) = state.current_zone_idx {
                    state.session.zones[idx].end_rel_ms = Some(rel_ms);
                }
                let id = state.session.zones.len() as u32;
                state.session.zones.push(ZoneSegment {
                    id,
                    start_rel_ms: rel_ms,
                    end_rel_ms: None,
                    zone_id: z.zone_id,
                    zone_name: resolve(z.zone_name).to_string(),
                    difficulty: resolve(z.difficulty).to_string(),
                    maps: Vec::new(),
                    fights: Vec::new(),
                });
                state.current_zone_idx = Some(state.session.zones.len() - 1);
            }
            Event::MapChanged(rel_ms, m) => Self::handle_map_changed(state, rel_ms, m),
            Event::UnitAdded(rel_ms, u) => Self::handle_unit_added(state, rel_ms, u),
            Event::UnitChanged(rel_ms, u) => Self::handle_unit_changed(state, rel_ms, u),
            Event::UnitRemoved(rel_ms, u) => Self::handle_unit_removed(state, rel_ms, u),
            Event::AbilityInfo(_, a) => Self::handle_ability_info(state, a),
            Event::EffectInfo(_, e) => Self::handle_effect_info(state, e),
            Event::PlayerInfo(rel_ms, p) => Self::handle_player_info(state, rel_ms, p),
            Event::BeginCombat(rel_ms) => {
                if state.current_fight.is_none() {
                    state.current_fight = Some(FightBuilder::new(rel_ms));
                }
                // A second BEGIN_COMBAT while InFight is ignored (not nested).
            }
            Event::EndCombat(rel_ms) => Self::handle_end_combat(state, rel_ms),
            Event::BeginTrial(rel_ms, t) => {
                state.open_trial = Some(OpenTrial {
                    trial_key: t.trial_key,
                    start_rel_ms: rel_ms,
                    start_unix_ms: t.unix_start_ms,
                });
            }
            Event::EndTrial(rel_ms, t) => Self::handle_end_trial(state, rel_ms, t),
            Event::TrialInit(_, t) => state.session.trial_init_key = Some(t.trial_key),
            Event::HealthRegen(rel_ms, h) => {
                if let Some(fight) = state.current_fight.as_mut() {
                    fight.handle_health_regen(rel_ms, &h);
                }
            }
            Event::CombatEvent(rel_ms, ce) => {
                if let Some(fight) = state.current_fight.as_mut() {
                    fight.handle_combat_event(rel_ms, &ce);
                }
            }
            Event::EffectChanged(rel_ms, ec) => {
                if let Some(fight) = state.current_fight.as_mut() {
                    fight.handle_effect_changed(rel_ms, &ec, &state.session.hard_mode_marker_ids);
                }
            }
            Event::BeginCast(rel_ms, bc) => {
                if let Some(fight) = state.current_fight.as_mut() {
                    fight.handle_begin_cast(rel_ms, &bc);
                }
            }
            Event::EndCast(rel_ms, ec) => {
                if let Some(fight) = state.current_fight.as_mut() {
                    fight.handle_end_cast(rel_ms, &ec);
                }
            }
            Event::Unknown(_, type_name) => {
                *state
                    .session
                    .unhandled_counts
                    .entry(type_name.clone())
                    .or_insert(0) += 1;
                if let Some(fight) = state.current_fight.as_mut() {
                    fight.handle_unhandled(&type_name);
                }
            }
            Event::BeginLog(..) | Event::EndLog(..) => unreachable!("handled by caller"),
        }
    }

    fn handle_map_changed(state: &mut InSession, rel_ms: u64, m: MapChanged) {
        let idx = state.ensure_zone(rel_ms);
        state.session.zones[idx].maps.push(MapChange {
            rel_ms,
            map_id: m.map_id,
            map_name: resolve(m.map_name).to_string(),
            map_key: resolve(m.map_key).to_string(),
        });
    }

    fn handle_unit_added(state: &mut InSession, rel_ms: u64, u: UnitAdded) {
        if let Some(&idx) = state.active_units.get(&u.unit_id) {
            state.session.units[idx].is_active = false;
            state.session.units[idx].last_seen_rel_ms = rel_ms;
        }
        let entry = UnitInfo {
            unit_id: u.unit_id,
            unit_type: u.unit_type,
            is_local: u.is_local,
            group_index: Some(u.group_index),
            monster_id: Some(u.monster_id),
            is_boss: u.is_boss,
            class_id: Some(u.class_id),
            race_id: Some(u.race_id),
            name: resolve(u.name).to_string(),
            account: resolve(u.account).to_string(),
            character_id: u.character_id,
            level: u.level,
            champion_points: u.champion_points,
            disposition: resolve(u.disposition).to_string(),
            is_grouped: u.is_grouped,
            is_active: true,
            first_seen_rel_ms: rel_ms,
            last_seen_rel_ms: rel_ms,
        };
        state.session.units.push(entry);
        let idx = state.session.units.len() - 1;
        state.active_units.insert(u.unit_id, idx);
    }

    fn handle_unit_changed(state: &mut InSession, rel_ms: u64, u: UnitChanged) {
        if let Some(&idx) = state.active_units.get(&u.unit_id) {
            let entry = &mut state.session.units[idx];
            entry.class_id = Some(u.class_id);
            entry.race_id = Some(u.race_id);
            entry.name = resolve(u.name).to_string();
            entry.account = resolve(u.account).to_string();
            entry.character_id = u.character_id;
            entry.level = u.level;
            entry.champion_points = u.champion_points;
            entry.disposition = resolve(u.disposition).to_string();
            entry.is_grouped = u.is_grouped;
            entry.last_seen_rel_ms = rel_ms;
        }
    }

    fn handle_unit_removed(state: &mut InSession, rel_ms: u64, u: UnitRemoved) {
        if let Some(idx) = state.active_units.remove(&u.unit_id) {
            state.session.units[idx].is_active = false;
            state.session.units[idx].last_seen_rel_ms = rel_ms;
        }
    }

    fn handle_ability_info(state: &mut InSession, a: AbilityInfo) {
        let name = resolve(a.name).to_string();
        if is_hard_mode_name(&name) {
            state.session.hard_mode_marker_ids.insert(a.ability_id);
        }
        state.session.abilities.insert(
            a.ability_id,
            AbilityDef {
                ability_id: a.ability_id,
                name,
                icon: resolve(a.icon).to_string(),
                is_passive: a.is_passive,
                is_player_ability: a.is_player_ability,
            },
        );
    }

    fn handle_effect_info(state: &mut InSession, e: EffectInfoRecord) {
        state.session.effects.insert(
            e.ability_id,
            EffectDef {
                ability_id: e.ability_id,
                kind: resolve(e.kind).to_string(),
                damage_type: resolve(e.damage_type).to_string(),
                duration_type: resolve(e.duration_type).to_string(),
                linked_ability_id: e.linked_ability_id,
            },
        );
    }

    fn handle_player_info(state: &mut InSession, rel_ms: u64, p: PlayerInfoRecord) {
        state.session.player_infos.push(PlayerInfoSnapshot {
            rel_ms,
            unit_id: p.unit_id,
            passives: p.passives,
            ranks: p.ranks,
            gear: p.gear,
            front_bar: p.front_bar,
            back_bar: p.back_bar,
        });
    }

    fn handle_end_combat(state: &mut InSession, rel_ms: u64) {
        let Some(fight_builder) = state.current_fight.take() else {
            return;
        };
        let unit_lookup = state.unit_lookup();
        let fight_id = state.next_fight_id;
        state.next_fight_id += 1;

        let start_rel_ms = fight_builder.start_rel_ms();
        let is_hard_mode = fight_builder.is_hard_mode();
        let (detail, _friendly, enemy) = fight_builder.finish(fight_id, rel_ms, &unit_lookup);

        let mut boss_unit_ids: Vec<i64> = enemy
            .iter()
            .copied()
            .filter(|uid| unit_lookup.get(uid).is_some_and(|u| u.is_boss))
            .collect();
        boss_unit_ids.sort_unstable();
        let boss_names: Vec<String> = boss_unit_ids
            .iter()
            .filter_map(|uid| unit_lookup.get(uid).map(|u| u.name.clone()))
            .collect();

        state.fight_ordinal += 1;
        let title = if boss_names.is_empty() {
            format!("Fight {}", state.fight_ordinal)
        } else {
            boss_names.join(" + ")
        };

        let zone_idx = state.ensure_zone(start_rel_ms);
        let zone = &state.session.zones[zone_idx];
        let zone_name = zone.zone_name.clone();
        let difficulty = zone.difficulty.clone();
        let (map_name, map_key) = zone
            .maps
            .last()
            .map(|m| (Some(m.map_name.clone()), Some(m.map_key.clone())))
            .unwrap_or((None, None));
        let zone_segment_id = zone.id;

        let summary = crate::fight::FightSummary {
            id: fight_id,
            session_id: state.session.id,
            zone_segment_id,
            start_rel_ms,
            end_rel_ms: rel_ms,
            title,
            zone_name,
            difficulty,
            map_name,
            map_key,
            is_hard_mode,
            boss_unit_ids,
            boss_names,
        };

        state.session.zones[zone_idx].fights.push(summary);
        state.fight_details.insert(fight_id, detail);
    }

    fn handle_end_trial(state: &mut InSession, rel_ms: u64, t: crate::combat_log::EndTrial) {
        let unix_start_ms = state.session.unix_start_ms;
        let run = match state.open_trial.take() {
            Some(open) if open.trial_key == t.trial_key => TrialRun {
                trial_key: t.trial_key,
                start_rel_ms: open.start_rel_ms,
                end_rel_ms: rel_ms,
                start_unix_ms: open.start_unix_ms,
                end_unix_ms: unix_start_ms + rel_ms as i64,
                duration_ms: t.duration_ms,
                success: t.success,
                final_score: t.final_score,
                vitality: t.vitality,
                synthesised: false,
            },
            other => {
                // Missing/mismatched BEGIN_TRIAL: synthesise a draft.
                if let Some(open) = other {
                    state.open_trial = Some(open);
                }
                let start_unix_ms = unix_start_ms + rel_ms as i64;
                TrialRun {
                    trial_key: t.trial_key,
                    start_rel_ms: rel_ms,
                    end_rel_ms: rel_ms,
                    start_unix_ms,
                    end_unix_ms: start_unix_ms,
                    duration_ms: if t.duration_ms > 0 { t.duration_ms } else { 0 },
                    success: t.success,
                    final_score: t.final_score,
                    vitality: t.vitality,
                    synthesised: true,
                }
            }
        };
        state.session.trials.push(run);
    }

    fn finalize(&mut self, end_rel_ms: u64) {
        let Some(mut state) = self.state.take() else {
            return;
        };

        if let Some(fight_builder) = state.current_fight.take() {
            let unit_lookup: HashMap<i64, &UnitInfo> = state
                .active_units
                .iter()
                .map(|(&uid, &idx)| (uid, &state.session.units[idx]))
                .collect();
            let fight_id = state.next_fight_id;
            state.next_fight_id += 1;
            let start_rel_ms = fight_builder.start_rel_ms();
            let is_hard_mode = fight_builder.is_hard_mode();
            let (detail, _friendly, enemy) =
                fight_builder.finish(fight_id, end_rel_ms, &unit_lookup);
            let boss_unit_ids: Vec<i64> = enemy
                .iter()
                .copied()
                .filter(|uid| unit_lookup.get(uid).is_some_and(|u| u.is_boss))
                .collect();
            let boss_names: Vec<String> = boss_unit_ids
                .iter()
                .filter_map(|uid| unit_lookup.get(uid).map(|u| u.name.clone()))
                .collect();
            state.fight_ordinal += 1;
            let title = if boss_names.is_empty() {
                format!("Fight {}", state.fight_ordinal)
            } else {
                boss_names.join(" + ")
            };
            let zone_idx = state.ensure_zone(start_rel_ms);
            let zone = &state.session.zones[zone_idx];
            let summary = crate::fight::FightSummary {
                id: fight_id,
                session_id: state.session.id,
                zone_segment_id: zone.id,
                start_rel_ms,
                end_rel_ms,
                title,
                zone_name: zone.zone_name.clone(),
                difficulty: zone.difficulty.clone(),
                map_name: zone.maps.last().map(|m| m.map_name.clone()),
                map_key: zone.maps.last().map(|m| m.map_key.clone()),
                is_hard_mode,
                boss_unit_ids,
                boss_names,
            };
            drop(zone);
            state.session.zones[zone_idx].fights.push(summary);
            state.fight_details.insert(fight_id, detail);
        }

        if let Some(idx) = state.current_zone_idx {
            if state.session.zones[idx].end_rel_ms.is_none() {
                state.session.zones[idx].end_rel_ms = Some(end_rel_ms);
            }
        }

        self.completed.push(SessionDetail {
            session: state.session,
            fight_details: state.fight_details,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat_log::parse_record;

    fn ev(rel_ms: u64, ty: &str, rest: &str) -> Event {
        parse_record(rel_ms, ty, rest)
    }

    #[test]
    fn minimal_session_s1() {
        let mut b = SessionBuilder::new("test.log".into(), 0);
        b.process(ev(0, "BEGIN_LOG", "1700000000000,,NA,EN,10.0"));
        b.process(ev(10, "END_LOG", ""));
        let sessions = b.finish();
        assert_eq!(sessions.len(), 1);
        let s = &sessions[0].session;
        assert_eq!(s.unix_start_ms, 1700000000000);
        assert_eq!(s.fight_count(), 0);
        assert!(s.title.contains("2023"));
    }

    #[test]
    fn synthesised_zone_s2() {
        let mut b = SessionBuilder::new("test.log".into(), 0);
        b.process(ev(0, "BEGIN_LOG", "1700000000000,,NA,EN,10.0"));
        b.process(ev(5, "MAP_CHANGED", "1,Town,town"));
        b.process(ev(20, "END_LOG", ""));
        let sessions = b.finish();
        let s = &sessions[0].session;
        assert_eq!(s.zones.len(), 1);
        assert_eq!(s.zones[0].zone_id, 0);
        assert_eq!(s.zones[0].zone_name, "Town");
    }

    #[test]
    fn unit_id_reuse_s5() {
        let mut b = SessionBuilder::new("test.log".into(), 0);
        b.process(ev(0, "BEGIN_LOG", "1700000000000,,NA,EN,10.0"));
        b.process(ev(
            100,
            "UNIT_ADDED",
            "5,PLAYER,T,0,0,F,1,1,A,acct,1,50,0,0,PLAYER_ALLY,T",
        ));
        b.process(ev(
            500,
            "UNIT_ADDED",
            "5,PLAYER,T,0,0,F,1,1,B,acct,1,50,0,0,PLAYER_ALLY,T",
        ));
        b.process(ev(600, "END_LOG", ""));
        let sessions = b.finish();
        let s = &sessions[0].session;
        assert_eq!(s.units.len(), 2);
        assert!(!s.units[0].is_active);
        assert_eq!(s.units[0].last_seen_rel_ms, 500);
        assert_eq!(s.units[0].name, "A");
        assert_eq!(s.units[1].name, "B");
        assert!(s.units[1].is_active);
    }
}
