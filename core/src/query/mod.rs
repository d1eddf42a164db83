//! Read-only projections over one fight's [`FightDetail`].
//!
//! Every operation here is plain Rust over data already materialised by
//! [`crate::fight::FightBuilder`] at `END_COMBAT`; nothing here touches the
//! store or re-parses a log.

use crate::fight::{CombatAgg, FightDetail, FightSeriesPoint};

/// Narrows a fight's aggregates or series to one source/target pair and/or
/// the heal channel instead of damage.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AggregateFilters {
    pub source_unit_id: Option<i64>,
    pub target_unit_id: Option<i64>,
    pub heals: bool,
}

impl AggregateFilters {
    fn matches(&self, agg: &CombatAgg) -> bool {
        self.source_unit_id.is_none_or(|id| id == agg.source_unit_id)
            && self.target_unit_id.is_none_or(|id| id == agg.target_unit_id)
    }

    fn is_unrestricted(&self) -> bool {
        self.source_unit_id.is_none() && self.target_unit_id.is_none()
    }

    fn aggs<'a>(&self, detail: &'a FightDetail) -> &'a [CombatAgg] {
        if self.heals {
            &detail.heal_aggs
        } else {
            &detail.damage_aggs
        }
    }
}

/// One ability's totals across the matched source/target pairs, with the
/// derived rates the UI actually plots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AbilityAggregate {
    pub ability_id: i64,
    pub total: f64,
    pub hits: u32,
    pub crits: u32,
    pub active_seconds: u32,
    pub overheal: f64,
    pub dps: f64,
    pub average: f64,
    pub crit_pct: f64,
    pub percent: f64,
}

/// The sorted, deduplicated ability ids present under `filters`.
pub fn ability_ids(detail: &FightDetail, filters: &AggregateFilters) -> Vec<i64> {
    let mut ids: Vec<i64> = filters
        .aggs(detail)
        .iter()
        .filter(|agg| filters.matches(agg))
        .map(|agg| agg.ability_id)
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Per-ability totals, grouped across every matching source/target pair and
/// sorted descending by `total`.
pub fn projected_aggregates(detail: &FightDetail, filters: &AggregateFilters) -> Vec<AbilityAggregate> {
    let mut by_ability: hashbrown::HashMap<i64, AbilityAggregate> = hashbrown::HashMap::new();
    for agg in filters.aggs(detail).iter().filter(|agg| filters.matches(agg)) {
        let entry = by_ability.entry(agg.ability_id).or_insert_with(|| AbilityAggregate {
            ability_id: agg.ability_id,
            ..Default::default()
        });
        entry.total += agg.total;
        entry.hits += agg.hits;
        entry.crits += agg.crits;
        entry.active_seconds += agg.active_seconds;
        entry.overheal += agg.overheal;
    }

    let grand_total: f64 = by_ability.values().map(|a| a.total).sum();

    let mut rows: Vec<AbilityAggregate> = by_ability
        .into_values()
        .map(|mut row| {
            row.dps = if row.active_seconds == 0 {
                row.total
            } else {
                row.total / row.active_seconds as f64
            };
            row.average = if row.hits == 0 { 0.0 } else { row.total / row.hits as f64 };
            row.crit_pct = if row.hits == 0 { 0.0 } else { row.crits as f64 / row.hits as f64 };
            row.percent = if grand_total == 0.0 { 0.0 } else { row.total / grand_total };
            row
        })
        .collect();

    rows.sort_by(|a, b| b.total.partial_cmp(&a.total).unwrap_or(std::cmp::Ordering::Equal));
    rows
}

/// The damage/heal time series under `filters`.
///
/// When the fight has raw per-event combat samples, this buckets them by
/// integer second and reports only non-zero buckets. When it doesn't (an
/// older store, or a fight recorded without raw samples retained) and no
/// source/target filter narrows the result, the dense per-second series
/// recorded at `END_COMBAT` is returned verbatim, with the unselected
/// channel zeroed out when `heals` is set.
pub fn projected_series(detail: &FightDetail, filters: &AggregateFilters) -> Vec<FightSeriesPoint> {
    if detail.raw.combat_samples.is_empty() && filters.is_unrestricted() {
        return detail
            .series
            .iter()
            .map(|point| {
                if filters.heals {
                    FightSeriesPoint { second: point.second, damage: 0.0, heal: point.heal }
                } else {
                    FightSeriesPoint { second: point.second, damage: point.damage, heal: 0.0 }
                }
            })
            .collect();
    }

    let mut by_second: hashbrown::HashMap<u64, (f64, f64)> = hashbrown::HashMap::new();
    for sample in &detail.raw.combat_samples {
        if filters.source_unit_id.is_some_and(|id| id != sample.source_unit_id) {
            continue;
        }
        if filters.target_unit_id.is_some_and(|id| id != sample.target_unit_id) {
            continue;
        }
        let second = sample.rel_ms / 1000;
        let entry = by_second.entry(second).or_insert((0.0, 0.0));
        entry.0 += sample.damage;
        entry.1 += sample.heal;
    }

    let mut points: Vec<FightSeriesPoint> = by_second
        .into_iter()
        .filter(|(_, (damage, heal))| *damage != 0.0 || *heal != 0.0)
        .map(|(second, (damage, heal))| FightSeriesPoint { second, damage, heal })
        .collect();
    points.sort_by_key(|p| p.second);
    points
}

/// Additive totals over `[from, to)` milliseconds, expressed as whole
/// seconds (`floor(from/1000)..ceil(to/1000)`).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RangeStats {
    pub damage: f64,
    pub heal: f64,
    pub dps: f64,
    pub hps: f64,
    pub duration_sec: f64,
}

/// `None` when `to <= from`, matching the "no range" convention used
/// throughout the time-series API.
pub fn range_stats(detail: &FightDetail, from_ms: u64, to_ms: u64) -> Option<RangeStats> {
    if to_ms <= from_ms {
        return None;
    }
    let from_sec = from_ms / 1000;
    let to_sec = to_ms.div_ceil(1000);

    let (damage, heal) = detail
        .series
        .iter()
        .filter(|p| p.second >= from_sec && p.second < to_sec)
        .fold((0.0, 0.0), |(d, h), p| (d + p.damage, h + p.heal));

    let duration_sec = ((to_ms - from_ms) as f64 / 1000.0).max(0.001);
    Some(RangeStats {
        damage,
        heal,
        dps: damage / duration_sec,
        hps: heal / duration_sec,
        duration_sec,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fight::CombatSample;

    fn detail_with_aggs() -> FightDetail {
        let mut detail = FightDetail { fight_id: 1, ..Default::default() };
        detail.damage_aggs.push(CombatAgg {
            source_unit_id: 5,
            target_unit_id: 7,
            ability_id: 100,
            total: 300.0,
            hits: 3,
            crits: 1,
            active_seconds: 3,
            overheal: 0.0,
        });
        detail.damage_aggs.push(CombatAgg {
            source_unit_id: 5,
            target_unit_id: 7,
            ability_id: 200,
            total: 100.0,
            hits: 2,
            crits: 0,
            active_seconds: 2,
            overheal: 0.0,
        });
        detail
    }

    #[test]
    fn aggregates_sort_descending_and_derive_rates() {
        let detail = detail_with_aggs();
        let rows = projected_aggregates(&detail, &AggregateFilters::default());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].ability_id, 100);
        assert_eq!(rows[0].dps, 100.0);
        assert_eq!(rows[0].average, 100.0);
        assert!((rows[0].crit_pct - (1.0 / 3.0)).abs() < 1e-9);
        assert!((rows[0].percent - 0.75).abs() < 1e-9);
    }

    #[test]
    fn active_seconds_are_summed_across_source_target_pairs() {
        let mut detail = FightDetail { fight_id: 1, ..Default::default() };
        detail.damage_aggs.push(CombatAgg {
            source_unit_id: 5,
            target_unit_id: 7,
            ability_id: 100,
            total: 300.0,
            hits: 3,
            crits: 1,
            active_seconds: 3,
            overheal: 0.0,
        });
        detail.damage_aggs.push(CombatAgg {
            source_unit_id: 9,
            target_unit_id: 11,
            ability_id: 100,
            total: 100.0,
            hits: 1,
            crits: 0,
            active_seconds: 1,
            overheal: 0.0,
        });
        let rows = projected_aggregates(&detail, &AggregateFilters::default());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].active_seconds, 4);
        assert_eq!(rows[0].total, 400.0);
        assert_eq!(rows[0].dps, 100.0);
    }

    #[test]
    fn ability_ids_are_sorted_and_deduplicated() {
        let detail = detail_with_aggs();
        assert_eq!(ability_ids(&detail, &AggregateFilters::default()), vec![100, 200]);
    }

    #[test]
    fn series_falls_back_to_dense_points_without_samples_or_filters() {
        let mut detail = FightDetail::default();
        detail.series.push(FightSeriesPoint { second: 0, damage: 50.0, heal: 10.0 });
        let damage_only = projected_series(&detail, &AggregateFilters::default());
        assert_eq!(damage_only[0].damage, 50.0);
        assert_eq!(damage_only[0].heal, 0.0);

        let heals = AggregateFilters { heals: true, ..Default::default() };
        let heal_only = projected_series(&detail, &heals);
        assert_eq!(heal_only[0].damage, 0.0);
        assert_eq!(heal_only[0].heal, 10.0);
    }

    #[test]
    fn series_buckets_raw_samples_when_present() {
        let mut detail = FightDetail::default();
        detail.raw.combat_samples.push(CombatSample {
            rel_ms: 500,
            source_unit_id: 5,
            target_unit_id: 7,
            ability_id: 100,
            damage: 40.0,
            heal: 0.0,
            overheal: 0.0,
            is_crit: false,
            result: "GENERALIZED".to_string(),
        });
        detail.raw.combat_samples.push(CombatSample {
            rel_ms: 1500,
            source_unit_id: 9,
            target_unit_id: 7,
            ability_id: 100,
            damage: 20.0,
            heal: 0.0,
            overheal: 0.0,
            is_crit: false,
            result: "GENERALIZED".to_string(),
        });

        let filters = AggregateFilters { source_unit_id: Some(5), ..Default::default() };
        let points = projected_series(&detail, &filters);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].second, 0);
        assert_eq!(points[0].damage, 40.0);
    }

    #[test]
    fn range_stats_is_additive_and_null_when_empty() {
        let mut detail = FightDetail::default();
        detail.series.push(FightSeriesPoint { second: 0, damage: 10.0, heal: 0.0 });
        detail.series.push(FightSeriesPoint { second: 1, damage: 20.0, heal: 0.0 });
        detail.series.push(FightSeriesPoint { second: 2, damage: 30.0, heal: 0.0 });

        let stats = range_stats(&detail, 0, 2000).unwrap();
        assert_eq!(stats.damage, 30.0);
        assert_eq!(stats.dps, 15.0);

        assert!(range_stats(&detail, 1000, 1000).is_none());
        assert!(range_stats(&detail, 2000, 1000).is_none());
    }
}
