//! The combat-level ("fight") state machine and its owned aggregates.

mod builder;
mod model;

pub use builder::FightBuilder;
pub use model::{
    CastEntry, CombatAgg, CombatSample, Death, EffectChangedEvent, EffectUptime,
    EffectUptimeKey, FightDetail, FightSeriesPoint, FightSummary, HealthRegenEvent,
    ORPHAN_CASTER_SENTINEL, RawCounters, ResourceEvent, ResourceSample, UnitTotals,
};
