//! The log-level ("session") state machine and its owned data model.

mod builder;
mod model;

pub use builder::SessionBuilder;
pub use model::{
    AbilityDef, EffectDef, MapChange, PlayerInfoSnapshot, Session, SessionDetail, TrialRun,
    UnitInfo, ZoneSegment,
};
