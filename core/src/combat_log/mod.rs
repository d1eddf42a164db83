//! Tokenising, framing and parsing of raw combat log records.

mod error;
mod event;
mod framer;
mod reader;
mod tokenizer;
mod unit_block;

pub use error::ReaderError;
pub use event::{
    AbilityInfo, BeginCast, BeginLog, BeginTrial, CombatEvent, EffectChangeType, EffectChanged,
    EffectInfo, EndCast, EndTrial, EntityType, Event, HealthRegen, MapChanged, PlayerInfo,
    ResourceKind, TrialInit, UnitAdded, UnitChanged, UnitRemoved, ZoneChanged, parse_record,
};
pub use framer::{Framed, frame_line};
pub use reader::read_log_file;
pub use tokenizer::{split_fields, split_fields_bracketed};
pub use unit_block::{Pool, UnitBlock, parse_unit_block};
