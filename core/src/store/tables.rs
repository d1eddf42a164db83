//! Arrow schemas and row conversions for the five logical tables persisted
//! per log: `log_meta`, `sessions`, `fights`, `fight_details`, `fight_series`.
//!
//! Tables with a natural flat shape (`fights`, `fight_series`) get real
//! typed columns. Tables whose rows are deeply nested (`sessions`,
//! `fight_details`) carry a handful of indexed columns for filtering plus a
//! `blob` column holding the full row serialised as JSON, the same
//! denormalise-for-filtering-but-keep-the-source-of-truth split the writer
//! previously used to keep encounter metadata alongside raw event rows.

use std::sync::Arc;

use arrow::array::{
    Array, BooleanArray, Float64Array, StringArray, UInt32Array, UInt64Array,
};
use arrow::array::{
    BooleanBuilder, Float64Builder, StringBuilder, UInt32Builder, UInt64Builder,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use hashbrown::HashMap;

use crate::fight::{FightDetail, FightSummary};
use crate::session::Session;
use crate::store::error::StoreError;

pub const FORMAT_VERSION: u32 = 1;

// ─── log_meta ──────────────────────────────────────────────────────────────

pub struct LogMetaRow {
    pub source_file_name: String,
    pub imported_at_unix_ms: i64,
    pub session_count: u32,
    pub format_version: u32,
}

pub fn log_meta_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("source_file_name", DataType::Utf8, false),
        Field::new("imported_at_unix_ms", DataType::Int64, false),
        Field::new("session_count", DataType::UInt32, false),
        Field::new("format_version", DataType::UInt32, false),
    ]))
}

pub fn log_meta_to_batch(row: &LogMetaRow) -> Result<RecordBatch, StoreError> {
    let schema = log_meta_schema();
    let columns: Vec<arrow::array::ArrayRef> = vec![
        Arc::new(StringArray::from(vec![row.source_file_name.clone()])),
        Arc::new(arrow::array::Int64Array::from(vec![
            row.imported_at_unix_ms,
        ])),
        Arc::new(UInt32Array::from(vec![row.session_count])),
        Arc::new(UInt32Array::from(vec![row.format_version])),
    ];
    Ok(RecordBatch::try_new(schema, columns)?)
}

// ─── sessions ──────────────────────────────────────────────────────────────

pub fn sessions_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::UInt64, false),
        Field::new("title", DataType::Utf8, false),
        Field::new("unix_start_ms", DataType::Int64, false),
        Field::new("server", DataType::Utf8, false),
        Field::new("fight_count", DataType::UInt32, false),
        Field::new("display_name", DataType::Utf8, true),
        Field::new("blob", DataType::Utf8, false),
    ]))
}

pub fn sessions_to_batch(sessions: &[Session]) -> Result<RecordBatch, StoreError> {
    let schema = sessions_schema();
    let len = sessions.len();
    let mut id = UInt64Builder::with_capacity(len);
    let mut title = StringBuilder::new();
    let mut unix_start_ms = arrow::array::Int64Builder::with_capacity(len);
    let mut server = StringBuilder::new();
    let mut fight_count = UInt32Builder::with_capacity(len);
    let mut display_name = StringBuilder::new();
    let mut blob = StringBuilder::new();

    for s in sessions {
        id.append_value(s.id);
        title.append_value(&s.title);
        unix_start_ms.append_value(s.unix_start_ms);
        server.append_value(&s.server);
        fight_count.append_value(s.fight_count() as u32);
        display_name.append_option(s.display_name.as_deref());
        blob.append_value(serde_json::to_string(s)?);
    }

    let columns: Vec<arrow::array::ArrayRef> = vec![
        Arc::new(id.finish()),
        Arc::new(title.finish()),
        Arc::new(unix_start_ms.finish()),
        Arc::new(server.finish()),
        Arc::new(fight_count.finish()),
        Arc::new(display_name.finish()),
        Arc::new(blob.finish()),
    ];
    Ok(RecordBatch::try_new(schema, columns)?)
}

pub fn sessions_from_batch(batch: &RecordBatch) -> Result<Vec<Session>, StoreError> {
    let blob = downcast_utf8(batch, "blob")?;
    (0..batch.num_rows())
        .map(|i| Ok(serde_json::from_str(blob.value(i))?))
        .collect()
}

// ─── fights ────────────────────────────────────────────────────────────────

pub fn fights_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("fight_id", DataType::UInt64, false),
        Field::new("session_id", DataType::UInt64, false),
        Field::new("zone_segment_id", DataType::UInt32, false),
        Field::new("start_rel_ms", DataType::UInt64, false),
        Field::new("end_rel_ms", DataType::UInt64, false),
        Field::new("title", DataType::Utf8, false),
        Field::new("zone_name", DataType::Utf8, false),
        Field::new("difficulty", DataType::Utf8, false),
        Field::new("map_name", DataType::Utf8, true),
        Field::new("map_key", DataType::Utf8, true),
        Field::new("is_hard_mode", DataType::Boolean, false),
        Field::new("boss_unit_ids", DataType::Utf8, false),
        Field::new("boss_names", DataType::Utf8, false),
    ]))
}

pub fn fights_to_batch(fights: &[FightSummary]) -> Result<RecordBatch, StoreError> {
    let schema = fights_schema();
    let len = fights.len();
    let mut fight_id = UInt64Builder::with_capacity(len);
    let mut session_id = UInt64Builder::with_capacity(len);
    let mut zone_segment_id = UInt32Builder::with_capacity(len);
    let mut start_rel_ms = UInt64Builder::with_capacity(len);
    let mut end_rel_ms = UInt64Builder::with_capacity(len);
    let mut title = StringBuilder::new();
    let mut zone_name = StringBuilder::new();
    let mut difficulty = StringBuilder::new();
    let mut map_name = StringBuilder::new();
    let mut map_key = StringBuilder::new();
    let mut is_hard_mode = BooleanBuilder::with_capacity(len);
    let mut boss_unit_ids = StringBuilder::new();
    let mut boss_names = StringBuilder::new();

    for f in fights {
        fight_id.append_value(f.id);
        session_id.append_value(f.session_id);
        zone_segment_id.append_value(f.zone_segment_id);
        start_rel_ms.append_value(f.start_rel_ms);
        end_rel_ms.append_value(f.end_rel_ms);
        title.append_value(&f.title);
        zone_name.append_value(&f.zone_name);
        difficulty.append_value(&f.difficulty);
        map_name.append_option(f.map_name.as_deref());
        map_key.append_option(f.map_key.as_deref());
        is_hard_mode.append_value(f.is_hard_mode);
        boss_unit_ids.append_value(serde_json::to_string(&f.boss_unit_ids)?);
        boss_names.append_value(serde_json::to_string(&f.boss_names)?);
    }

    let columns: Vec<arrow::array::ArrayRef> = vec![
        Arc::new(fight_id.finish()),
        Arc::new(session_id.finish()),
        Arc::new(zone_segment_id.finish()),
        Arc::new(start_rel_ms.finish()),
        Arc::new(end_rel_ms.finish()),
        Arc::new(title.finish()),
        Arc::new(zone_name.finish()),
        Arc::new(difficulty.finish()),
        Arc::new(map_name.finish()),
        Arc::new(map_key.finish()),
        Arc::new(is_hard_mode.finish()),
        Arc::new(boss_unit_ids.finish()),
        Arc::new(boss_names.finish()),
    ];
    Ok(RecordBatch::try_new(schema, columns)?)
}

pub fn fights_from_batch(batch: &RecordBatch) -> Result<Vec<FightSummary>, StoreError> {
    let fight_id = downcast_u64(batch, "fight_id")?;
    let session_id = downcast_u64(batch, "session_id")?;
    let zone_segment_id = downcast_u32(batch, "zone_segment_id")?;
    let start_rel_ms = downcast_u64(batch, "start_rel_ms")?;
    let end_rel_ms = downcast_u64(batch, "end_rel_ms")?;
    let title = downcast_utf8(batch, "title")?;
    let zone_name = downcast_utf8(batch, "zone_name")?;
    let difficulty = downcast_utf8(batch, "difficulty")?;
    let map_name = downcast_utf8(batch, "map_name")?;
    let map_key = downcast_utf8(batch, "map_key")?;
    let is_hard_mode = downcast_bool(batch, "is_hard_mode")?;
    let boss_unit_ids = downcast_utf8(batch, "boss_unit_ids")?;
    let boss_names = downcast_utf8(batch, "boss_names")?;

    (0..batch.num_rows())
        .map(|i| {
            Ok(FightSummary {
                id: fight_id.value(i),
                session_id: session_id.value(i),
                zone_segment_id: zone_segment_id.value(i),
                start_rel_ms: start_rel_ms.value(i),
                end_rel_ms: end_rel_ms.value(i),
                title: title.value(i).to_string(),
                zone_name: zone_name.value(i).to_string(),
                difficulty: difficulty.value(i).to_string(),
                map_name: (!map_name.is_null(i)).then(|| map_name.value(i).to_string()),
                map_key: (!map_key.is_null(i)).then(|| map_key.value(i).to_string()),
                is_hard_mode: is_hard_mode.value(i),
                boss_unit_ids: serde_json::from_str(boss_unit_ids.value(i))?,
                boss_names: serde_json::from_str(boss_names.value(i))?,
            })
        })
        .collect()
}

// ─── fight_details ─────────────────────────────────────────────────────────

pub fn fight_details_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("fight_id", DataType::UInt64, false),
        Field::new("session_id", DataType::UInt64, false),
        Field::new("blob", DataType::Utf8, false),
    ]))
}

pub fn fight_details_to_batch(
    rows: &[(u64, u64, &FightDetail)],
) -> Result<RecordBatch, StoreError> {
    let schema = fight_details_schema();
    let len = rows.len();
    let mut fight_id = UInt64Builder::with_capacity(len);
    let mut session_id = UInt64Builder::with_capacity(len);
    let mut blob = StringBuilder::new();

    for (fid, sid, detail) in rows {
        fight_id.append_value(*fid);
        session_id.append_value(*sid);
        blob.append_value(serde_json::to_string(*detail)?);
    }

    let columns: Vec<arrow::array::ArrayRef> = vec![
        Arc::new(fight_id.finish()),
        Arc::new(session_id.finish()),
        Arc::new(blob.finish()),
    ];
    Ok(RecordBatch::try_new(schema, columns)?)
}

pub fn fight_details_from_batch(
    batch: &RecordBatch,
) -> Result<HashMap<u64, FightDetail>, StoreError> {
    let fight_id = downcast_u64(batch, "fight_id")?;
    let blob = downcast_utf8(batch, "blob")?;
    (0..batch.num_rows())
        .map(|i| Ok((fight_id.value(i), serde_json::from_str(blob.value(i))?)))
        .collect()
}

// ─── fight_series ──────────────────────────────────────────────────────────

pub fn fight_series_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("fight_id", DataType::UInt64, false),
        Field::new("second", DataType::UInt64, false),
        Field::new("damage", DataType::Float64, false),
        Field::new("heal", DataType::Float64, false),
    ]))
}

pub fn fight_series_to_batch(
    rows: &[(u64, &crate::fight::FightSeriesPoint)],
) -> Result<RecordBatch, StoreError> {
    let schema = fight_series_schema();
    let len = rows.len();
    let mut fight_id = UInt64Builder::with_capacity(len);
    let mut second = UInt64Builder::with_capacity(len);
    let mut damage = Float64Builder::with_capacity(len);
    let mut heal = Float64Builder::with_capacity(len);

    for (fid, point) in rows {
        fight_id.append_value(*fid);
        second.append_value(point.second);
        damage.append_value(point.damage);
        heal.append_value(point.heal);
    }

    let columns: Vec<arrow::array::ArrayRef> = vec![
        Arc::new(fight_id.finish()),
        Arc::new(second.finish()),
        Arc::new(damage.finish()),
        Arc::new(heal.finish()),
    ];
    Ok(RecordBatch::try_new(schema, columns)?)
}

pub fn fight_series_from_batch(
    batch: &RecordBatch,
) -> Result<Vec<(u64, crate::fight::FightSeriesPoint)>, StoreError> {
    let fight_id = downcast_u64(batch, "fight_id")?;
    let second = downcast_u64(batch, "second")?;
    let damage = downcast_f64(batch, "damage")?;
    let heal = downcast_f64(batch, "heal")?;

    Ok((0..batch.num_rows())
        .map(|i| {
            (
                fight_id.value(i),
                crate::fight::FightSeriesPoint {
                    second: second.value(i),
                    damage: damage.value(i),
                    heal: heal.value(i),
                },
            )
        })
        .collect())
}

// ─── column helpers ─────────────────────────────────────────────────────────

fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a arrow::array::ArrayRef, StoreError> {
    batch
        .schema()
        .index_of(name)
        .map(|idx| batch.column(idx))
        .map_err(StoreError::from)
}

fn downcast_utf8<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray, StoreError> {
    Ok(column(batch, name)?
        .as_any()
        .downcast_ref::<StringArray>()
        .expect("column type mismatch"))
}

fn downcast_u64<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a UInt64Array, StoreError> {
    Ok(column(batch, name)?
        .as_any()
        .downcast_ref::<UInt64Array>()
        .expect("column type mismatch"))
}

fn downcast_u32<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a UInt32Array, StoreError> {
    Ok(column(batch, name)?
        .as_any()
        .downcast_ref::<UInt32Array>()
        .expect("column type mismatch"))
}

fn downcast_bool<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a BooleanArray, StoreError> {
    Ok(column(batch, name)?
        .as_any()
        .downcast_ref::<BooleanArray>()
        .expect("column type mismatch"))
}

fn downcast_f64<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Float64Array, StoreError> {
    Ok(column(batch, name)?
        .as_any()
        .downcast_ref::<Float64Array>()
        .expect("column type mismatch"))
}
