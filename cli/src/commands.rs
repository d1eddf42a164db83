//! One function per subcommand; each prints a plain-text summary and
//! returns `Err` on failure so `main` can log and exit non-zero.

use std::path::Path;

use esolog_core::query::AbilityAggregate;
use esolog_core::AggregateFilters;

use crate::CliContext;

pub fn import(ctx: &mut CliContext, path: &Path) -> Result<(), String> {
    let summaries = ctx.engine.import_log(path).map_err(|e| e.to_string())?;
    for summary in &summaries {
        println!(
            "{}  session {}  {} fight(s)  {}",
            summary.title,
            summary.session_id,
            summary.fight_count,
            summary.store_path.display()
        );
    }
    Ok(())
}

pub fn sessions(ctx: &CliContext) -> Result<(), String> {
    for summary in ctx.engine.list_sessions() {
        let name = summary.display_name.as_deref().unwrap_or(&summary.title);
        println!(
            "{:>6}  {:<10}  {} fight(s)  {}",
            summary.session_id, name, summary.fight_count, summary.unix_start_ms
        );
    }
    Ok(())
}

pub fn fight(ctx: &CliContext, fight_id: u64) -> Result<(), String> {
    let summary = ctx.engine.get_fight(fight_id).map_err(|e| e.to_string())?;
    println!("{}  {} ({})", summary.title, summary.zone_name, summary.difficulty);
    println!(
        "start={}ms end={}ms hard_mode={}",
        summary.start_rel_ms, summary.end_rel_ms, summary.is_hard_mode
    );
    if !summary.boss_names.is_empty() {
        println!("bosses: {}", summary.boss_names.join(", "));
    }
    Ok(())
}

fn print_aggregate_rows(rows: &[AbilityAggregate]) {
    println!(
        "{:>10}  {:>12}  {:>6}  {:>6}  {:>8}  {:>8}  {:>8}  {:>7}",
        "ability", "total", "hits", "crits", "dps", "avg", "crit%", "pct"
    );
    for row in rows {
        println!(
            "{:>10}  {:>12.1}  {:>6}  {:>6}  {:>8.1}  {:>8.1}  {:>7.1}%  {:>6.1}%",
            row.ability_id,
            row.total,
            row.hits,
            row.crits,
            row.dps,
            row.average,
            row.crit_pct * 100.0,
            row.percent * 100.0,
        );
    }
}

pub fn aggregates(
    ctx: &CliContext,
    fight_id: u64,
    source_unit_id: Option<i64>,
    target_unit_id: Option<i64>,
    heals: bool,
) -> Result<(), String> {
    let filters = AggregateFilters { source_unit_id, target_unit_id, heals };
    let rows = ctx.engine.get_aggregates(fight_id, &filters).map_err(|e| e.to_string())?;
    print_aggregate_rows(&rows);
    Ok(())
}

pub fn series(
    ctx: &CliContext,
    fight_id: u64,
    source_unit_id: Option<i64>,
    target_unit_id: Option<i64>,
    heals: bool,
) -> Result<(), String> {
    let filters = AggregateFilters { source_unit_id, target_unit_id, heals };
    let points = ctx.engine.get_series(fight_id, &filters).map_err(|e| e.to_string())?;
    for point in points {
        println!("{:>6}s  damage={:<10.1}  heal={:<10.1}", point.second, point.damage, point.heal);
    }
    Ok(())
}

pub fn range(ctx: &CliContext, fight_id: u64, from_ms: u64, to_ms: u64) -> Result<(), String> {
    match ctx.engine.get_range(fight_id, from_ms, to_ms).map_err(|e| e.to_string())? {
        Some(stats) => println!(
            "damage={:.1} heal={:.1} dps={:.1} hps={:.1} duration={:.3}s",
            stats.damage, stats.heal, stats.dps, stats.hps, stats.duration_sec
        ),
        None => println!("(empty range)"),
    }
    Ok(())
}

pub fn stores(ctx: &CliContext) -> Result<(), String> {
    for path in ctx.engine.list_log_stores() {
        println!("{}", path.display());
    }
    Ok(())
}

pub fn rename_legacy(ctx: &mut CliContext) -> Result<(), String> {
    let renamed = ctx.engine.rename_legacy_stores().map_err(|e| e.to_string())?;
    if renamed.is_empty() {
        println!("no legacy stores found");
    }
    for (from, to) in renamed {
        println!("{} -> {}", from.display(), to.display());
    }
    Ok(())
}
