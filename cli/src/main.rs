use std::path::PathBuf;

use clap::{Parser, Subcommand};
use esolog_cli::{CliContext, commands};

#[derive(Parser)]
#[command(name = "esolog", version, about = "Combat log ingestion and query engine")]
struct Cli {
    /// Overrides the configured log-store root for this invocation.
    #[arg(long, global = true)]
    store_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a log file and commit it to the store.
    Import { path: PathBuf },
    /// List every indexed session, newest first.
    Sessions,
    /// Show one fight's summary.
    Fight { fight_id: u64 },
    /// Per-ability damage/heal aggregates for one fight.
    Aggregates {
        fight_id: u64,
        #[arg(long)]
        source_unit_id: Option<i64>,
        #[arg(long)]
        target_unit_id: Option<i64>,
        #[arg(long)]
        heals: bool,
    },
    /// Per-second damage/heal series for one fight.
    Series {
        fight_id: u64,
        #[arg(long)]
        source_unit_id: Option<i64>,
        #[arg(long)]
        target_unit_id: Option<i64>,
        #[arg(long)]
        heals: bool,
    },
    /// Additive damage/heal totals over a millisecond range.
    Range { fight_id: u64, from_ms: u64, to_ms: u64 },
    /// List every committed store directory.
    Stores,
    /// Rename legacy-named store directories to the friendly naming scheme.
    RenameLegacy,
}

fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let mut ctx = match &cli.store_root {
        Some(root) => CliContext::store_root_override(root.clone()),
        None => CliContext::load(),
    }
    .unwrap_or_else(|err| {
        tracing::error!(%err, "failed to open log store");
        std::process::exit(1);
    });

    let result = match &cli.command {
        Commands::Import { path } => commands::import(&mut ctx, path),
        Commands::Sessions => commands::sessions(&ctx),
        Commands::Fight { fight_id } => commands::fight(&ctx, *fight_id),
        Commands::Aggregates { fight_id, source_unit_id, target_unit_id, heals } => {
            commands::aggregates(&ctx, *fight_id, *source_unit_id, *target_unit_id, *heals)
        }
        Commands::Series { fight_id, source_unit_id, target_unit_id, heals } => {
            commands::series(&ctx, *fight_id, *source_unit_id, *target_unit_id, *heals)
        }
        Commands::Range { fight_id, from_ms, to_ms } => commands::range(&ctx, *fight_id, *from_ms, *to_ms),
        Commands::Stores => commands::stores(&ctx),
        Commands::RenameLegacy => commands::rename_legacy(&mut ctx),
    };

    if let Err(err) = result {
        tracing::error!(%err, "command failed");
        std::process::exit(1);
    }
}
