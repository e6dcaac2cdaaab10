use anyhow::Result;
use clap::{Parser, Subcommand};
use playerdb::{
    init_tracing, AppConfig, BatchOutcome, OutboxPublisher, PlayerStore, Reconciler,
    RowOutcome, SqlitePlayerStore,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about = "Player records: CSV reload and lookups", long_about = None)]
struct Cli {
    /// SQLite database file (overrides PLAYERDB_DATABASE)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reconcile the players table against a CSV snapshot
    Reload {
        /// Snapshot file (overrides PLAYERDB_CSV)
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Print one page of players
    List {
        #[arg(long, default_value_t = 0)]
        page: usize,
        #[arg(long, default_value_t = 10)]
        size: usize,
    },
    /// Print one player
    Show { player_id: String },
    /// Print recent outbox events on a channel
    Events {
        channel: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env()?;
    if let Some(database) = cli.database {
        config.database_path = database;
    }

    match cli.command {
        Command::Reload { csv } => {
            if let Some(csv) = csv {
                config.csv_path = csv;
            }
            run_reload(&config)
        }
        Command::List { page, size } => run_list(&config, page, size),
        Command::Show { player_id } => run_show(&config, &player_id),
        Command::Events { channel, limit } => run_events(&config, &channel, limit),
    }
}

fn run_reload(config: &AppConfig) -> Result<()> {
    println!("🗄️  Reloading players: {} → {}", config.csv_path.display(), config.database_path.display());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let store = SqlitePlayerStore::open(&config.database_path)?;
    let publisher = OutboxPublisher::open(&config.database_path, config.default_channel.clone())?;

    let outcome = Reconciler::new(&store, &publisher)
        .with_rejection_channel(config.rejection_channel.clone())
        .reconcile_csv(&config.csv_path);

    match outcome {
        BatchOutcome::Completed(summary) => {
            println!("✓ {}", summary.summary());
            for outcome in &summary.outcomes {
                if let RowOutcome::Rejected { line, reason, .. } = outcome {
                    println!("  ✗ line {}: {}", line, reason);
                }
            }
            for player_id in &summary.retained_without_update {
                println!("  ⚠️  {} kept with stale values (row rejected)", player_id);
            }
        }
        BatchOutcome::Aborted(reason) => {
            println!("❌ Reload aborted: {}", reason);
        }
    }

    println!("✓ Database contains {} players", store.count()?);
    Ok(())
}

fn run_list(config: &AppConfig, page: usize, size: usize) -> Result<()> {
    let store = SqlitePlayerStore::open(&config.database_path)?;
    let players = store.find_page(page, size)?;

    println!("📊 Page {} (size {}), {} players total", page, size, store.count()?);
    for player in players {
        println!("{:<12} {}", player.player_id, player.display_name());
    }
    Ok(())
}

fn run_show(config: &AppConfig, player_id: &str) -> Result<()> {
    let store = SqlitePlayerStore::open(&config.database_path)?;

    match store.find_by_id(player_id)? {
        Some(player) => println!("{}", serde_json::to_string_pretty(&player)?),
        None => println!("❌ Player {} not found", player_id),
    }
    Ok(())
}

fn run_events(config: &AppConfig, channel: &str, limit: usize) -> Result<()> {
    let publisher = OutboxPublisher::open(&config.database_path, config.default_channel.clone())?;

    println!("📣 {} ({} events)", channel, publisher.count_channel(channel)?);
    for event in publisher.list_channel(channel, limit)? {
        println!("{}  {}", event.published_at.to_rfc3339(), event.payload);
    }
    Ok(())
}
