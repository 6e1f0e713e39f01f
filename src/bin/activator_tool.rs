use activator::{
    Activator, ActivatorConfig, Activity, ActivitySchema, InMemoryStore, ModelSchema, SchemaRegistry,
    SnapshotManager, StoreConfig,
};
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "activator-tool")]
#[command(about = "Replay activity logs into entity state")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Activate a JSON array of activities against a set of schemas.
    Replay {
        #[arg(long)]
        schemas: PathBuf,
        #[arg(long)]
        activities: PathBuf,
        /// Start from this snapshot when it exists and write the result back.
        #[arg(long)]
        snapshot: Option<PathBuf>,
        #[arg(long)]
        actor: Option<String>,
        /// Key the activity log is printed under.
        #[arg(long, default_value = "activity")]
        activity_table: String,
        #[arg(long)]
        no_relationship_resolution: bool,
    },
    /// Print the tables and activity log held in a snapshot.
    Inspect {
        #[arg(long)]
        snapshot: PathBuf,
        #[arg(long)]
        activities: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Replay {
            schemas,
            activities,
            snapshot,
            actor,
            activity_table,
            no_relationship_resolution,
        } => {
            let config = ActivatorConfig::new().resolve_relationship_identifiers(!no_relationship_resolution);
            replay(
                &schemas,
                &activities,
                snapshot.as_deref(),
                actor.as_deref(),
                &activity_table,
                config,
            )
        }
        Command::Inspect {
            snapshot,
            activities,
        } => inspect(&snapshot, activities),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).with_context(|| format!("Failed to read '{}'", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse '{}'", path.display()))
}

fn open_store(schemas: &Path, snapshot: Option<&Path>, actor: Option<&str>) -> Result<InMemoryStore> {
    let mut store_config = StoreConfig::new();
    if let Some(actor) = actor {
        store_config = store_config.actor(actor);
    }

    if let Some(path) = snapshot {
        let manager = SnapshotManager::new(path);
        if manager.exists() {
            let snapshot = manager
                .load()
                .with_context(|| format!("Failed to load snapshot '{}'", path.display()))?;
            tracing::info!(path = %path.display(), "restoring store from snapshot");
            return Ok(InMemoryStore::restore(snapshot, store_config)?);
        }
    }

    let definitions: Vec<ModelSchema> = read_json(schemas)?;
    let mut registry = SchemaRegistry::new();
    for schema in definitions {
        registry.register(schema)?;
    }
    Ok(InMemoryStore::with_config(registry, store_config))
}

fn replay(
    schemas: &Path,
    activities: &Path,
    snapshot: Option<&Path>,
    actor: Option<&str>,
    activity_table: &str,
    config: ActivatorConfig,
) -> Result<()> {
    let store = open_store(schemas, snapshot, actor)?;
    if store.registry().table_exists(activity_table) {
        bail!("Activity table '{}' collides with an entity table", activity_table);
    }
    let activator = Activator::new(store, ActivitySchema::new(activity_table)).with_config(config);

    let mut batch: Vec<Activity> = read_json(activities)?;
    activator.activate(&mut batch).context("Activation failed")?;

    let output = activator.export_json()?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    if let Some(path) = snapshot {
        SnapshotManager::new(path)
            .save(&activator.store().snapshot()?)
            .with_context(|| format!("Failed to write snapshot '{}'", path.display()))?;
        eprintln!("Snapshot written to {}", path.display());
    }
    Ok(())
}

fn inspect(path: &Path, with_activities: bool) -> Result<()> {
    let snapshot = SnapshotManager::new(path)
        .load()
        .with_context(|| format!("Failed to load snapshot '{}'", path.display()))?;

    println!(
        "Snapshot v{} taken {}: {} tables, {} rows, {} activities",
        snapshot.version,
        snapshot.metadata.created_at.to_rfc3339(),
        snapshot.metadata.table_count,
        snapshot.metadata.row_count,
        snapshot.metadata.activity_count
    );

    let mut tables: Vec<_> = snapshot.tables.iter().collect();
    tables.sort_by(|a, b| a.0.cmp(b.0));
    for (name, table) in tables {
        println!("  {:<24} {:>8} rows", name, table.row_count());
    }

    if with_activities {
        println!("{}", serde_json::to_string_pretty(snapshot.activities.records())?);
    }
    Ok(())
}
