//! Smesher simulator CLI
//!
//! Runs identities through proving cycles on virtual time and prints the
//! ATXs each one published.

use anyhow::Context;
use clap::Parser;
use smesher_simulator::{SimulationRunner, SimulatorConfig};
use smesher_storage::{LocalStore, MemoryLocalStore, RocksLocalStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "smesher-sim")]
#[command(about = "Simulated smeshing network")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of identities (overrides the config file)
    #[arg(long)]
    identities: Option<u32>,

    /// Random seed (overrides the config file)
    #[arg(long)]
    seed: Option<u64>,

    /// Probability of dropping a publish attempt (overrides the config file)
    #[arg(long)]
    loss: Option<f64>,

    /// Simulated time to run (e.g., "10m", "2h")
    #[arg(short, long, default_value = "10m")]
    duration: humantime::Duration,

    /// Keep builder state in RocksDB under this directory instead of memory
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = match &cli.config {
        Some(path) => SimulatorConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => SimulatorConfig::default(),
    };
    if let Some(identities) = cli.identities {
        config = config.with_identities(identities);
    }
    if let Some(seed) = cli.seed {
        config = config.with_seed(seed);
    }
    if let Some(loss) = cli.loss {
        config = config.with_publish_loss_rate(loss);
    }

    let local_store: Arc<dyn LocalStore> = match &cli.data_dir {
        Some(dir) => Arc::new(
            RocksLocalStore::open(dir)
                .with_context(|| format!("opening local store at {}", dir.display()))?,
        ),
        None => Arc::new(MemoryLocalStore::new()),
    };

    // Virtual time: the clock only advances when every task is idle.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .context("building runtime")?;

    let report = runtime.block_on(async {
        let runner = SimulationRunner::new(config, local_store).await?;
        println!(
            "Simulating {} identities for {}...",
            runner.nodes().len(),
            cli.duration
        );
        anyhow::Ok(runner.run_for(*cli.duration).await?)
    })?;
    report.print();
    Ok(())
}
