// crates/ferry-daemon/src/main.rs
//
// Binary entrypoint for the Ferry simulation daemon.
//
// Initializes tracing, parses CLI arguments, loads configuration, deploys a
// canonical chain with its satellites, and runs the cycle scheduler until the
// cycle budget is spent or Ctrl-C arrives.

mod config;
mod deployment;
mod scheduler;

use clap::Parser;
use config::DaemonConfig;
use scheduler::CycleScheduler;

/// Ferry daemon: drives revenue, relay, distribution and settlement cycles.
#[derive(Parser, Debug)]
#[command(name = "ferry-daemon", version = "0.1.0", about = "Ferry protocol simulation daemon")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "~/.ferry/config.toml")]
    config: String,

    /// Number of cycles to run (0 runs until Ctrl-C). Overrides the config file.
    #[arg(long)]
    cycles: Option<u64>,

    /// Write the final network snapshot to this path.
    #[arg(long)]
    snapshot: Option<String>,

    /// RNG seed for reproducible runs.
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config_path = expand_tilde(&args.config);

    let mut daemon_config = match DaemonConfig::load(&config_path) {
        Ok(cfg) => {
            tracing::info!("Loaded configuration from {}", config_path);
            cfg
        }
        Err(e) => {
            tracing::warn!(
                "Could not load config from {}: {}. Using defaults.",
                config_path,
                e
            );
            DaemonConfig::default()
        }
    };

    if let Some(cycles) = args.cycles {
        daemon_config.cycles = cycles;
    }
    if let Some(seed) = args.seed {
        daemon_config.seed = Some(seed);
    }
    if let Some(path) = args.snapshot {
        daemon_config.snapshot_path = Some(path);
    }
    daemon_config.snapshot_path = daemon_config.snapshot_path.as_deref().map(expand_tilde);

    tracing::info!("Ferry Daemon v0.1.0");
    tracing::info!("Canonical chain: {}", daemon_config.canonical_chain_id);
    tracing::info!(
        "Satellites: {:?}",
        daemon_config
            .satellites
            .iter()
            .map(|s| s.chain_id)
            .collect::<Vec<_>>()
    );

    let deployment = deployment::build(&daemon_config)?;
    tracing::info!(
        "Deployed with governance {} and keeper {}",
        deployment.authority,
        deployment.keeper
    );
    let mut scheduler = CycleScheduler::new(daemon_config, deployment);
    scheduler.run().await?;

    let network = scheduler.network();
    tracing::info!(
        "Stopped after {} cycles; governance supply {}, bridged custody {}",
        scheduler.cycle(),
        network.canonical.token.total_supply(),
        network.canonical.bridged_supply()
    );
    Ok(())
}

/// Expand a leading `~/` to the user's home directory.
fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return format!("{}/{}", home.display(), rest);
        }
    }
    path.to_string()
}
