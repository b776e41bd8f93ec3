//! Drone Delivery Fleet Simulator CLI
//!
//! Runs the Dublin reference fleet until Ctrl+C or a tick limit.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use fleet_domain::DroneId;
use fleet_simulator::{FanOut, SimConfig, Simulation, TracingSink};
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "fleet-simulator")]
#[command(about = "Simulate a multi-hub delivery drone fleet")]
struct Args {
    /// Tick interval in milliseconds
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Drones stationed at each hub at start
    #[arg(short, long)]
    drones_per_hub: Option<usize>,

    /// RNG seed for a reproducible run
    #[arg(short, long)]
    seed: Option<u64>,

    /// Stop after this many ticks
    #[arg(long)]
    max_ticks: Option<u64>,

    /// Drone whose ETA is logged with each fleet summary
    #[arg(short, long, default_value = "FP-G0-100")]
    watch: String,

    /// Emit logs as JSON
    #[arg(long, env = "FLEET_LOG_JSON")]
    json: bool,

    /// Print the final fleet snapshot as JSON on exit
    #[arg(long)]
    dump_snapshot: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let mut config = SimConfig::from_env();
    apply_overrides(&mut config, &args);
    config.validate()?;

    init_tracing(&config.log_level, args.json)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting drone delivery fleet simulator"
    );

    let sink = Arc::new(FanOut::new().with(TracingSink));
    let simulation = Simulation::dublin(&config, sink)?.watch(DroneId::new(args.watch.clone()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let snapshot = simulation.run(shutdown_rx).await?;

    if args.dump_snapshot {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }

    Ok(())
}

fn apply_overrides(config: &mut SimConfig, args: &Args) {
    if let Some(tick_ms) = args.tick_ms {
        config.driver.tick_ms = tick_ms;
    }
    if let Some(per_hub) = args.drones_per_hub {
        config.driver.drones_per_hub = per_hub;
    }
    if args.seed.is_some() {
        config.driver.seed = args.seed;
    }
    if args.max_ticks.is_some() {
        config.driver.max_ticks = args.max_ticks;
    }
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(format!("fleet_simulator={log_level},fleet_domain={log_level}"))
    })?;

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        }
    }
}
