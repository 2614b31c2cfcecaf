use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::time::{Duration, MissedTickBehavior, interval};
use tracing::info;
use tracing_subscriber::EnvFilter;

use arcade_drive::config::ServerConfig;
use arcade_drive::net;
use arcade_drive::state::SharedGameState;
use arcade_drive::world::PhysicsWorld;

#[derive(Parser)]
#[command(name = "arcade-drive-server")]
#[command(about = "Top-down arcade car physics over websockets")]
struct Cli {
    /// TOML config file; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen address
    #[arg(short, long)]
    bind: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(cli: &Cli) -> Result<ServerConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            ServerConfig::from_toml_str(&text)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => ServerConfig::default(),
    };
    if let Some(bind) = &cli.bind {
        config.bind = bind.clone();
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose { EnvFilter::new("debug") } else { EnvFilter::new("info") }
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = load_config(&cli)?;
    let dt = config.tick_dt();

    let world = PhysicsWorld::from_config(&config).context("building vehicle models")?;
    let physics = Arc::new(Mutex::new(world));
    let state = Arc::new(Mutex::new(SharedGameState::new(config.max_vehicles)));

    let listener = TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    tokio::spawn(net::serve(listener, Arc::clone(&state), config.default_model));

    info!(tick_hz = config.tick_hz, model = %config.default_model, "starting arcade drive server");

    // Fixed timestep
    let mut ticker = interval(Duration::from_secs_f32(dt));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let mut phys = physics.lock().await;
        let mut game = state.lock().await;

        // Spawn/despawn to match connections, forward latest inputs
        phys.apply_entities(&game.entities);

        // Step models + rigid bodies
        phys.step(dt);

        // Advance tick + broadcast snapshot
        game.tick += 1;
        let snapshot = phys.snapshot();
        game.broadcast_snapshot(&snapshot);
    }
}
