//! Battle server (default binary).
//!
//! Configuration comes from `TETRIS_BATTLE_*` environment variables; flags
//! given on the command line override them.

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tetris_battle::server::{run_server, ServerConfig};

#[derive(Parser)]
#[command(name = "tetris-battle", about = "Server-authoritative Tetris battle rooms")]
struct Cli {
    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Players required before the creator may start
    #[arg(long)]
    min_players: Option<usize>,

    /// Target re-roll period in milliseconds
    #[arg(long)]
    retarget_ms: Option<u64>,

    /// How long to wait for every client to load the game page, in milliseconds
    #[arg(long)]
    start_grace_ms: Option<u64>,
}

impl Cli {
    fn apply(self, mut config: ServerConfig) -> ServerConfig {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(min_players) = self.min_players {
            config.min_players = min_players.max(1);
        }
        if let Some(ms) = self.retarget_ms {
            config.retarget_period = ServerConfig::retarget_from_millis(ms);
        }
        if let Some(ms) = self.start_grace_ms {
            config.start_grace = Duration::from_millis(ms);
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Cli::parse().apply(ServerConfig::from_env());
    tracing::info!(
        host = %config.host,
        port = config.port,
        min_players = config.min_players,
        retarget_ms = config.retarget_period.as_millis() as u64,
        "starting battle server"
    );
    run_server(config, None).await
}
