use std::time::Duration;

use clap::Parser;
use nightfall::{DEFAULT_PORT, NightfallServer, ServerConfig, ServerError};
use nightfall_room::RoomConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nightfall")]
#[command(about = "Nightfall party-game server")]
struct Args {
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    #[arg(long, default_value_t = 250, help = "Phase timer interval in ms")]
    tick_ms: u64,

    #[arg(short, long, default_value_t = 16)]
    max_players: usize,
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = ServerConfig {
        bind_addr: format!("{}:{}", args.bind, args.port),
        room: RoomConfig {
            tick_interval: Duration::from_millis(args.tick_ms),
            max_players: args.max_players,
            ..RoomConfig::default()
        },
    };
    tracing::info!(addr = %config.bind_addr, "starting");

    let server = NightfallServer::builder().config(config).build().await?;
    server.run().await
}
