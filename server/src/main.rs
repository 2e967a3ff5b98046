use clap::Parser;
use log::info;
use server::config::{self, GameConfig, ServerConfig};
use server::network::{BoxError, Server};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Authoritative server for the tag platformer")]
struct Args {
    /// Address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// UDP port to listen on
    #[arg(short, long, default_value_t = 5000)]
    port: u16,
    /// Simulation ticks per second
    #[arg(short, long, default_value_t = config::DEFAULT_TICK_RATE)]
    tick_rate: u32,
    /// Maximum number of connected clients
    #[arg(short, long, default_value_t = config::DEFAULT_MAX_CLIENTS)]
    max_clients: usize,
    /// Delay between a win and the session restart, in milliseconds
    #[arg(long, default_value_t = 3000)]
    restart_delay_ms: u64,
    /// Seconds of silence before a client is dropped
    #[arg(long, default_value_t = 5)]
    client_timeout_secs: u64,
    /// Fixed RNG seed for reproducible games
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let server_config = ServerConfig {
        bind_addr: format!("{}:{}", args.host, args.port),
        max_clients: args.max_clients,
        client_timeout: Duration::from_secs(args.client_timeout_secs),
    };
    let game_config = GameConfig {
        tick_period: config::tick_period(args.tick_rate),
        restart_delay: Duration::from_millis(args.restart_delay_ms),
        seed: args.seed,
    };

    info!(
        "Starting server on {} at {} Hz (max {} clients)",
        server_config.bind_addr, args.tick_rate, server_config.max_clients
    );

    let mut server = Server::new(server_config, game_config).await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
    }

    Ok(())
}
