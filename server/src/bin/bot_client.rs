//! Headless client that joins a session and wanders around at random.
//! Useful for filling a lobby while testing a real client against the server.

use bincode::{deserialize, serialize};
use clap::Parser;
use log::{info, warn};
use rand::Rng;
use shared::{MovementInput, Packet, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{interval, timeout, Instant};

#[derive(Parser, Debug)]
#[command(about = "Random-walk bot for the tag server")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:5000")]
    server: SocketAddr,
    /// How long to play before disconnecting
    #[arg(short, long, default_value_t = 30)]
    duration_secs: u64,
    /// Ask the server to start the session once joined
    #[arg(long)]
    start: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    info!("Bot bound to {}", socket.local_addr()?);

    let hello = Packet::NewPlayer {
        client_version: PROTOCOL_VERSION,
    };
    socket.send_to(&serialize(&hello)?, args.server).await?;

    let mut buf = vec![0u8; 65536];
    let (len, _) = timeout(Duration::from_secs(5), socket.recv_from(&mut buf)).await??;
    let client_id = match deserialize::<Packet>(&buf[..len])? {
        Packet::NewGame {
            client_id,
            session_id,
        } => {
            info!("Joined session {} as connection {}", session_id, client_id);
            client_id
        }
        Packet::Disconnected { reason } => {
            warn!("Server refused connection: {}", reason);
            return Ok(());
        }
        other => {
            warn!("Unexpected first packet: {:?}", other);
            return Ok(());
        }
    };

    if args.start {
        socket.send_to(&serialize(&Packet::Start)?, args.server).await?;
    }

    let mut rng = rand::thread_rng();
    let mut steer = interval(Duration::from_millis(100));
    let deadline = Instant::now() + Duration::from_secs(args.duration_secs);
    let mut states = 0u64;

    while Instant::now() < deadline {
        tokio::select! {
            _ = steer.tick() => {
                let input = MovementInput {
                    up: rng.gen_bool(0.2),
                    down: rng.gen_bool(0.05),
                    left: rng.gen_bool(0.5),
                    right: rng.gen_bool(0.5),
                };
                socket.send_to(&serialize(&Packet::Movement(input))?, args.server).await?;
            }
            received = socket.recv_from(&mut buf) => {
                let (len, _) = received?;
                match deserialize::<Packet>(&buf[..len]) {
                    Ok(Packet::State(snapshot)) => {
                        states += 1;
                        if states % 60 == 0 {
                            let me = snapshot.player_data.get(&client_id);
                            info!(
                                "{} players, it: {:?}, my score: {:?}",
                                snapshot.player_data.len(),
                                snapshot.tagger(),
                                me.map(|p| p.score)
                            );
                        }
                    }
                    Ok(Packet::NewGame { session_id, .. }) => {
                        info!("Moved to session {}", session_id);
                        if args.start {
                            socket.send_to(&serialize(&Packet::Start)?, args.server).await?;
                        }
                    }
                    Ok(other) => warn!("Unexpected packet: {:?}", other),
                    Err(e) => warn!("Failed to deserialize packet: {}", e),
                }
            }
        }
    }

    socket.send_to(&serialize(&Packet::Disconnect)?, args.server).await?;
    info!("Bot finished after {} state updates", states);
    Ok(())
}
