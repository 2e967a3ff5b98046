//! Server network layer handling UDP communications and session timing

use crate::client_manager::ClientManager;
use crate::config::{GameConfig, ServerConfig};
use crate::registry::{Outgoing, Registry};
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{ConnectionId, Packet, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, MissedTickBehavior};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Wall time fed to the registry per loop iteration is capped at this, so a
/// stalled process does not replay seconds of ticks at once.
pub const MAX_FRAME_ELAPSED: Duration = Duration::from_millis(250);

const RECV_BUFFER_SIZE: usize = 2048;

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { packet: Packet, addr: SocketAddr },
    ClientTimeout { client_id: ConnectionId },
}

/// Messages sent from the main loop to the sender task
#[derive(Debug)]
pub enum GameMessage {
    SendPacket {
        packet: Packet,
        addr: SocketAddr,
    },
    /// Delivers one packet to each listed connection that is still known
    Multicast {
        packet: Packet,
        recipients: Vec<ConnectionId>,
    },
}

/// Main server coordinating networking and the session registry
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    registry: Registry,
    tick_period: Duration,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
}

impl Server {
    pub async fn new(config: ServerConfig, game: GameConfig) -> Result<Self, BoxError> {
        let socket = Arc::new(UdpSocket::bind(&config.bind_addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::new(
                config.max_clients,
                config.client_timeout,
            ))),
            tick_period: game.tick_period,
            registry: Registry::new(game),
            server_tx,
            server_rx,
            game_tx,
            game_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Spawns task that continuously listens for incoming packets
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; RECV_BUFFER_SIZE];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => match deserialize::<Packet>(&buffer[..len]) {
                        Ok(packet) => {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        }
                        Err(e) => warn!("Failed to deserialize packet from {}: {}", addr, e),
                    },
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes outgoing packet queue
    fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);
        let mut game_rx = std::mem::replace(&mut self.game_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::Multicast { packet, recipients } => {
                        let addrs: Vec<(ConnectionId, SocketAddr)> = {
                            let clients_guard = clients.read().await;
                            recipients
                                .iter()
                                .filter_map(|id| clients_guard.addr_of(*id).map(|a| (*id, a)))
                                .collect()
                        };

                        for (client_id, addr) in addrs {
                            if let Err(e) = send_packet_impl(&socket, &packet, addr).await {
                                error!("Failed to send to client {}: {}", client_id, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns task that monitors client timeouts
    fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut clients_guard = clients.write().await;
                    clients_guard.check_timeouts()
                };

                for client_id in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::ClientTimeout { client_id }) {
                        error!("Failed to send timeout message: {}", e);
                        return;
                    }
                }
            }
        });
    }

    fn send_packet(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket { packet, addr }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    fn multicast(&self, packet: Packet, recipients: Vec<ConnectionId>) {
        if recipients.is_empty() {
            return;
        }
        if let Err(e) = self.game_tx.send(GameMessage::Multicast { packet, recipients }) {
            error!("Failed to queue multicast packet: {}", e);
        }
    }

    /// Turns registry output into packets.
    fn dispatch(&self, outgoing: Vec<Outgoing>) {
        for message in outgoing {
            match message {
                Outgoing::NewGame {
                    connection,
                    session,
                } => self.multicast(
                    Packet::NewGame {
                        client_id: connection,
                        session_id: session,
                    },
                    vec![connection],
                ),
                Outgoing::State {
                    recipients,
                    snapshot,
                    ..
                } => self.multicast(Packet::State(snapshot), recipients),
            }
        }
    }

    /// Processes one incoming packet
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        if let Packet::NewPlayer { client_version } = packet {
            self.handle_new_player(client_version, addr).await;
            return;
        }

        let client_id = {
            let mut clients = self.clients.write().await;
            clients.touch(addr)
        };
        let Some(client_id) = client_id else {
            debug!("Ignoring {:?} from unknown address {}", packet, addr);
            return;
        };

        match packet {
            Packet::Start => {
                self.registry.start(client_id);
            }
            Packet::Join => {
                if let Some(outgoing) = self.registry.rejoin(client_id) {
                    self.dispatch(vec![outgoing]);
                }
            }
            Packet::Movement(input) => {
                self.registry.movement(client_id, &input);
            }
            Packet::Disconnect => {
                let mut clients = self.clients.write().await;
                clients.remove_client(&client_id);
                self.registry.leave(client_id);
            }
            other => {
                warn!("Unexpected packet {:?} from client {}", other, client_id);
            }
        }
    }

    async fn handle_new_player(&mut self, client_version: u32, addr: SocketAddr) {
        info!(
            "Client connecting from {} (version: {})",
            addr, client_version
        );

        if client_version != PROTOCOL_VERSION {
            self.send_packet(
                Packet::Disconnected {
                    reason: "Protocol version mismatch".to_string(),
                },
                addr,
            );
            return;
        }

        // A second hello from the same address starts over.
        let client_id = {
            let mut clients = self.clients.write().await;
            if let Some(existing_id) = clients.find_client_by_addr(addr) {
                info!("Removing existing client {} from {}", existing_id, addr);
                clients.remove_client(&existing_id);
                self.registry.leave(existing_id);
            }
            clients.add_client(addr)
        };

        match client_id {
            Some(client_id) => {
                let outgoing = self.registry.join(client_id);
                self.dispatch(vec![outgoing]);
            }
            None => self.send_packet(
                Packet::Disconnected {
                    reason: "Server full".to_string(),
                },
                addr,
            ),
        }
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), BoxError> {
        self.spawn_network_receiver();
        self.spawn_network_sender();
        self.spawn_timeout_checker();

        let mut tick_interval = interval(self.tick_period);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_tick = Instant::now();

        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        }
                        Some(ServerMessage::ClientTimeout { client_id }) => {
                            info!("Client {} timed out", client_id);
                            self.registry.leave(client_id);
                        }
                        None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                }

                _ = tick_interval.tick() => {
                    let now = Instant::now();
                    let mut elapsed = now.duration_since(last_tick);
                    last_tick = now;

                    if elapsed > MAX_FRAME_ELAPSED {
                        warn!("Large frame time detected ({:?}), capping to {:?}", elapsed, MAX_FRAME_ELAPSED);
                        elapsed = MAX_FRAME_ELAPSED;
                    }

                    let outgoing = self.registry.advance(elapsed);
                    self.dispatch(outgoing);
                }
            }
        }

        Ok(())
    }
}

async fn send_packet_impl(
    socket: &UdpSocket,
    packet: &Packet,
    addr: SocketAddr,
) -> Result<(), BoxError> {
    let data = serialize(packet)?;
    socket.send_to(&data, addr).await?;
    Ok(())
}
