//! Integration tests for the tag server
//!
//! These tests drive the registry through whole games in virtual time and
//! talk to a real server over UDP.

use bincode::{deserialize, serialize};
use server::config::{GameConfig, ServerConfig};
use server::game::SessionPhase;
use server::network::Server;
use server::registry::{Outgoing, Registry};
use shared::{MovementInput, Packet, PlayerColor, StateSnapshot, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

async fn spawn_server(max_clients: usize) -> SocketAddr {
    let config = ServerConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        max_clients,
        ..Default::default()
    };
    let game = GameConfig {
        seed: Some(11),
        ..Default::default()
    };
    let mut server = Server::new(config, game).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = server.run().await;
    });
    addr
}

async fn send(socket: &UdpSocket, packet: &Packet, server: SocketAddr) {
    tokio_test::assert_ok!(socket.send_to(&serialize(packet).unwrap(), server).await);
}

async fn recv(socket: &UdpSocket) -> Packet {
    let mut buf = vec![0u8; 65536];
    let (len, _) = timeout(RECV_TIMEOUT, socket.recv_from(&mut buf))
        .await
        .expect("timed out waiting for packet")
        .unwrap();
    deserialize(&buf[..len]).unwrap()
}

/// Skips packets until one matches.
async fn recv_until<T>(socket: &UdpSocket, mut pick: impl FnMut(Packet) -> Option<T>) -> T {
    for _ in 0..1000 {
        if let Some(found) = pick(recv(socket).await) {
            return found;
        }
    }
    panic!("expected packet never arrived");
}

async fn recv_state(socket: &UdpSocket, accept: impl Fn(&StateSnapshot) -> bool) -> StateSnapshot {
    recv_until(socket, |packet| match packet {
        Packet::State(snapshot) if accept(&snapshot) => Some(snapshot),
        _ => None,
    })
    .await
}

async fn connect(server: SocketAddr) -> (UdpSocket, u32, u32) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    send(
        &socket,
        &Packet::NewPlayer {
            client_version: PROTOCOL_VERSION,
        },
        server,
    )
    .await;
    let (client_id, session_id) = recv_until(&socket, |packet| match packet {
        Packet::NewGame {
            client_id,
            session_id,
        } => Some((client_id, session_id)),
        _ => None,
    })
    .await;
    (socket, client_id, session_id)
}

/// GAME FLOW TESTS (virtual time)
mod game_flow_tests {
    use super::*;

    const TICK: Duration = Duration::from_nanos(16_666_667);

    fn registry() -> Registry {
        Registry::new(GameConfig {
            tick_period: TICK,
            restart_delay: Duration::from_secs(3),
            seed: Some(21),
        })
    }

    /// Plays a two-player game until someone wins, then checks both players
    /// land back in a lobby after the restart delay.
    #[test]
    fn full_game_until_restart() {
        let mut registry = registry();
        registry.join(1);
        registry.join(2);
        assert!(registry.start(1));

        let mut elapsed = Duration::ZERO;
        while !registry.restart_pending(1) {
            registry.advance(TICK);
            elapsed += TICK;
            assert!(elapsed < Duration::from_secs(300), "game never ended");
        }
        // The tagger starts on 60 points and only gains from power-ups.
        assert!(elapsed >= Duration::from_secs(59));

        let session = registry.session(1).unwrap();
        assert_eq!(session.phase(), SessionPhase::Restarting);
        let winners: Vec<_> = session.players().values().filter(|p| p.win).collect();
        assert_eq!(winners.len(), 1);
        assert!(!winners[0].dead);
        assert_eq!(session.players().values().filter(|p| p.dead).count(), 1);

        let outgoing = registry.advance(Duration::from_secs(3));
        let placed: Vec<_> = outgoing
            .iter()
            .filter_map(|message| match message {
                Outgoing::NewGame {
                    connection,
                    session,
                } => Some((*connection, *session)),
                _ => None,
            })
            .collect();
        assert_eq!(placed, vec![(1, 1), (2, 1)]);

        let session = registry.session(1).unwrap();
        assert_eq!(session.phase(), SessionPhase::Lobby);
        assert!(session
            .players()
            .values()
            .all(|p| p.score == 60 && !p.dead && !p.win && !p.status));
    }

    /// Broadcasts during an active game always show at most one tagger.
    #[test]
    fn snapshots_show_single_tagger() {
        let mut registry = registry();
        for id in 1..=4 {
            registry.join(id);
        }
        registry.start(1);

        for frame in 0..600u32 {
            let id = frame % 4 + 1;
            let input = MovementInput {
                up: frame % 7 == 0,
                left: frame % 3 == 0,
                right: frame % 5 == 0,
                down: false,
            };
            registry.movement(id, &input);

            for message in registry.advance(TICK) {
                if let Outgoing::State { snapshot, .. } = message {
                    let red = snapshot
                        .player_data
                        .values()
                        .filter(|p| p.color == PlayerColor::Red && !p.dead)
                        .count();
                    assert_eq!(red, 1, "frame {}", frame);
                }
            }
        }
    }

    /// Sessions are independent: ticking one never touches another.
    #[test]
    fn sessions_run_independently() {
        let mut registry = registry();
        registry.join(1);
        registry.join(2);
        registry.start(1);
        registry.join(3);
        assert_eq!(registry.session_of(3), Some(2));

        let outgoing = registry.advance(TICK * 10);
        let mut per_session = [0usize; 2];
        for message in &outgoing {
            if let Outgoing::State {
                session,
                recipients,
                ..
            } = message
            {
                per_session[*session as usize - 1] += 1;
                let expected = if *session == 1 { vec![1, 2] } else { vec![3] };
                assert_eq!(recipients, &expected);
            }
        }
        assert_eq!(per_session, [10, 10]);
        assert!(registry
            .session(2)
            .unwrap()
            .players()
            .values()
            .all(|p| !p.status));
    }
}

/// CLIENT-SERVER TESTS (real UDP)
mod client_server_tests {
    use super::*;

    #[tokio::test]
    async fn two_clients_join_and_start() {
        let server = spawn_server(8).await;
        let (alice, alice_id, alice_session) = connect(server).await;
        let (bob, bob_id, bob_session) = connect(server).await;

        assert_eq!(alice_id, 1);
        assert_eq!(bob_id, 2);
        assert_eq!(alice_session, 1);
        assert_eq!(bob_session, 1);

        let lobby = recv_state(&bob, |s| s.player_data.len() == 2).await;
        assert_eq!(lobby.tagger(), None);
        assert_eq!(lobby.platform_data.len(), 5);

        send(&alice, &Packet::Start, server).await;
        let active = recv_state(&alice, |s| s.tagger().is_some()).await;
        let red: Vec<_> = active
            .player_data
            .values()
            .filter(|p| p.color == PlayerColor::Red)
            .collect();
        assert_eq!(red.len(), 1);
        assert!(active.player_data.values().all(|p| p.score <= 60));
    }

    #[tokio::test]
    async fn late_joiner_gets_new_session() {
        let server = spawn_server(8).await;
        let (alice, _, _) = connect(server).await;
        let (bob, _, _) = connect(server).await;
        send(&alice, &Packet::Start, server).await;
        recv_state(&bob, |s| s.tagger().is_some()).await;

        let (carol, carol_id, carol_session) = connect(server).await;
        assert_eq!(carol_id, 3);
        assert_eq!(carol_session, 2);
        let state = recv_state(&carol, |_| true).await;
        assert_eq!(state.player_data.keys().copied().collect::<Vec<_>>(), vec![3]);
    }

    #[tokio::test]
    async fn movement_is_reflected_in_state() {
        let server = spawn_server(8).await;
        let (alice, alice_id, _) = connect(server).await;
        let before = recv_state(&alice, |_| true).await.player_data[&alice_id].x;

        let direction = if before < 500.0 {
            MovementInput {
                right: true,
                ..Default::default()
            }
        } else {
            MovementInput {
                left: true,
                ..Default::default()
            }
        };
        send(&alice, &Packet::Movement(direction), server).await;

        recv_state(&alice, |s| (s.player_data[&alice_id].x - before).abs() > 50.0).await;
    }

    #[tokio::test]
    async fn disconnect_removes_player() {
        let server = spawn_server(8).await;
        let (alice, _, _) = connect(server).await;
        let (bob, bob_id, _) = connect(server).await;
        recv_state(&alice, |s| s.player_data.len() == 2).await;

        send(&bob, &Packet::Disconnect, server).await;
        let state = recv_state(&alice, |s| s.player_data.len() == 1).await;
        assert!(!state.player_data.contains_key(&bob_id));
    }

    #[tokio::test]
    async fn rejected_clients_are_told_why() {
        let server = spawn_server(1).await;
        let (_alice, _, _) = connect(server).await;

        let bob = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        send(
            &bob,
            &Packet::NewPlayer {
                client_version: PROTOCOL_VERSION,
            },
            server,
        )
        .await;
        match recv(&bob).await {
            Packet::Disconnected { reason } => assert_eq!(reason, "Server full"),
            other => panic!("Unexpected packet {:?}", other),
        }

        send(&bob, &Packet::NewPlayer { client_version: 0 }, server).await;
        match recv(&bob).await {
            Packet::Disconnected { reason } => assert_eq!(reason, "Protocol version mismatch"),
            other => panic!("Unexpected packet {:?}", other),
        }
    }
}

/// ERROR HANDLING TESTS
mod error_tests {
    use super::*;

    #[test]
    fn malformed_packet_handling() {
        let valid_data = serialize(&Packet::NewPlayer { client_version: 1 }).unwrap();

        let truncated: Result<Packet, _> = deserialize(&valid_data[..valid_data.len() / 2]);
        assert!(truncated.is_err(), "Should fail to deserialize truncated packet");

        let mut corrupted = valid_data.clone();
        corrupted[0] = 0xFF;
        let corrupted: Result<Packet, _> = deserialize(&corrupted);
        assert!(corrupted.is_err(), "Should fail to deserialize corrupted packet");

        let empty: Result<Packet, _> = deserialize(&[]);
        assert!(empty.is_err(), "Should fail to deserialize empty packet");
    }

    /// Garbage on the wire must not take the server down.
    #[tokio::test]
    async fn server_survives_garbage() {
        let server = spawn_server(8).await;
        let noise = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        noise.send_to(&[0xFF, 0x00, 0x13], server).await.unwrap();
        noise.send_to(&[], server).await.unwrap();

        let (alice, alice_id, _) = connect(server).await;
        let state = recv_state(&alice, |_| true).await;
        assert!(state.player_data.contains_key(&alice_id));
    }
}
