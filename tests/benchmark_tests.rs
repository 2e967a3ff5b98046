//! Performance benchmarks for critical game systems

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use server::config::GameConfig;
use server::game::Session;
use server::registry::Registry;
use server::{physics, tag};
use shared::{overlaps, MovementInput, Player, PLATFORMS};
use std::collections::HashMap;
use std::time::{Duration, Instant};

const TICK: Duration = Duration::from_nanos(16_666_667);

/// Benchmarks the overlap test used for tagging
#[test]
fn benchmark_overlap_detection() {
    let player1 = Player::new(1, 100.0);
    let player2 = Player::new(2, 110.0);

    let iterations = 100_000;
    let start = Instant::now();

    let mut hits = 0;
    for _ in 0..iterations {
        if overlaps(&player1, &player2) {
            hits += 1;
        }
    }

    let duration = start.elapsed();
    println!(
        "Overlap detection: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert_eq!(hits, iterations);
    assert!(duration.as_millis() < 500);
}

/// Benchmarks pairwise tag resolution in a crowded session
#[test]
fn benchmark_tag_resolution() {
    let mut players: HashMap<u32, Player> = (1..=64)
        .map(|id| (id, Player::new(id, (id as f32 * 15.0) % 970.0)))
        .collect();
    if let Some(player) = players.get_mut(&1) {
        player.status = true;
    }

    let iterations = 1_000;
    let start = Instant::now();

    for _ in 0..iterations {
        tag::resolve_tags(&mut players);
    }

    let duration = start.elapsed();
    println!(
        "Tag resolution: {} players x {} frames in {:?} ({:.2} μs/frame)",
        players.len(),
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(players.values().filter(|p| p.status).count() <= 1);
    assert!(duration.as_millis() < 5000);
}

/// Benchmarks physics integration with platforms
#[test]
fn benchmark_physics_simulation() {
    let mut rng = StdRng::seed_from_u64(1);
    let mut players: Vec<Player> = (0..100)
        .map(|i| Player::new(i, (i as f32 * 9.7) % 970.0))
        .collect();

    let dt = TICK.as_secs_f32();
    let iterations = 1000;
    let start = Instant::now();

    for frame in 0..iterations {
        for player in &mut players {
            if frame % 10 == 0 {
                let input = MovementInput {
                    up: rng.gen_bool(0.3),
                    down: rng.gen_bool(0.1),
                    left: rng.gen_bool(0.5),
                    right: rng.gen_bool(0.5),
                };
                physics::apply_input(player, &input);
            }
            physics::integrate(player, dt, &PLATFORMS);
        }
    }

    let duration = start.elapsed();
    println!(
        "Physics simulation: {} players × {} frames in {:?} ({:.2} μs/frame)",
        players.len(),
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    for player in &players {
        assert!((0.0..=physics::MAX_X).contains(&player.x()));
        assert!((0.0..=physics::MAX_Y).contains(&player.y()));
    }
    assert!(duration.as_millis() < 5000);
}

/// Benchmarks full session ticks including scoring and power-ups
#[test]
fn benchmark_session_tick() {
    let mut rng = StdRng::seed_from_u64(2);
    let mut session = Session::new(1);
    for id in 1..=32 {
        session.add_player(id, &mut rng);
    }
    session.start(&mut rng);

    let iterations = 3_600;
    let start = Instant::now();

    for _ in 0..iterations {
        session.tick(TICK, &mut rng);
    }

    let duration = start.elapsed();
    println!(
        "Session tick: {} players × {} ticks in {:?} ({:.2} μs/tick)",
        session.player_count(),
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 10_000);
}

/// Benchmarks state snapshot building and encoding
#[test]
fn benchmark_snapshot_serialization() {
    use bincode::{deserialize, serialize};
    use shared::{Packet, StateSnapshot};

    let mut rng = StdRng::seed_from_u64(3);
    let mut session = Session::new(1);
    for id in 1..=50 {
        session.add_player(id, &mut rng);
    }

    let iterations = 1_000;
    let start = Instant::now();

    let mut size = 0;
    for _ in 0..iterations {
        let packet = Packet::State(session.snapshot());
        let serialized = serialize(&packet).unwrap();
        size = serialized.len();
        let _deserialized: Packet = deserialize(&serialized).unwrap();
    }

    let duration = start.elapsed();
    println!(
        "Snapshot serialization: {} roundtrips of {} bytes in {:?} ({:.2} μs/roundtrip)",
        iterations,
        size,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    let empty = serialize(&Packet::State(StateSnapshot::default())).unwrap();
    assert!(size > empty.len());
    assert!(size < 65_507, "snapshot must fit in one datagram");
    assert!(duration.as_millis() < 5000);
}

/// Benchmarks the registry driving many concurrent sessions
#[test]
fn benchmark_registry_many_sessions() {
    let mut registry = Registry::new(GameConfig {
        tick_period: TICK,
        restart_delay: Duration::from_secs(3),
        seed: Some(4),
    });

    // 20 running sessions of 4 players each
    for session in 0..20u32 {
        for slot in 1..=4 {
            registry.join(session * 4 + slot);
        }
        registry.start(session * 4 + 1);
    }
    assert_eq!(registry.session_count(), 20);

    let iterations = 600;
    let start = Instant::now();

    let mut broadcasts = 0;
    for _ in 0..iterations {
        broadcasts += registry.advance(TICK).len();
    }

    let duration = start.elapsed();
    println!(
        "Registry: {} sessions × {} ticks in {:?} ({:.2} μs/tick)",
        registry.session_count(),
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert_eq!(broadcasts, 20 * iterations);
    assert!(duration.as_millis() < 10_000);
}
