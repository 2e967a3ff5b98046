//! Power-up spawning, falling and collection.

use rand::Rng;
use shared::{
    intersects, ConnectionId, Player, PowerUp, POWER_UP_GRAVITY, POWER_UP_REWARD, WORLD_HEIGHT,
    WORLD_WIDTH,
};
use std::collections::HashMap;

/// Scoring ticks between guaranteed spawns.
pub const SPAWN_COUNTDOWN: u32 = 25;
/// Power-ups never spawn closer than this to either side wall.
pub const SPAWN_MARGIN: f32 = 100.0;

/// Random spawn timer. Each tick the counter shrinks and a draw in
/// `0..=remaining` decides whether to spawn, so spawns get likelier the
/// longer none has happened and are certain once the counter runs out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnCounter {
    remaining: u32,
}

impl Default for SpawnCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl SpawnCounter {
    pub fn new() -> Self {
        Self {
            remaining: SPAWN_COUNTDOWN,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Advances one scoring tick. Returns true if a power-up should spawn.
    pub fn tick<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        if rng.gen_range(0..=self.remaining) == 0 {
            self.remaining = SPAWN_COUNTDOWN;
            return true;
        }
        false
    }
}

pub fn spawn<R: Rng + ?Sized>(rng: &mut R) -> PowerUp {
    PowerUp::new(rng.gen_range(SPAWN_MARGIN..=WORLD_WIDTH - SPAWN_MARGIN))
}

/// Constant-acceleration step, exact for any `dt`.
pub fn fall(power_up: &mut PowerUp, dt: f32) {
    power_up.rect.y += power_up.yspeed * dt + 0.5 * POWER_UP_GRAVITY * dt * dt;
    power_up.yspeed += POWER_UP_GRAVITY * dt;
}

/// Moves every power-up and drops those that left the bottom of the world.
/// Returns how many were dropped.
pub fn advance(power_ups: &mut Vec<PowerUp>, dt: f32) -> usize {
    let before = power_ups.len();
    for power_up in power_ups.iter_mut() {
        fall(power_up, dt);
    }
    power_ups.retain(|power_up| power_up.rect.y < WORLD_HEIGHT);
    before - power_ups.len()
}

/// Hands each power-up to the first living player (lowest id) touching it.
/// Returns the collecting connection for every power-up consumed.
pub fn collect(
    players: &mut HashMap<ConnectionId, Player>,
    power_ups: &mut Vec<PowerUp>,
) -> Vec<ConnectionId> {
    let mut ids: Vec<ConnectionId> = players.keys().copied().collect();
    ids.sort_unstable();

    let mut collected = Vec::new();
    power_ups.retain(|power_up| {
        let collector = ids.iter().copied().find(|id| {
            players
                .get(id)
                .is_some_and(|player| !player.dead && intersects(player, power_up))
        });
        match collector.and_then(|id| players.get_mut(&id).map(|player| (id, player))) {
            Some((id, player)) => {
                player.score += POWER_UP_REWARD;
                collected.push(id);
                false
            }
            None => true,
        }
    });
    collected
}
