//! Once-per-second scoring, elimination and tagger reassignment.

use rand::Rng;
use shared::{ConnectionId, Player};
use std::collections::HashMap;

/// Result of handing "it" to a new player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaggerUpdate {
    pub tagger: Option<ConnectionId>,
    /// Set when only one living player is left
    pub winner: Option<ConnectionId>,
}

/// Drains one point from the player if they are "it" in a contested game.
/// Returns true when this tick eliminated them.
pub fn score_tick(player: &mut Player, player_count: usize) -> bool {
    if !(player.status && player_count > 1 && !player.dead && !player.win) {
        return false;
    }

    player.score = player.score.saturating_sub(1);
    if player.score == 0 {
        player.dead = true;
        player.status = false;
        return true;
    }
    false
}

/// Makes a uniformly random living player "it", then declares a winner if
/// they are the only one left. Does nothing when nobody is alive.
///
/// The new tagger's contact latch is released: the partner that set it may
/// have been eliminated or removed and can no longer clear it.
pub fn update_tagger<R: Rng + ?Sized>(
    players: &mut HashMap<ConnectionId, Player>,
    rng: &mut R,
) -> TaggerUpdate {
    let mut living: Vec<ConnectionId> = players
        .iter()
        .filter(|(_, player)| !player.dead)
        .map(|(id, _)| *id)
        .collect();
    if living.is_empty() {
        return TaggerUpdate::default();
    }
    living.sort_unstable();

    let tagger = living[rng.gen_range(0..living.len())];
    if let Some(player) = players.get_mut(&tagger) {
        player.status = true;
        player.collision = false;
    }

    let mut update = TaggerUpdate {
        tagger: Some(tagger),
        winner: None,
    };
    if let [survivor] = living.as_slice() {
        if let Some(player) = players.get_mut(survivor) {
            player.win = true;
        }
        update.winner = Some(*survivor);
    }
    update
}

pub fn living_count(players: &HashMap<ConnectionId, Player>) -> usize {
    players.values().filter(|player| !player.dead).count()
}
