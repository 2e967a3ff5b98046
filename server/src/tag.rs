//! Tag contact resolution.
//!
//! "It" changes hands at most once per contact episode: both players are
//! latched (`collision`) on a transfer and stay latched until they separate.

use shared::{overlaps, ConnectionId, Player};
use std::collections::HashMap;

/// "It" passed from one connection to another during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    pub from: ConnectionId,
    pub to: ConnectionId,
}

/// Resolves contact between two players. Returns true if "it" moved.
pub fn tag(a: &mut Player, b: &mut Player) -> bool {
    if overlaps(a, b) {
        if a.status && !a.collision {
            a.status = false;
            b.status = true;
            a.collision = true;
            b.collision = true;
            return true;
        } else if b.status && !b.collision {
            b.status = false;
            a.status = true;
            a.collision = true;
            b.collision = true;
            return true;
        }
    } else if a.collision && b.collision {
        a.collision = false;
        b.collision = false;
    }
    false
}

/// Runs [`tag`] over every ordered pair of living players, lowest id first.
pub fn resolve_tags(players: &mut HashMap<ConnectionId, Player>) -> Vec<Transfer> {
    let mut living: Vec<(ConnectionId, &mut Player)> = players
        .iter_mut()
        .filter(|(_, player)| !player.dead)
        .map(|(id, player)| (*id, player))
        .collect();
    living.sort_by_key(|(id, _)| *id);

    let mut transfers = Vec::new();
    for i in 0..living.len() {
        for j in 0..living.len() {
            if i == j {
                continue;
            }
            let (first, second) = pair_mut(&mut living, i, j);
            if tag(first.1, second.1) {
                let transfer = if second.1.status {
                    Transfer {
                        from: first.0,
                        to: second.0,
                    }
                } else {
                    Transfer {
                        from: second.0,
                        to: first.0,
                    }
                };
                transfers.push(transfer);
            }
        }
    }
    transfers
}

fn pair_mut<T>(items: &mut [T], i: usize, j: usize) -> (&mut T, &mut T) {
    if i < j {
        let (head, tail) = items.split_at_mut(j);
        (&mut head[i], &mut tail[0])
    } else {
        let (head, tail) = items.split_at_mut(i);
        (&mut tail[0], &mut head[j])
    }
}
