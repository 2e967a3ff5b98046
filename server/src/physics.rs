//! Player movement: input intents, integration, world bounds and platforms.
//!
//! Velocities are in world units per second. Platforms are one-way: a player
//! whose feet end up inside a platform's hit window is put on top of it,
//! unless they are holding down to drop through.

use shared::{
    MovementInput, Platform, Player, DROP_THROUGH_SPEED, FLOOR_Y, GRAVITY, JUMP_VELOCITY,
    PLAYER_SIZE, PLAYER_SPEED, WORLD_WIDTH,
};

/// Fall speed is divided by this to widen the platform hit window,
/// so fast falls cannot skip a 5-unit platform between two frames.
pub const PLATFORM_WINDOW_DIVISOR: f32 = 10.0;
/// Share of the remaining sink depth removed per frame after landing.
pub const CORRECTION_RATE: f32 = 0.5;
/// Sink depth below which the landing correction stops.
pub const CORRECTION_EPSILON: f32 = 2.0;

pub const MAX_X: f32 = WORLD_WIDTH - PLAYER_SIZE;
pub const MAX_Y: f32 = FLOOR_Y - PLAYER_SIZE;

/// Turns a movement snapshot into velocity intents.
///
/// There is no acceleration ramp: horizontal speed is either zero or full.
/// Jumping needs ground contact, or a wall contact that has not been used
/// since the player last touched ground.
pub fn apply_input(player: &mut Player, input: &MovementInput) {
    if input.left && player.rect.x > 0.0 {
        player.xspeed = -PLAYER_SPEED;
    } else {
        player.xspeed = 0.0;
    }
    if input.right && player.rect.x < MAX_X {
        player.xspeed = PLAYER_SPEED;
    }

    if input.up && player.rect.y > 0.0 {
        if player.grounded {
            player.yspeed = JUMP_VELOCITY;
        } else if player.wall {
            player.yspeed = JUMP_VELOCITY;
            player.wall_timeout = true;
        }
    }

    player.platform_down = input.down && player.rect.y < MAX_Y;
}

/// Advances one player by `dt` seconds.
pub fn integrate(player: &mut Player, dt: f32, platforms: &[Platform]) {
    if !player.grounded {
        player.yspeed += GRAVITY * dt;
    }

    player.rect.x += player.xspeed * dt;
    player.rect.y += player.yspeed * dt + player.y_correction;

    clamp_to_world(player);

    player.wall = (player.rect.x == 0.0 || player.rect.x == MAX_X) && !player.wall_timeout;

    player.grounded = false;
    if player.rect.y >= MAX_Y {
        player.grounded = true;
        player.wall_timeout = false;
    }

    if !resolve_platforms(player, platforms) {
        player.y_correction = 0.0;
    }
}

/// Keeps the player inside the world, killing velocity into each wall hit.
pub fn clamp_to_world(player: &mut Player) {
    if player.rect.y > MAX_Y {
        player.rect.y = MAX_Y;
        player.yspeed = 0.0;
    }
    if player.rect.y < 0.0 {
        player.rect.y = 0.0;
        player.yspeed = 0.0;
    }
    if player.rect.x > MAX_X {
        player.rect.x = MAX_X;
        player.xspeed = 0.0;
    }
    if player.rect.x < 0.0 {
        player.rect.x = 0.0;
        player.xspeed = 0.0;
    }
}

/// Lands the player on (or drops them through) every platform whose hit
/// window contains their feet. Returns true if they ended up standing on one.
///
/// The layout has no vertically overlapping platforms, so at most one
/// platform matches. Otherwise the last match in slice order wins.
fn resolve_platforms(player: &mut Player, platforms: &[Platform]) -> bool {
    let window = player.yspeed.abs() / PLATFORM_WINDOW_DIVISOR + player.y_correction.abs();
    let mut landed = false;

    for platform in platforms {
        let body = player.rect;
        let sunk = body.penetration_from_above(&platform.rect);

        let in_window = body.bottom() < platform.rect.bottom() + window
            && sunk >= 0.0
            && body.overlaps_horizontally(&platform.rect);
        if !in_window {
            continue;
        }

        if player.platform_down {
            player.yspeed = DROP_THROUGH_SPEED;
            landed = false;
        } else {
            player.yspeed = 0.0;
            player.grounded = true;
            player.wall_timeout = false;
            player.y_correction = if sunk < CORRECTION_EPSILON {
                0.0
            } else {
                -sunk * CORRECTION_RATE
            };
            landed = true;
        }
    }

    landed
}
