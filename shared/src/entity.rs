//! Passive world entities. Behaviour lives on the server; these types only
//! carry state and convert themselves into snapshot rows.

use crate::geometry::{Bounded, Rect};
use crate::snapshot::{PlatformData, PlayerColor, PlayerData, PowerUpData};
use crate::{FLOOR_Y, INITIAL_SCORE, PLAYER_SIZE, POWER_UP_SIZE, POWER_UP_SPAWN_Y};
use serde::{Deserialize, Serialize};

/// Static platform players can stand on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    pub rect: Rect,
}

impl Platform {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            rect: Rect::new(x, y, width, height),
        }
    }

    pub fn to_data(&self) -> PlatformData {
        PlatformData {
            x: self.rect.x,
            y: self.rect.y,
        }
    }
}

impl Bounded for Platform {
    fn bounds(&self) -> Rect {
        self.rect
    }
}

/// Fixed level layout, shared read-only by every session.
pub const PLATFORMS: [Platform; 5] = [
    Platform::new(100.0, 400.0, 300.0, 5.0),
    Platform::new(600.0, 400.0, 300.0, 5.0),
    Platform::new(350.0, 300.0, 300.0, 5.0),
    Platform::new(100.0, 200.0, 300.0, 5.0),
    Platform::new(600.0, 200.0, 300.0, 5.0),
];

/// A player body and its game flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Sequential number within the owning session
    pub num: u32,
    pub rect: Rect,
    pub xspeed: f32,
    pub yspeed: f32,
    /// Per-frame nudge towards the top of the platform the player landed on
    pub y_correction: f32,
    pub grounded: bool,
    pub wall: bool,
    pub wall_timeout: bool,
    pub platform_down: bool,
    pub dead: bool,
    pub win: bool,
    /// Tag latch, set when "it" changes hands and held until the pair separates
    pub collision: bool,
    /// True while this player is "it"
    pub status: bool,
    pub score: u32,
}

impl Player {
    /// Spawns a player standing on the floor at `x`.
    pub fn new(num: u32, x: f32) -> Self {
        Self {
            num,
            rect: Rect::new(x, FLOOR_Y - PLAYER_SIZE, PLAYER_SIZE, PLAYER_SIZE),
            xspeed: 0.0,
            yspeed: 0.0,
            y_correction: 0.0,
            grounded: true,
            wall: false,
            wall_timeout: false,
            platform_down: false,
            dead: false,
            win: false,
            collision: false,
            status: false,
            score: INITIAL_SCORE,
        }
    }

    pub fn x(&self) -> f32 {
        self.rect.x
    }

    pub fn y(&self) -> f32 {
        self.rect.y
    }

    pub fn color(&self) -> PlayerColor {
        if self.status {
            PlayerColor::Red
        } else {
            PlayerColor::Green
        }
    }

    pub fn to_data(&self) -> PlayerData {
        PlayerData {
            x: self.rect.x,
            y: self.rect.y,
            color: self.color(),
            num: self.num,
            score: self.score,
            dead: self.dead,
            win: self.win,
        }
    }
}

impl Bounded for Player {
    fn bounds(&self) -> Rect {
        self.rect
    }
}

/// Falling pickup worth a few extra seconds of survival.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerUp {
    pub rect: Rect,
    pub yspeed: f32,
}

impl PowerUp {
    /// Creates a power-up just above the visible area.
    pub fn new(x: f32) -> Self {
        Self {
            rect: Rect::new(x, POWER_UP_SPAWN_Y, POWER_UP_SIZE, POWER_UP_SIZE),
            yspeed: 0.0,
        }
    }

    pub fn to_data(&self) -> PowerUpData {
        PowerUpData {
            x: self.rect.x,
            y: self.rect.y,
        }
    }
}

impl Bounded for PowerUp {
    fn bounds(&self) -> Rect {
        self.rect
    }
}
