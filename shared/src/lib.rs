use serde::{Deserialize, Serialize};

pub mod entity;
pub mod geometry;
pub mod snapshot;

pub use entity::{Platform, Player, PowerUp, PLATFORMS};
pub use geometry::{intersects, overlaps, Bounded, Rect};
pub use snapshot::{PlatformData, PlayerColor, PlayerData, PowerUpData, StateSnapshot};

/// Transport-assigned identifier of a connected client.
pub type ConnectionId = u32;
/// Identifier of a game session, allocated sequentially by the server.
pub type SessionId = u32;

pub const PROTOCOL_VERSION: u32 = 1;

pub const WORLD_WIDTH: f32 = 1000.0;
pub const WORLD_HEIGHT: f32 = 500.0;
pub const FLOOR_Y: f32 = WORLD_HEIGHT;
pub const PLAYER_SIZE: f32 = 30.0;
pub const POWER_UP_SIZE: f32 = 20.0;
pub const POWER_UP_SPAWN_Y: f32 = -20.0;

pub const GRAVITY: f32 = 1000.0;
pub const PLAYER_SPEED: f32 = 400.0;
pub const JUMP_VELOCITY: f32 = -500.0;
pub const DROP_THROUGH_SPEED: f32 = 500.0;
pub const POWER_UP_GRAVITY: f32 = 250.0;

pub const INITIAL_SCORE: u32 = 60;
pub const POWER_UP_REWARD: u32 = 5;

/// Movement intent sampled by a client. Each snapshot replaces the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MovementInput {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    NewPlayer {
        client_version: u32,
    },
    Start,
    Join,
    Movement(MovementInput),
    Disconnect,

    NewGame {
        client_id: ConnectionId,
        session_id: SessionId,
    },
    State(StateSnapshot),
    Disconnected {
        reason: String,
    },
}
