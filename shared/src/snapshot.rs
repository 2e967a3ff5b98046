//! Display rows broadcast to every connection of a session once per tick.

use crate::ConnectionId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Derived from whether the player is "it"; never stored on the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerColor {
    Red,
    Green,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerData {
    pub x: f32,
    pub y: f32,
    pub color: PlayerColor,
    pub num: u32,
    pub score: u32,
    pub dead: bool,
    pub win: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerUpData {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlatformData {
    pub x: f32,
    pub y: f32,
}

/// Full state of one session. Ordered maps keep the encoding stable.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub player_data: BTreeMap<ConnectionId, PlayerData>,
    pub power_up_data: Vec<PowerUpData>,
    pub platform_data: Vec<PlatformData>,
}

impl StateSnapshot {
    /// Connection currently marked "it", if any.
    pub fn tagger(&self) -> Option<ConnectionId> {
        self.player_data
            .iter()
            .find(|(_, data)| data.color == PlayerColor::Red)
            .map(|(id, _)| *id)
    }
}
