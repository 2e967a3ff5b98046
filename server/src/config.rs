//! Runtime settings for the simulation and the UDP front end.

use std::time::Duration;

pub const DEFAULT_TICK_RATE: u32 = 60;
pub const DEFAULT_RESTART_DELAY: Duration = Duration::from_secs(3);
pub const DEFAULT_MAX_CLIENTS: usize = 64;
pub const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings that shape the game itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameConfig {
    /// Simulation step of every session
    pub tick_period: Duration,
    /// Time the winner screen stays up before players are redistributed
    pub restart_delay: Duration,
    /// Fixed RNG seed; `None` seeds from the OS
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tick_period: tick_period(DEFAULT_TICK_RATE),
            restart_delay: DEFAULT_RESTART_DELAY,
            seed: None,
        }
    }
}

/// Settings for the transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub max_clients: usize,
    /// Clients silent for longer than this are disconnected
    pub client_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5000".to_string(),
            max_clients: DEFAULT_MAX_CLIENTS,
            client_timeout: DEFAULT_CLIENT_TIMEOUT,
        }
    }
}

/// Period of a tick rate given in Hz. A zero rate is treated as 1 Hz.
pub fn tick_period(rate: u32) -> Duration {
    Duration::from_secs_f64(1.0 / rate.max(1) as f64)
}
