//! # Tag Game Server Library
//!
//! Authoritative server for a multiplayer tag platformer. Clients send
//! movement intents over UDP; the server simulates every session and sends
//! each participant a full state snapshot after every tick.
//!
//! ## Game Rules
//!
//! Players run and jump around a fixed arena of one-way platforms. Once a
//! session is started one living player is "it". Touching another living
//! player passes "it" on. Every second the tagger loses a point and a
//! power-up may drop from the sky; catching one is worth five points. A
//! tagger that reaches zero is eliminated and a new one is drawn at random.
//! The last player alive wins, and after a short delay everyone is
//! redistributed into lobbies.
//!
//! ## Architecture
//!
//! ### Single-Threaded Simulation
//! All game state is owned by one [`registry::Registry`] driven from the
//! main server loop. Network tasks only move bytes and talk to the loop
//! through channels, so no game state is shared between tasks.
//!
//! ### Virtual Time
//! Session ticks and restarts are entries in a [`scheduler::Scheduler`]
//! that is fed elapsed wall time. Tests drive it directly without sleeping.
//!
//! ## Module Organization
//!
//! - `physics`, `tag`, `scoring`, `powerup`: pure rules over players and
//!   power-ups
//! - `game`: one session and its per-tick pipeline
//! - `scheduler`, `registry`: timers, matchmaking and event dispatch
//! - `client_manager`, `network`: UDP transport and connection tracking
//! - `config`: runtime settings

pub mod client_manager;
pub mod config;
pub mod game;
pub mod network;
pub mod physics;
pub mod powerup;
pub mod registry;
pub mod scheduler;
pub mod scoring;
pub mod tag;
