//! One independent tag game: roster, power-ups and the per-tick pipeline.

use crate::physics;
use crate::powerup::{self, SpawnCounter};
use crate::scoring::{self, living_count};
use crate::tag::{self, Transfer};
use log::{debug, info};
use rand::Rng;
use shared::{
    ConnectionId, MovementInput, Platform, Player, PowerUp, SessionId, StateSnapshot, PLATFORMS,
};
use std::collections::HashMap;
use std::time::Duration;

/// Scoring and power-up spawning run once per simulated second.
pub const SCORE_INTERVAL: Duration = Duration::from_secs(1);
pub const SPAWN_MIN_X: f32 = 100.0;
pub const SPAWN_MAX_X: f32 = 900.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Accepting joins, players can move but nobody is "it"
    Lobby,
    /// Someone is "it" and scores drain every second
    Active,
    /// A winner is decided and the session waits for its restart
    Restarting,
}

/// Something a session wants its owner to know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    TaggerChosen(ConnectionId),
    Tagged(Transfer),
    Eliminated(ConnectionId),
    PowerUpSpawned,
    PowerUpCollected(ConnectionId),
    /// Only one living player is left; the owner should schedule a restart.
    Won(ConnectionId),
}

/// A single tag game and everything it simulates.
///
/// Sessions know nothing about time or sockets. The owner feeds them elapsed
/// time through [`Session::tick`] and turns the returned events into
/// timers and broadcasts.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    players: HashMap<ConnectionId, Player>,
    power_ups: Vec<PowerUp>,
    platforms: &'static [Platform],
    phase: SessionPhase,
    score_clock: Duration,
    spawn_counter: SpawnCounter,
    next_num: u32,
}

impl Session {
    /// Creates an empty lobby using the fixed platform layout.
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            players: HashMap::new(),
            power_ups: Vec::new(),
            platforms: &PLATFORMS,
            phase: SessionPhase::Lobby,
            score_clock: Duration::ZERO,
            spawn_counter: SpawnCounter::new(),
            next_num: 1,
        }
    }

    /// The id this session was created with.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Current phase of the game.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// True once started, including while waiting for the restart.
    /// Running sessions no longer accept joins.
    pub fn is_running(&self) -> bool {
        self.phase != SessionPhase::Lobby
    }

    /// Number of connections in the roster, eliminated players included.
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Looks up the player owned by a connection.
    pub fn player(&self, id: ConnectionId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn players(&self) -> &HashMap<ConnectionId, Player> {
        &self.players
    }

    /// Power-ups still in the air, oldest first.
    pub fn power_ups(&self) -> &[PowerUp] {
        &self.power_ups
    }

    /// Connections in this session, lowest id first.
    pub fn connections(&self) -> Vec<ConnectionId> {
        let mut ids: Vec<ConnectionId> = self.players.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Spawns a player on the floor and returns their number. Numbers are
    /// never reused while the session lives.
    pub fn add_player<R: Rng + ?Sized>(&mut self, id: ConnectionId, rng: &mut R) -> u32 {
        let num = self.next_num;
        self.next_num += 1;

        let player = Player::new(num, rng.gen_range(SPAWN_MIN_X..=SPAWN_MAX_X));
        info!(
            "Session {}: added player {} (connection {}) at x={:.0}",
            self.id,
            num,
            id,
            player.x()
        );
        self.players.insert(id, player);
        num
    }

    /// Removes a player. A departing "it" is eliminated and replaced first,
    /// so the game never runs without a tagger.
    pub fn remove_player<R: Rng + ?Sized>(
        &mut self,
        id: ConnectionId,
        rng: &mut R,
    ) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        let running = self.is_running();
        let Some(player) = self.players.get_mut(&id) else {
            return events;
        };

        if running && player.status && !player.dead {
            player.status = false;
            player.dead = true;
            events.push(SessionEvent::Eliminated(id));
            self.reassign_tagger(rng, &mut events);
        }

        self.players.remove(&id);
        info!("Session {}: removed connection {}", self.id, id);

        if self.phase == SessionPhase::Active && living_count(&self.players) == 1 {
            let survivor = self
                .players
                .iter_mut()
                .find(|(_, player)| !player.dead)
                .map(|(id, player)| {
                    player.win = true;
                    *id
                });
            if let Some(survivor) = survivor {
                self.declare_winner(survivor, &mut events);
            }
        }
        events
    }

    /// Applies a movement snapshot. Unknown connections are ignored.
    pub fn apply_input(&mut self, id: ConnectionId, input: &MovementInput) -> bool {
        match self.players.get_mut(&id) {
            Some(player) => {
                physics::apply_input(player, input);
                true
            }
            None => {
                debug!("Session {}: movement for unknown connection {}", self.id, id);
                false
            }
        }
    }

    /// Lobby to Active. Picks the first "it" at random.
    pub fn start<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if self.phase != SessionPhase::Lobby {
            return events;
        }

        self.phase = SessionPhase::Active;
        self.score_clock = Duration::ZERO;
        self.spawn_counter = SpawnCounter::new();
        for player in self.players.values_mut() {
            player.status = false;
            player.collision = false;
        }
        info!(
            "Session {}: started with {} players",
            self.id,
            self.players.len()
        );
        self.reassign_tagger(rng, &mut events);
        events
    }

    /// Runs one simulation step: physics, power-up fall, tagging, pickups,
    /// then scoring for every whole second accumulated.
    pub fn tick<R: Rng + ?Sized>(&mut self, dt: Duration, rng: &mut R) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        let secs = dt.as_secs_f32();

        for player in self.players.values_mut() {
            physics::integrate(player, secs, self.platforms);
        }

        if !self.is_running() {
            return events;
        }

        let dropped = powerup::advance(&mut self.power_ups, secs);
        if dropped > 0 {
            debug!("Session {}: {} power-ups fell out", self.id, dropped);
        }

        for transfer in tag::resolve_tags(&mut self.players) {
            debug!(
                "Session {}: {} tagged {}",
                self.id, transfer.from, transfer.to
            );
            events.push(SessionEvent::Tagged(transfer));
        }

        for collector in powerup::collect(&mut self.players, &mut self.power_ups) {
            debug!("Session {}: {} collected a power-up", self.id, collector);
            events.push(SessionEvent::PowerUpCollected(collector));
        }

        self.score_clock += dt;
        while self.score_clock >= SCORE_INTERVAL {
            self.score_clock -= SCORE_INTERVAL;
            self.score_second(rng, &mut events);
        }
        events
    }

    /// Display state for every connection in the session.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            player_data: self
                .players
                .iter()
                .map(|(id, player)| (*id, player.to_data()))
                .collect(),
            power_up_data: self.power_ups.iter().map(PowerUp::to_data).collect(),
            platform_data: self.platforms.iter().map(Platform::to_data).collect(),
        }
    }

    /// Empties the session back into a fresh lobby and returns the
    /// connections it held, lowest id first.
    pub fn reset(&mut self) -> Vec<ConnectionId> {
        let connections = self.connections();
        self.players.clear();
        self.power_ups.clear();
        self.phase = SessionPhase::Lobby;
        self.score_clock = Duration::ZERO;
        self.spawn_counter = SpawnCounter::new();
        self.next_num = 1;
        connections
    }

    fn score_second<R: Rng + ?Sized>(&mut self, rng: &mut R, events: &mut Vec<SessionEvent>) {
        if self.spawn_counter.tick(rng) {
            let power_up = powerup::spawn(rng);
            debug!(
                "Session {}: power-up spawned at x={:.0}",
                self.id, power_up.rect.x
            );
            self.power_ups.push(power_up);
            events.push(SessionEvent::PowerUpSpawned);
        }

        // Only players who were "it" when the second began pay for it; a
        // replacement picked below starts draining on the next second.
        let player_count = self.players.len();
        let taggers: Vec<ConnectionId> = self
            .connections()
            .into_iter()
            .filter(|id| self.players.get(id).is_some_and(|player| player.status))
            .collect();
        for id in taggers {
            let eliminated = self
                .players
                .get_mut(&id)
                .is_some_and(|player| scoring::score_tick(player, player_count));
            if eliminated {
                info!("Session {}: connection {} eliminated", self.id, id);
                events.push(SessionEvent::Eliminated(id));
                self.reassign_tagger(rng, events);
            }
        }
    }

    fn reassign_tagger<R: Rng + ?Sized>(&mut self, rng: &mut R, events: &mut Vec<SessionEvent>) {
        let update = scoring::update_tagger(&mut self.players, rng);
        if let Some(tagger) = update.tagger {
            debug!("Session {}: {} is it", self.id, tagger);
            events.push(SessionEvent::TaggerChosen(tagger));
        }
        if let Some(winner) = update.winner {
            self.declare_winner(winner, events);
        }
    }

    fn declare_winner(&mut self, winner: ConnectionId, events: &mut Vec<SessionEvent>) {
        if self.phase != SessionPhase::Active {
            return;
        }
        info!("Session {}: connection {} wins", self.id, winner);
        self.phase = SessionPhase::Restarting;
        events.push(SessionEvent::Won(winner));
    }

    #[cfg(test)]
    pub(crate) fn player_mut(&mut self, id: ConnectionId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }
}
