//! Owner of every session and connection: matchmaking, dispatch of client
//! events, and the timers that drive ticks and restarts.

use crate::config::GameConfig;
use crate::game::{Session, SessionEvent, SessionPhase};
use crate::scheduler::Scheduler;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{ConnectionId, MovementInput, SessionId, StateSnapshot};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Timers owned by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Tick(SessionId),
    Restart(SessionId),
}

/// Messages the transport should deliver.
#[derive(Debug, Clone, PartialEq)]
pub enum Outgoing {
    /// The connection was placed into a lobby.
    NewGame {
        connection: ConnectionId,
        session: SessionId,
    },
    /// Per-tick state for everyone in a session.
    State {
        session: SessionId,
        recipients: Vec<ConnectionId>,
        snapshot: StateSnapshot,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Where a known connection currently plays.
pub struct ConnectionInfo {
    pub session: SessionId,
}

/// Owns every session and connection and the timers that drive them.
///
/// All game state changes go through the registry, so the transport only
/// has to translate packets into calls and deliver the returned
/// [`Outgoing`] messages.
pub struct Registry {
    config: GameConfig,
    /// Every session ever created; emptied sessions stay as idle lobbies
    sessions: BTreeMap<SessionId, Session>,
    connections: HashMap<ConnectionId, ConnectionInfo>,
    scheduler: Scheduler<Task>,
    rng: StdRng,
    next_session_id: SessionId,
}

impl Registry {
    /// Creates an empty registry. A configured seed makes every random draw
    /// reproducible; otherwise the generator is seeded from entropy.
    pub fn new(config: GameConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            sessions: BTreeMap::new(),
            connections: HashMap::new(),
            scheduler: Scheduler::new(),
            rng,
            next_session_id: 1,
        }
    }

    /// Looks up a session by id.
    pub fn session(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    /// The session a connection is in, if it is known.
    pub fn session_of(&self, connection: ConnectionId) -> Option<SessionId> {
        self.connections.get(&connection).map(|info| info.session)
    }

    /// Number of sessions created so far, idle lobbies included.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Number of connections currently placed in a session.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// True while the session's repeating tick is scheduled.
    pub fn is_ticking(&self, session: SessionId) -> bool {
        self.scheduler.is_scheduled(Task::Tick(session))
    }

    /// True between a win and the session's restart.
    pub fn restart_pending(&self, session: SessionId) -> bool {
        self.scheduler.is_scheduled(Task::Restart(session))
    }

    /// Places a connection into the fullest open lobby, creating one if
    /// every session is running. A connection that is already playing is
    /// taken out of its current session first.
    pub fn join(&mut self, connection: ConnectionId) -> Outgoing {
        if self.connections.contains_key(&connection) {
            self.leave(connection);
        }

        let session_id = self.matchmake();
        if let Some(session) = self.sessions.get_mut(&session_id) {
            session.add_player(connection, &mut self.rng);
        }
        self.connections.insert(
            connection,
            ConnectionInfo {
                session: session_id,
            },
        );

        if !self.is_ticking(session_id) {
            self.scheduler
                .schedule_repeating(Task::Tick(session_id), self.config.tick_period);
        }

        Outgoing::NewGame {
            connection,
            session: session_id,
        }
    }

    /// Removes a connection from its session. Returns false for unknown ids.
    pub fn leave(&mut self, connection: ConnectionId) -> bool {
        let Some(info) = self.connections.remove(&connection) else {
            debug!("Leave from unknown connection {}", connection);
            return false;
        };
        let Some(session) = self.sessions.get_mut(&info.session) else {
            return true;
        };

        let events = session.remove_player(connection, &mut self.rng);
        let emptied = session.is_empty();
        if emptied {
            session.reset();
        }

        if emptied {
            self.scheduler.cancel(Task::Tick(info.session));
            self.scheduler.cancel(Task::Restart(info.session));
            info!("Session {} is empty, timers stopped", info.session);
        } else {
            self.handle_events(info.session, &events);
        }
        true
    }

    /// Leaves the current session and matchmakes again.
    pub fn rejoin(&mut self, connection: ConnectionId) -> Option<Outgoing> {
        if !self.connections.contains_key(&connection) {
            debug!("Join from unknown connection {}", connection);
            return None;
        }
        Some(self.join(connection))
    }

    /// Starts the caller's session. Needs a lobby with at least two players.
    pub fn start(&mut self, connection: ConnectionId) -> bool {
        let Some(session_id) = self.session_of(connection) else {
            return false;
        };
        let Some(session) = self.sessions.get_mut(&session_id) else {
            return false;
        };
        if session.phase() != SessionPhase::Lobby || session.player_count() < 2 {
            debug!(
                "Session {}: start refused ({:?}, {} players)",
                session_id,
                session.phase(),
                session.player_count()
            );
            return false;
        }

        let events = session.start(&mut self.rng);
        self.handle_events(session_id, &events);
        true
    }

    /// Forwards a movement snapshot to the connection's session.
    /// Returns false for unknown connections.
    pub fn movement(&mut self, connection: ConnectionId, input: &MovementInput) -> bool {
        let Some(session_id) = self.session_of(connection) else {
            return false;
        };
        self.sessions
            .get_mut(&session_id)
            .is_some_and(|session| session.apply_input(connection, input))
    }

    /// Moves virtual time forward, running every tick and restart that came
    /// due, and returns what should be sent.
    pub fn advance(&mut self, elapsed: Duration) -> Vec<Outgoing> {
        let mut outgoing = Vec::new();
        for task in self.scheduler.advance(elapsed) {
            match task {
                Task::Tick(session_id) => {
                    // An earlier task in this batch may have stopped the session.
                    if self.is_ticking(session_id) {
                        self.run_tick(session_id, &mut outgoing);
                    }
                }
                Task::Restart(session_id) => self.restart(session_id, &mut outgoing),
            }
        }
        outgoing
    }

    fn matchmake(&mut self) -> SessionId {
        let open = self
            .sessions
            .values()
            .filter(|session| !session.is_running())
            .max_by(|a, b| {
                a.player_count()
                    .cmp(&b.player_count())
                    .then(b.id().cmp(&a.id()))
            })
            .map(Session::id);

        match open {
            Some(id) => id,
            None => {
                let id = self.next_session_id;
                self.next_session_id += 1;
                self.sessions.insert(id, Session::new(id));
                info!("Created session {}", id);
                id
            }
        }
    }

    fn run_tick(&mut self, session_id: SessionId, outgoing: &mut Vec<Outgoing>) {
        let Some(session) = self.sessions.get_mut(&session_id) else {
            return;
        };
        let events = session.tick(self.config.tick_period, &mut self.rng);
        let recipients = session.connections();
        let snapshot = session.snapshot();

        self.handle_events(session_id, &events);
        outgoing.push(Outgoing::State {
            session: session_id,
            recipients,
            snapshot,
        });
    }

    fn restart(&mut self, session_id: SessionId, outgoing: &mut Vec<Outgoing>) {
        let Some(session) = self.sessions.get_mut(&session_id) else {
            return;
        };
        let connections = session.reset();
        self.scheduler.cancel(Task::Tick(session_id));
        for connection in &connections {
            self.connections.remove(connection);
        }
        info!(
            "Session {} restarted, redistributing {} connections",
            session_id,
            connections.len()
        );

        for connection in connections {
            outgoing.push(self.join(connection));
        }
    }

    fn handle_events(&mut self, session_id: SessionId, events: &[SessionEvent]) {
        for event in events {
            if let SessionEvent::Won(winner) = event {
                info!(
                    "Session {}: connection {} won, restarting in {:?}",
                    session_id, winner, self.config.restart_delay
                );
                self.scheduler
                    .schedule_once(Task::Restart(session_id), self.config.restart_delay);
            }
        }
    }
}
