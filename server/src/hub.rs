//! Message routing and authoritative session state for the maze-race hub
//!
//! This module owns everything a single inbound message may read or mutate:
//! - The maze store (one optional layout, replaced wholesale on reset)
//! - The player roster, via [`crate::roster::Roster`]
//! - The dispatch from decoded [`ClientMessage`]s to their handlers
//!
//! Handlers are synchronous and never block, so the server loop can apply
//! each message as one atomic read-modify-write against the session state.
//! What a handler wants transmitted afterwards is described by the returned
//! [`HubResponse`]; the network layer decides how to deliver it.

use crate::roster::Roster;
use log::info;
use shared::{ClientMessage, MazeLayout, PlayerState, ServerMessage};

/// Transmission request produced by handling one inbound message.
///
/// The hub never talks to a socket itself. It hands one of these to the
/// relay, which knows which connections exist and which player each one
/// speaks for.
#[derive(Debug)]
pub enum HubResponse {
    /// Reply to a handshake. When `reset` is set the relay fans out
    /// personalized copies to every connected player instead of answering
    /// only the requester.
    Handshake {
        maze: MazeLayout,
        me: PlayerState,
        players: Vec<PlayerState>,
        reset: bool,
    },
    /// One shared payload for every open connection.
    Broadcast(ServerMessage),
}

/// Authoritative session state: the current maze and the player roster.
///
/// Constructed once at startup and owned exclusively by the server loop;
/// handlers receive it by mutable reference, never through shared globals.
pub struct Hub {
    maze: Option<MazeLayout>,
    roster: Roster,
}

impl Hub {
    /// Creates a hub with no maze and an empty roster.
    pub fn new() -> Self {
        Self {
            maze: None,
            roster: Roster::new(),
        }
    }

    /// Routes one decoded client message to its handler.
    ///
    /// `now_ms` is sampled once by the caller so that every timestamp a
    /// single message produces agrees with itself. Returns `None` when the
    /// message warrants no transmission at all (keepalives).
    pub fn handle(&mut self, msg: ClientMessage, now_ms: u64) -> Option<HubResponse> {
        match msg {
            ClientMessage::MazeUpdate { maze, new_game, id } => {
                Some(self.handle_maze_update(maze, new_game, id, now_ms))
            }
            ClientMessage::KeepAlive { id } => {
                self.roster.refresh(id, now_ms);
                None
            }
            ClientMessage::PlayerStateUpdate { id, x, y, mode } => {
                // Unknown ids are dropped, but the broadcast fires either way
                self.roster.update_position(id, x, y, mode);
                Some(HubResponse::Broadcast(self.state_update()))
            }
            ClientMessage::WinnerUpdate { result } => {
                Some(HubResponse::Broadcast(ServerMessage::WinnerUpdate { result }))
            }
        }
    }

    /// Handshake: adopt the supplied maze if there is none or a new game was
    /// requested, make sure the requester has a roster record, and bundle
    /// the reply.
    fn handle_maze_update(
        &mut self,
        maze: MazeLayout,
        new_game: bool,
        id: Option<u64>,
        now_ms: u64,
    ) -> HubResponse {
        if self.maze.is_none() || new_game {
            info!("Maze layout {}", if new_game { "reset" } else { "stored" });
            self.maze = Some(maze);
        }

        // A known id keeps its record untouched; anything else (no id, or an
        // id the sweeper already reaped) joins as a brand-new player.
        let me = match id.and_then(|id| self.roster.get(id)) {
            Some(player) => player.clone(),
            None => self.roster.join(now_ms),
        };

        HubResponse::Handshake {
            maze: self.maze.clone().unwrap_or_default(),
            me,
            players: self.roster.snapshot(),
            reset: new_game,
        }
    }

    /// One liveness sweep: drop players whose keepalives stopped, then
    /// report the surviving roster. The report goes out even when nothing
    /// was dropped.
    pub fn sweep(&mut self, now_ms: u64, timeout_ms: u64) -> ServerMessage {
        self.roster.prune_stale(now_ms, timeout_ms);
        self.state_update()
    }

    /// Persistence half of a new-game reset: every listed player's stored
    /// coordinates go back to the origin. Unknown ids are skipped.
    pub fn restart_positions<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = u64>,
    {
        for id in ids {
            self.roster.reset_position(id);
        }
    }

    /// Looks up a player's current record.
    pub fn player(&self, id: u64) -> Option<&PlayerState> {
        self.roster.get(id)
    }

    /// Copies the current roster for transmission.
    pub fn roster_snapshot(&self) -> Vec<PlayerState> {
        self.roster.snapshot()
    }

    /// The currently stored maze, if any client has supplied one yet.
    pub fn maze(&self) -> Option<&MazeLayout> {
        self.maze.as_ref()
    }

    fn state_update(&self) -> ServerMessage {
        ServerMessage::StateUpdate {
            players: self.roster.snapshot(),
        }
    }
}
