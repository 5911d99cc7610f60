//! Player directory and identity assignment for the maze-race hub
//!
//! This module owns the server-side roster of transient player records:
//! - Identity assignment (monotonic ids, never reused)
//! - Creation of fresh records on first handshake
//! - Movement and liveness mutation on behalf of the message handlers
//! - Timeout-based pruning for the periodic liveness sweep
//!
//! The roster is the single authority on who is currently in the game;
//! everything sent on the wire is an independent snapshot of it.

use log::info;
use shared::{MoveMode, PlayerState};
use std::collections::BTreeMap;

/// All currently known players, keyed by id.
///
/// Ids are handed out by a monotonic counter starting at 1, so iterating the
/// map yields players in join order. A pruned player's id is never handed
/// out again, even across many join/prune cycles.
pub struct Roster {
    players: BTreeMap<u64, PlayerState>,
    next_id: u64,
}

impl Roster {
    /// Creates an empty roster. The first player to join receives id 1.
    pub fn new() -> Self {
        Self {
            players: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Claims the next unused id.
    fn assign_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Creates a player at the maze origin and inserts it into the roster.
    ///
    /// Returns a copy of the new record for embedding into the handshake
    /// response. The stored record keeps `now_ms` as its first liveness
    /// timestamp so a player that never sends a keepalive still survives
    /// one full timeout window.
    pub fn join(&mut self, now_ms: u64) -> PlayerState {
        let id = self.assign_id();
        let player = PlayerState::new(id, now_ms);
        info!("Player {} joined the maze", id);
        self.players.insert(id, player.clone());
        player
    }

    /// Looks up a player by id.
    pub fn get(&self, id: u64) -> Option<&PlayerState> {
        self.players.get(&id)
    }

    /// Refreshes a player's liveness timestamp.
    ///
    /// Returns false when the id is unknown, which callers treat as a
    /// harmless no-op: the player may already have been pruned while the
    /// keepalive was in flight.
    pub fn refresh(&mut self, id: u64, now_ms: u64) -> bool {
        if let Some(player) = self.players.get_mut(&id) {
            player.last_alive_at = now_ms;
            true
        } else {
            false
        }
    }

    /// Overwrites a player's coordinates and movement mode.
    ///
    /// The caller is not verified to own the id; the hub trusts clients to
    /// report their own state. Returns false when the id is unknown.
    pub fn update_position(&mut self, id: u64, x: f32, y: f32, mode: MoveMode) -> bool {
        if let Some(player) = self.players.get_mut(&id) {
            player.x = x;
            player.y = y;
            player.mode = mode;
            true
        } else {
            false
        }
    }

    /// Moves a player's stored coordinates back to the maze origin.
    ///
    /// This is the persistence half of a new-game reset: the roster record
    /// itself changes, not just an outbound copy. Returns false when the id
    /// is unknown.
    pub fn reset_position(&mut self, id: u64) -> bool {
        if let Some(player) = self.players.get_mut(&id) {
            player.reset_position();
            true
        } else {
            false
        }
    }

    /// Removes every player whose last keepalive is at least `timeout_ms`
    /// old and returns their ids.
    ///
    /// Called by the liveness sweeper on a fixed period. Removal here is the
    /// only way a player ever leaves the roster; closing the transport
    /// connection alone does not touch it.
    pub fn prune_stale(&mut self, now_ms: u64, timeout_ms: u64) -> Vec<u64> {
        let stale: Vec<u64> = self
            .players
            .iter()
            .filter(|(_, player)| player.is_stale(now_ms, timeout_ms))
            .map(|(id, _)| *id)
            .collect();

        for id in &stale {
            self.players.remove(id);
            info!("Player {} timed out", id);
        }

        stale
    }

    /// Copies the full roster, in join order, for transmission.
    pub fn snapshot(&self) -> Vec<PlayerState> {
        self.players.values().cloned().collect()
    }

    /// Number of players currently in the roster.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// True when nobody is in the game.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
