use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Period of the server's liveness sweep.
pub const SWEEP_INTERVAL_MS: u64 = 1000;
/// A player silent for this long (or longer) is dropped from the roster.
pub const PLAYER_TIMEOUT_MS: u64 = 3000;

/// Maze layouts are produced and consumed by clients; the hub stores and
/// relays them without looking inside.
pub type MazeLayout = Value;

/// Movement input scheme a player is currently driving with.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum MoveMode {
    #[serde(rename = "ModeVim")]
    Vim,
    #[serde(rename = "ModeNormal")]
    Normal,
}

/// Authoritative per-player record, also the wire representation inside
/// roster snapshots.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlayerState {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub mode: MoveMode,
    #[serde(rename = "lastAliveAt")]
    pub last_alive_at: u64,
}

impl PlayerState {
    /// A freshly joined player starts at the maze origin in vim mode.
    pub fn new(id: u64, now_ms: u64) -> Self {
        Self {
            id,
            x: 0.0,
            y: 0.0,
            mode: MoveMode::Vim,
            last_alive_at: now_ms,
        }
    }

    /// Puts the player back at the maze origin. Mode and liveness keep
    /// their current values.
    pub fn reset_position(&mut self) {
        self.x = 0.0;
        self.y = 0.0;
    }

    /// True once the player has gone a full timeout window without a
    /// keepalive. Exactly `timeout_ms` old counts as stale.
    pub fn is_stale(&self, now_ms: u64, timeout_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_alive_at) >= timeout_ms
    }
}

// Wire messages carry a "t" discriminator in camelCase, e.g.
// {"t":"mazeUpdate","maze":...,"newGame":true}.

/// Everything a client may send to the hub.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "t", rename_all = "camelCase")]
pub enum ClientMessage {
    MazeUpdate {
        maze: MazeLayout,
        #[serde(default, rename = "newGame")]
        new_game: bool,
        #[serde(default)]
        id: Option<u64>,
    },
    KeepAlive {
        id: u64,
    },
    PlayerStateUpdate {
        id: u64,
        x: f32,
        y: f32,
        mode: MoveMode,
    },
    WinnerUpdate {
        result: Value,
    },
}

/// Everything the hub may send to a client.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "t", rename_all = "camelCase")]
pub enum ServerMessage {
    StateUpdate {
        players: Vec<PlayerState>,
    },
    NewGameUpdate {
        maze: MazeLayout,
        me: PlayerState,
        players: Vec<PlayerState>,
    },
    WinnerUpdate {
        result: Value,
    },
}
