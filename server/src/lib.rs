//! # Maze Race Hub Library
//!
//! This library provides the synchronization hub for the multiplayer maze
//! race. It assigns player identities, relays game traffic between browser
//! clients over WebSockets, and keeps every client's picture of the session
//! converged on the hub's authoritative roster.
//!
//! ## Core Responsibilities
//!
//! ### Identity Assignment
//! Every player identity is minted here. Clients arrive anonymous, complete
//! a handshake, and receive a numeric id that is never reused for the
//! lifetime of the process, even across reconnects and timeouts.
//!
//! ### Message Dispatch
//! Inbound JSON messages are decoded at the connection boundary and routed
//! by their tag to one handler each: handshakes are answered directly,
//! movement and winner reports fan out to everyone, keepalives update
//! liveness without producing any traffic.
//!
//! ### Liveness Tracking
//! Players prove they are alive with periodic keepalives. A fixed-cadence
//! sweep removes players whose keepalives stopped and pushes the surviving
//! roster to all connected clients, so departures become visible without
//! any explicit leave message.
//!
//! ## Architecture Design
//!
//! ### Single-Owner Event Loop
//! All session state is owned by one event loop. Connection tasks never
//! touch the roster or the maze; they forward decoded messages over a
//! channel and the loop applies them one at a time. This eliminates race
//! conditions between concurrent clients and the sweep timer without any
//! locking.
//!
//! ### WebSocket Communication
//! Clients connect over plain WebSockets and exchange JSON text frames.
//! Each message carries a `t` tag naming its type; unrecognized or
//! malformed frames are logged and dropped without closing the connection,
//! so one misbehaving message never costs a client its session.
//!
//! ## Module Organization
//!
//! ### Hub Module (`hub`)
//! Routes decoded messages to their handlers and owns the session state:
//! - The stored maze layout and its replacement rules
//! - Handshake handling, including new-game resets
//! - The liveness sweep entry point
//!
//! ### Roster Module (`roster`)
//! The player roster and identity counter:
//! - Monotonic id assignment, never reused
//! - Position, movement mode and liveness bookkeeping per player
//! - Stale-player pruning
//!
//! ### Network Module (`network`)
//! Handles all networking operations:
//! - WebSocket accept loop and per-connection socket tasks
//! - Connection-to-player binding
//! - Unicast replies, shared broadcasts and the new-game fan-out
//!
//! ### Utils Module (`utils`)
//! Small helpers shared across the server, currently wall-clock time.
//!
//! ## Trust Model
//!
//! The hub takes client-reported ids at face value: any connection may
//! report movement for any id, and a handshake presenting a known id
//! adopts that identity. The hub is authoritative about which players
//! exist and when they expire, not about who speaks for them.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::HubServer;
//! use shared::{PLAYER_TIMEOUT_MS, SWEEP_INTERVAL_MS};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Bind the hub with the standard sweep cadence and player timeout
//!     let mut server = HubServer::new(
//!         "127.0.0.1:3000",
//!         Duration::from_millis(SWEEP_INTERVAL_MS),
//!         Duration::from_millis(PLAYER_TIMEOUT_MS),
//!     ).await?;
//!
//!     // Run the hub - this drives the main event loop which:
//!     // - Accepts WebSocket connections and spawns their socket tasks
//!     // - Applies inbound messages to the roster one at a time
//!     // - Answers handshakes and fans out new-game resets
//!     // - Sweeps stale players and broadcasts the surviving roster
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod hub;
pub mod network;
pub mod roster;
pub mod utils;

/// Boxed error type shared by the server's fallible operations.
pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// Convenience alias for results carrying [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
