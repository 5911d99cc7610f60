//! Server network layer handling WebSocket connections and message delivery

use crate::hub::{Hub, HubResponse};
use crate::utils::get_timestamp;
use crate::Result;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{ClientMessage, MazeLayout, PlayerState, ServerMessage};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::interval;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// Identifies one accepted connection for the lifetime of the process.
pub type ConnectionId = usize;

/// Messages sent from connection tasks to the main server loop
#[derive(Debug)]
pub enum HubEvent {
    Connected {
        conn_id: ConnectionId,
        sender: mpsc::UnboundedSender<Message>,
    },
    Inbound {
        conn_id: ConnectionId,
        msg: ClientMessage,
    },
    Disconnected {
        conn_id: ConnectionId,
    },
}

/// One open connection: its outbound queue and the player it speaks for.
///
/// `player_id` starts empty and is bound during the first handshake the
/// connection completes. Later handshakes may rebind it.
struct Connection {
    player_id: Option<u64>,
    sender: mpsc::UnboundedSender<Message>,
}

impl Connection {
    fn send(&self, frame: Message) -> bool {
        self.sender.send(frame).is_ok()
    }

    /// Whether the writer task at the socket end is still draining the queue.
    fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }
}

/// Delivery layer between the hub and the sockets.
///
/// Tracks which connections are open and which player each one speaks for,
/// and implements the three delivery shapes the hub asks for: a unicast
/// reply, a shared broadcast, and the personalized new-game fan-out.
pub struct Relay {
    connections: HashMap<ConnectionId, Connection>,
}

impl Relay {
    pub fn new() -> Self {
        Self {
            connections: HashMap::new(),
        }
    }

    fn register(&mut self, conn_id: ConnectionId, sender: mpsc::UnboundedSender<Message>) {
        self.connections.insert(
            conn_id,
            Connection {
                player_id: None,
                sender,
            },
        );
    }

    fn remove(&mut self, conn_id: ConnectionId) {
        self.connections.remove(&conn_id);
    }

    /// Records which player a connection speaks for. Every completed
    /// handshake passes through here, so a reconnecting client that presents
    /// its old id gets its new socket bound to it.
    fn bind_player(&mut self, conn_id: ConnectionId, player_id: u64) {
        if let Some(connection) = self.connections.get_mut(&conn_id) {
            connection.player_id = Some(player_id);
        }
    }

    fn unicast(&self, conn_id: ConnectionId, message: &ServerMessage) {
        if let Some(frame) = encode(message) {
            if let Some(connection) = self.connections.get(&conn_id) {
                if !connection.send(frame) {
                    debug!("Dropped reply for closed connection {}", conn_id);
                }
            }
        }
    }

    /// Sends one payload to every open connection, bound to a player or not.
    pub fn broadcast(&self, message: &ServerMessage) {
        if let Some(frame) = encode(message) {
            for (conn_id, connection) in &self.connections {
                if !connection.send(frame.clone()) {
                    debug!("Dropped broadcast for closed connection {}", conn_id);
                }
            }
        }
    }

    /// Answers a completed handshake.
    ///
    /// The requester's connection is bound to its player id before anything
    /// is delivered, so the requester takes part in its own fan-out. A plain
    /// handshake is a single reply; a new-game handshake restarts every
    /// connected player at the origin and sends each one its own copy of the
    /// fresh state.
    pub fn send_handshake(
        &mut self,
        hub: &mut Hub,
        conn_id: ConnectionId,
        maze: MazeLayout,
        me: PlayerState,
        players: Vec<PlayerState>,
        reset: bool,
    ) {
        self.bind_player(conn_id, me.id);

        if !reset {
            self.unicast(conn_id, &ServerMessage::NewGameUpdate { maze, me, players });
            return;
        }

        // Only players spoken for by a connection that is still open get
        // moved; a stored record behind a dead socket keeps its coordinates
        let bound: Vec<(ConnectionId, u64)> = self
            .connections
            .iter()
            .filter(|(_, connection)| connection.is_open())
            .filter_map(|(&id, connection)| connection.player_id.map(|pid| (id, pid)))
            .collect();
        hub.restart_positions(bound.iter().map(|&(_, pid)| pid));

        // One snapshot taken after the restarts, so every personalized copy
        // agrees with every other
        let roster = hub.roster_snapshot();
        let mut requester_serviced = false;

        for (target, player_id) in bound {
            let record = match hub.player(player_id) {
                Some(player) => player.clone(),
                None => continue,
            };

            self.unicast(
                target,
                &ServerMessage::NewGameUpdate {
                    maze: maze.clone(),
                    me: record,
                    players: roster.clone(),
                },
            );

            if target == conn_id {
                requester_serviced = true;
            }
        }

        // A handshake always gets an answer, even when the requester's
        // roster record disappeared before delivery
        if !requester_serviced {
            let mut me = me;
            me.reset_position();
            self.unicast(
                conn_id,
                &ServerMessage::NewGameUpdate {
                    maze,
                    me,
                    players: roster,
                },
            );
        }
    }

    /// One liveness pass: the hub prunes stale players, then the surviving
    /// roster goes out to every open connection.
    pub fn run_sweep(&self, hub: &mut Hub, now_ms: u64, timeout_ms: u64) {
        let report = hub.sweep(now_ms, timeout_ms);
        self.broadcast(&report);
        debug!("Sweep broadcast to {} connections", self.connections.len());
    }
}

fn encode(message: &ServerMessage) -> Option<Message> {
    match serde_json::to_string(message) {
        Ok(text) => Some(Message::Text(text)),
        Err(e) => {
            error!("Failed to serialize outbound message: {}", e);
            None
        }
    }
}

/// Main server coordinating WebSocket connections and session state
pub struct HubServer {
    listener: TcpListener,
    hub: Hub,
    relay: Relay,
    sweep_interval: Duration,
    player_timeout: Duration,
    next_conn_id: ConnectionId,

    // Communication channel from connection tasks
    event_tx: mpsc::UnboundedSender<HubEvent>,
    event_rx: mpsc::UnboundedReceiver<HubEvent>,
}

impl HubServer {
    pub async fn new(
        addr: &str,
        sweep_interval: Duration,
        player_timeout: Duration,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", addr);

        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Ok(HubServer {
            listener,
            hub: Hub::new(),
            relay: Relay::new(),
            sweep_interval,
            player_timeout,
            next_conn_id: 0,
            event_tx,
            event_rx,
        })
    }

    /// The address the listener actually bound. Useful when port 0 was
    /// requested and the OS picked one.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Spawns the socket tasks for one accepted connection.
    ///
    /// The reader half decodes text frames and forwards them to the server
    /// loop; undecodable frames are logged and dropped without closing the
    /// connection. The writer half drains the connection's outbound queue.
    fn spawn_connection_tasks(&self, conn_id: ConnectionId, stream: TcpStream, addr: SocketAddr) {
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    warn!("WebSocket handshake with {} failed: {}", addr, e);
                    return;
                }
            };
            info!("Client connected from {}", addr);

            let (mut ws_sink, mut ws_source) = ws_stream.split();
            let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();

            tokio::spawn(async move {
                while let Some(frame) = out_rx.recv().await {
                    if ws_sink.send(frame).await.is_err() {
                        break;
                    }
                }
            });

            if event_tx
                .send(HubEvent::Connected {
                    conn_id,
                    sender: out_tx,
                })
                .is_err()
            {
                return;
            }

            while let Some(frame) = ws_source.next().await {
                match frame {
                    Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(msg) => {
                            if event_tx.send(HubEvent::Inbound { conn_id, msg }).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            warn!("Failed to parse message from {}: {}", addr, e);
                        }
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {} // ping, pong and binary frames carry no game traffic
                    Err(e) => {
                        debug!("Connection error from {}: {}", addr, e);
                        break;
                    }
                }
            }

            info!("Client disconnected from {}", addr);
            let _ = event_tx.send(HubEvent::Disconnected { conn_id });
        });
    }

    /// Applies one event from a connection task against the session state.
    fn handle_event(&mut self, event: HubEvent) {
        match event {
            HubEvent::Connected { conn_id, sender } => {
                self.relay.register(conn_id, sender);
            }
            HubEvent::Inbound { conn_id, msg } => {
                match self.hub.handle(msg, get_timestamp()) {
                    Some(HubResponse::Handshake {
                        maze,
                        me,
                        players,
                        reset,
                    }) => {
                        self.relay
                            .send_handshake(&mut self.hub, conn_id, maze, me, players, reset);
                    }
                    Some(HubResponse::Broadcast(message)) => {
                        self.relay.broadcast(&message);
                    }
                    None => {}
                }
            }
            HubEvent::Disconnected { conn_id } => {
                self.relay.remove(conn_id);
            }
        }
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<()> {
        let mut sweep_timer = interval(self.sweep_interval);
        let timeout_ms = self.player_timeout.as_millis() as u64;

        info!("Server started successfully");

        loop {
            tokio::select! {
                // Accept new connections
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            let conn_id = self.next_conn_id;
                            self.next_conn_id += 1;
                            self.spawn_connection_tasks(conn_id, stream, addr);
                        }
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                        }
                    }
                },

                // Handle connection events
                event = self.event_rx.recv() => {
                    match event {
                        Some(event) => self.handle_event(event),
                        // Unreachable while the server holds its own sender
                        None => break,
                    }
                },

                // Periodic liveness sweep
                _ = sweep_timer.tick() => {
                    self.relay.run_sweep(&mut self.hub, get_timestamp(), timeout_ms);
                },
            }
        }

        Ok(())
    }
}
