use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use serde_json::json;
use server::utils::get_timestamp;
use shared::{ClientMessage, MoveMode, ServerMessage};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

async fn send_message(
    sink: &mut WsSink,
    message: &ClientMessage,
) -> Result<(), Box<dyn std::error::Error>> {
    let text = serde_json::to_string(message)?;
    sink.send(Message::Text(text)).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ws://127.0.0.1:3000".to_string());

    // Connect to the hub
    println!("Connecting to {}", url);
    let (ws_stream, _) = connect_async(&url).await?;
    println!("Connected");

    let (mut write, mut read) = ws_stream.split();
    let start_ms = get_timestamp();

    // Offer a maze and ask for a fresh game
    let handshake = ClientMessage::MazeUpdate {
        maze: json!({"seed": 42, "width": 8, "height": 8}),
        new_game: true,
        id: None,
    };
    println!("Sending handshake");
    send_message(&mut write, &handshake).await?;

    // Wait for the personalized reply; sweep broadcasts may interleave
    println!("Waiting for the game handshake...");
    let (my_id, maze) = loop {
        match read.next().await {
            Some(Ok(Message::Text(text))) => match serde_json::from_str::<ServerMessage>(&text) {
                Ok(ServerMessage::NewGameUpdate { maze, me, players }) => {
                    println!(
                        "Joined as player {} with {} player(s) in the maze",
                        me.id,
                        players.len()
                    );
                    break (me.id, maze);
                }
                Ok(other) => println!("Received: {:?}", other),
                Err(e) => println!("Failed to parse server message: {}", e),
            },
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(e.into()),
            None => {
                println!("Server closed the connection before the handshake");
                return Ok(());
            }
        }
    };
    println!("Maze layout: {}", maze);

    // Wander around the maze, reporting position and proving liveness
    let mut rng = rand::thread_rng();
    let mut x: f32 = 0.0;
    let mut y: f32 = 0.0;

    for i in 0..15 {
        x += rng.gen_range(-1.0..1.0);
        y += rng.gen_range(-1.0..1.0);
        let mode = if rng.gen_bool(0.2) {
            MoveMode::Normal
        } else {
            MoveMode::Vim
        };

        let movement = ClientMessage::PlayerStateUpdate {
            id: my_id,
            x,
            y,
            mode,
        };
        println!("Sending move {} to ({:.1}, {:.1})", i + 1, x, y);
        send_message(&mut write, &movement).await?;

        if i % 3 == 0 {
            send_message(&mut write, &ClientMessage::KeepAlive { id: my_id }).await?;
        }

        // Print whatever the hub pushed before moving on
        loop {
            match timeout(Duration::from_millis(200), read.next()).await {
                Ok(Some(Ok(Message::Text(text)))) => {
                    match serde_json::from_str::<ServerMessage>(&text) {
                        Ok(ServerMessage::StateUpdate { players }) => {
                            println!("State update - {} player(s)", players.len());
                            for p in &players {
                                println!("  Player {}: ({:.1}, {:.1})", p.id, p.x, p.y);
                            }
                        }
                        Ok(other) => println!("Received: {:?}", other),
                        Err(e) => println!("Failed to parse server message: {}", e),
                    }
                }
                Ok(Some(Ok(_))) => {}
                Ok(Some(Err(e))) => {
                    println!("Connection error: {}", e);
                    return Ok(());
                }
                Ok(None) => {
                    println!("Server closed the connection");
                    return Ok(());
                }
                Err(_) => break,
            }
        }
    }

    // Claim the finish and watch it echo back
    let finish = ClientMessage::WinnerUpdate {
        result: json!({"winner": my_id, "timeMs": get_timestamp() - start_ms}),
    };
    println!("Reporting the finish");
    send_message(&mut write, &finish).await?;

    while let Ok(Some(Ok(Message::Text(text)))) =
        timeout(Duration::from_millis(500), read.next()).await
    {
        match serde_json::from_str::<ServerMessage>(&text) {
            Ok(message) => println!("Received: {:?}", message),
            Err(e) => println!("Failed to parse server message: {}", e),
        }
    }

    write.send(Message::Close(None)).await?;
    println!("Test client finished");

    Ok(())
}
