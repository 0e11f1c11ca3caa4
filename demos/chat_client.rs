//! Chat client with automatic reconnection
//!
//! Run the server first:
//! ```bash
//! cargo run --example chat_server
//! ```
//!
//! Then run this client:
//! ```bash
//! cargo run --example chat_client
//! ```
//!
//! Stop and restart the server to watch the client reconnect. Calls issued
//! while the connection is down fail fast and are never replayed.

use parley::client::{ClientBuilder, ClientEvent, ExponentialBackoff};
use parley::core::ChatParams;
use std::time::Duration;

// 1x1 transparent PNG
const PIXEL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let strategy = ExponentialBackoff::default().with_jitter();
    let client = ClientBuilder::new("ws://127.0.0.1:3000/rpc")
        .with_reconnect(Box::new(strategy))
        .request_timeout(Duration::from_secs(30))
        .connect()
        .await?;

    let mut events = client.events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                ClientEvent::Message(_) => {}
                other => println!("[event] {:?}", other),
            }
        }
    });

    let reply = client.chat(ChatParams::text("hi")).await?;
    println!("{} -> {}", reply.timestamp, reply.message);

    let reply = client.chat(ChatParams::text("what is this?").with_image(PIXEL)).await?;
    println!("{} -> {}", reply.timestamp, reply.message);

    let mut turn = 1;
    loop {
        tokio::time::sleep(Duration::from_secs(5)).await;
        match client.chat(ChatParams::text(format!("turn {}", turn))).await {
            Ok(reply) => println!("[{:?}] {}", client.state(), reply.message),
            Err(e) => println!("[{:?}] error: {}", client.state(), e),
        }
        turn += 1;
    }
}
