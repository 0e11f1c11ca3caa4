//! Common test utilities for parley-server integration tests
//!
//! Servers are bound to an ephemeral port and driven either through
//! `parley-client` or through a raw WebSocket when the test needs to send
//! frames the client would never produce.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use parley_client::{ClientBuilder, ParleyClient};
use parley_server::{Attachment, BoxError, Generator, ServerBuilder};
use serde_json::Value;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

pub type RawSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Answers "hi" with "hello" and echoes everything else
pub struct Greeter;

#[async_trait]
impl Generator for Greeter {
    async fn generate(&self, prompt: &str, attachments: Vec<Attachment>) -> Result<String, BoxError> {
        match (prompt, attachments.len()) {
            ("hi", 0) => Ok("hello".to_string()),
            (_, 0) => Ok(format!("echo: {}", prompt)),
            (_, n) => Ok(format!("echo: {} [{} image(s), {}]", prompt, n, attachments[0].mime_type)),
        }
    }
}

/// Always fails
pub struct Unavailable;

#[async_trait]
impl Generator for Unavailable {
    async fn generate(&self, _: &str, _: Vec<Attachment>) -> Result<String, BoxError> {
        Err("generator unavailable".into())
    }
}

/// Bind `builder` to an ephemeral port and run it in the background
pub async fn spawn_server(builder: ServerBuilder) -> SocketAddr {
    let server = builder.bind_str("127.0.0.1:0").unwrap().build().await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = server.run().await;
    });
    addr
}

pub fn rpc_url(addr: SocketAddr) -> String {
    format!("ws://{}/rpc", addr)
}

/// Connected client without reconnection
pub async fn connect_client(addr: SocketAddr) -> ParleyClient {
    ClientBuilder::new(rpc_url(addr))
        .without_reconnect()
        .request_timeout(Duration::from_secs(5))
        .connect()
        .await
        .unwrap()
}

pub async fn raw_socket(addr: SocketAddr) -> RawSocket {
    let (ws, _) = connect_async(rpc_url(addr)).await.unwrap();
    ws
}

pub async fn send_text(ws: &mut RawSocket, text: &str) {
    ws.send(Message::Text(text.to_string())).await.unwrap();
}

/// Next text frame as JSON, or None after 5 s
pub async fn next_json(ws: &mut RawSocket) -> Option<Value> {
    tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(Ok(msg)) = ws.next().await {
            if let Message::Text(text) = msg {
                return serde_json::from_str(&text).ok();
            }
        }
        None
    })
    .await
    .ok()
    .flatten()
}
