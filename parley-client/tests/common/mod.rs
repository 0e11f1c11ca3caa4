//! Common test utilities for parley-client integration tests
//!
//! A scriptable WebSocket server: every inbound text frame is handed to a
//! handler that returns what the server should do next.

#![allow(dead_code)]

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// What the mock server does in reaction to one inbound frame
pub enum Reply {
    /// Send this text frame
    Send(String),
    /// Wait, then send this text frame
    After(Duration, String),
    /// Drop the TCP connection without a close handshake
    Sever,
}

/// Mock WebSocket server for client testing
pub struct MockWsServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    message_rx: mpsc::Receiver<String>,
    connections: Arc<AtomicUsize>,
}

impl MockWsServer {
    /// Server that never answers
    pub async fn silent() -> Self {
        Self::with_handler(|_| Vec::new()).await
    }

    /// Server that completes the upgrade and then never reads another frame
    ///
    /// Once the socket buffers fill, every write from the client blocks.
    pub async fn stalled() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let (_msg_tx, msg_rx) = mpsc::channel::<String>(1);
        let connections = Arc::new(AtomicUsize::new(0));
        let accepted = connections.clone();

        tokio::spawn(async move {
            let mut held = Vec::new();
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    accept_result = listener.accept() => {
                        let Ok((stream, _)) = accept_result else { continue };
                        accepted.fetch_add(1, Ordering::SeqCst);
                        if let Ok(ws_stream) = accept_async(stream).await {
                            held.push(ws_stream);
                        }
                    }
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            message_rx: msg_rx,
            connections,
        }
    }

    /// Server whose reactions are decided by `handler`
    pub async fn with_handler<F>(handler: F) -> Self
    where
        F: Fn(String) -> Vec<Reply> + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let (msg_tx, msg_rx) = mpsc::channel::<String>(100);
        let handler = Arc::new(handler);
        let connections = Arc::new(AtomicUsize::new(0));
        let accepted = connections.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    accept_result = listener.accept() => {
                        let Ok((stream, _)) = accept_result else { continue };
                        let msg_tx = msg_tx.clone();
                        let handler = handler.clone();
                        accepted.fetch_add(1, Ordering::SeqCst);

                        tokio::spawn(async move {
                            let Ok(ws_stream) = accept_async(stream).await else { return };
                            let (mut write, mut read) = ws_stream.split();

                            while let Some(Ok(msg)) = read.next().await {
                                let Message::Text(text) = msg else { continue };
                                let _ = msg_tx.send(text.clone()).await;

                                for reply in handler(text) {
                                    match reply {
                                        Reply::Send(out) => {
                                            let _ = write.send(Message::Text(out)).await;
                                        }
                                        Reply::After(delay, out) => {
                                            tokio::time::sleep(delay).await;
                                            let _ = write.send(Message::Text(out)).await;
                                        }
                                        Reply::Sever => return,
                                    }
                                }
                            }
                        });
                    }
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            message_rx: msg_rx,
            connections,
        }
    }

    /// WebSocket URL of this server
    pub fn url(&self) -> String {
        format!("ws://{}/rpc", self.addr)
    }

    /// Number of TCP connections accepted so far
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Next frame received by the server, or None after 5 s
    pub async fn wait_for_message(&mut self) -> Option<String> {
        tokio::time::timeout(Duration::from_secs(5), self.message_rx.recv())
            .await
            .ok()
            .flatten()
    }

    /// Stop accepting connections
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

/// Id of a request frame
pub fn request_id(request: &str) -> String {
    let value: Value = serde_json::from_str(request).unwrap();
    value["id"].as_str().unwrap().to_string()
}

/// Method of a request frame
pub fn request_method(request: &str) -> String {
    let value: Value = serde_json::from_str(request).unwrap();
    value["method"].as_str().unwrap_or_default().to_string()
}

/// Success response answering `request`
pub fn reply_result(request: &str, result: Value) -> String {
    json!({"id": request_id(request), "result": result}).to_string()
}

/// Error response answering `request`
pub fn reply_error(request: &str, code: i32, message: &str) -> String {
    json!({"id": request_id(request), "error": {"code": code, "message": message}}).to_string()
}

/// Params large enough to overflow the loopback socket buffers
pub fn oversized_params() -> Value {
    json!({"message": "x".repeat(64 << 20)})
}

/// A port on which nothing is listening
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("ws://{}/rpc", addr)
}
