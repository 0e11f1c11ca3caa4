//! Per-connection session
//!
//! # Connection Lifecycle
//!
//! 1. **Upgrade**: the WebSocket handshake is accepted only on the configured
//!    path; any other path gets an HTTP 404 and no session
//! 2. **Process**: every text frame is dispatched on its own task
//! 3. **Cleanup**: when either side of the socket ends, the other is aborted
//!
//! # Task Model
//!
//! - **Receive task**: reads frames and spawns one dispatch task per request
//! - **Send task**: writes responses from an unbounded channel
//!
//! Dispatch tasks hold a sender clone, so responses go out in completion
//! order rather than arrival order. A session keeps no state across requests.

use crate::dispatcher::Dispatcher;
use crate::metrics::ServerMetrics;
use futures::{SinkExt, StreamExt};
use parley_core::{codec, Error, Result};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;

#[tracing::instrument(skip(stream, path, dispatcher, metrics), fields(conn_id = conn_id))]
pub(crate) async fn handle_connection(
    stream: TcpStream,
    conn_id: u64,
    path: Arc<str>,
    dispatcher: Dispatcher,
    metrics: Option<Arc<ServerMetrics>>,
) -> Result<()> {
    tracing::debug!("Upgrading connection to WebSocket");
    let ws_stream = accept_hdr_async(stream, |req: &Request, resp: Response| check_path(&path, req, resp))
        .await
        .map_err(|e| Error::WebSocket(e.to_string()))?;

    if let Some(ref m) = metrics {
        m.record_connection_opened();
    }
    tracing::info!("Session opened");

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = ws_sender.send(msg).await {
                tracing::error!(error = %e, "Error sending message");
                break;
            }
        }
    });

    let recv_metrics = metrics.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(message) = ws_receiver.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    let dispatcher = dispatcher.clone();
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        let response = dispatcher.on_message(&text).await;
                        match codec::encode(&response) {
                            Ok(out) => {
                                if tx.send(Message::Text(out)).is_err() {
                                    tracing::debug!("Session ended before the response was written");
                                }
                            }
                            Err(e) => tracing::error!(error = %e, "Failed to encode response"),
                        }
                    });
                }
                Ok(Message::Close(_)) => {
                    tracing::info!("Connection closed by client");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "WebSocket error");
                    if let Some(ref m) = recv_metrics {
                        m.record_error("websocket");
                    }
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }

    if let Some(ref m) = metrics {
        m.record_connection_closed();
    }
    tracing::info!("Session closed");

    Ok(())
}

/// Handshake callback accepting only `path`
fn check_path(path: &str, req: &Request, resp: Response) -> std::result::Result<Response, ErrorResponse> {
    if req.uri().path() == path {
        return Ok(resp);
    }

    tracing::info!(requested = %req.uri().path(), "Rejecting upgrade on unknown path");
    let mut rejection = ErrorResponse::new(Some("not found".to_string()));
    *rejection.status_mut() = StatusCode::NOT_FOUND;
    Err(rejection)
}
