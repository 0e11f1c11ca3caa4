//! Socket RPC client over WebSocket
//!
//! [`ParleyClient`] multiplexes any number of concurrent calls over one
//! WebSocket. Each call gets a fresh UUID id and a slot in the pending-request
//! table; a background driver task reads frames and resolves the slot whose
//! id matches, regardless of arrival order.
//!
//! # Client Lifecycle
//!
//! 1. **Connect**: open the transport within the connect timeout
//! 2. **Call**: issue requests while the connection is `Open`
//! 3. **Reconnect** (optional): on unexpected loss the driver retries with the
//!    configured strategy; pending calls are not replayed
//! 4. **Close**: cancel pending calls, stop the driver, close the transport
//!
//! # Cloning
//!
//! `ParleyClient` is cheaply cloneable. All clones share the same connection,
//! pending table and event stream.

use crate::connection_state::{ConnectionManager, ConnectionState};
use crate::events::{ClientEvent, EventBus};
use crate::metrics::ClientMetrics;
use crate::request::RequestManager;
use crate::writer::FrameWriter;
use crate::ClientBuilder;
use futures::stream::SplitStream;
use futures::StreamExt;
use parley_core::chat::{CHAT_METHOD, SCREEN_ANALYSIS_METHOD};
use parley_core::{
    codec, ChatParams, ChatReply, Error, Message as Envelope, Request, RequestId, Result,
    ScreenAnalysisParams,
};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSource = SplitStream<WsStream>;

/// Upper bound on the close handshake during `close()`
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Timeouts and endpoint of a client
#[derive(Debug, Clone)]
pub(crate) struct ClientConfig {
    pub(crate) url: String,
    pub(crate) connect_timeout: Duration,
    pub(crate) request_timeout: Duration,
}

/// State shared by every clone of a client and its driver task
pub(crate) struct Shared {
    config: ClientConfig,
    connection: ConnectionManager,
    requests: RequestManager,
    writer: Mutex<Option<FrameWriter>>,
    events: EventBus,
    closing: AtomicBool,
    driver: std::sync::Mutex<Option<JoinHandle<()>>>,
    metrics: Option<Arc<ClientMetrics>>,
}

/// Socket RPC client over WebSocket
#[derive(Clone)]
pub struct ParleyClient {
    shared: Arc<Shared>,
}

impl ParleyClient {
    pub(crate) fn from_parts(
        config: ClientConfig,
        connection: ConnectionManager,
        requests: RequestManager,
        metrics: Option<Arc<ClientMetrics>>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                connection,
                requests,
                writer: Mutex::new(None),
                events: EventBus::new(),
                closing: AtomicBool::new(false),
                driver: std::sync::Mutex::new(None),
                metrics,
            }),
        }
    }

    /// Start configuring a client for `url`
    pub fn builder(url: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(url)
    }

    /// Connect to `url` with default settings (10 s connect timeout, 30 s
    /// request timeout, default exponential backoff)
    pub async fn open(url: &str) -> Result<Self> {
        ClientBuilder::new(url).connect().await
    }

    /// Open the transport
    ///
    /// Fails with `ConnectionTimeout` when the handshake does not complete in
    /// time. A failed attempt still schedules background reconnection when a
    /// strategy is configured. Calling this after `close()` or after
    /// reconnection gave up re-arms the client. Returns immediately when the
    /// connection is already open.
    #[tracing::instrument(skip(self), fields(url = %self.shared.config.url))]
    pub async fn connect(&self) -> Result<()> {
        if self.state() == ConnectionState::Open {
            return Ok(());
        }

        let shared = &self.shared;
        shared.closing.store(false, Ordering::SeqCst);
        shared.abort_driver();
        shared.connection.reset_attempts();
        shared.set_state(ConnectionState::Connecting);

        tracing::info!("Connecting to server");
        match shared.open_transport().await {
            Ok(source) => {
                tracing::info!("Connected successfully");
                shared.spawn_driver(Some(source));
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "Initial connection failed");
                shared.events.emit(ClientEvent::Error(err.to_string()));
                if shared.connection.can_reconnect().await {
                    shared.spawn_driver(None);
                } else {
                    shared.set_state(ConnectionState::Disconnected);
                }
                Err(err)
            }
        }
    }

    /// Call `method` and return the raw JSON result
    ///
    /// Resolves exactly once with the result, `Remote` for an error response,
    /// `RequestTimeout` when nothing matched within the request timeout, or
    /// `Cancelled` if the client is closed first. Fails immediately with
    /// `NotConnected` unless the connection is open.
    #[tracing::instrument(skip(self, params), fields(method = %method))]
    pub async fn call_value(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value> {
        let start = Instant::now();
        let outcome = self.shared.call(method, params).await;

        if let Some(ref m) = self.shared.metrics {
            m.record_call(method, &outcome, start.elapsed().as_secs_f64());
        }
        match &outcome {
            Ok(_) => tracing::debug!("Call succeeded"),
            Err(e) => tracing::warn!(error = %e, "Call failed"),
        }
        outcome
    }

    /// Call `method` with serializable params and deserialize the result
    ///
    /// Params that serialize to `null` are omitted from the envelope.
    pub async fn call<P, R>(&self, method: &str, params: P) -> Result<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let params = match codec::to_value(&params)? {
            serde_json::Value::Null => None,
            value => Some(value),
        };
        let result = self.call_value(method, params).await?;
        codec::from_value(result)
    }

    /// Send one chat turn
    pub async fn chat(&self, params: ChatParams) -> Result<ChatReply> {
        self.call(CHAT_METHOD, params).await
    }

    /// Ask about a screen capture
    pub async fn analyze_screen(&self, params: ScreenAnalysisParams) -> Result<ChatReply> {
        self.call(SCREEN_ANALYSIS_METHOD, params).await
    }

    /// Cancel every pending call and close the transport
    ///
    /// Pending calls fail with `Cancelled`; no reconnection is attempted.
    /// Calling `close()` again is a no-op.
    #[tracing::instrument(skip(self), fields(url = %self.shared.config.url))]
    pub async fn close(&self) {
        let shared = &self.shared;
        if shared.closing.swap(true, Ordering::SeqCst) {
            return;
        }

        let previous = shared.set_state(ConnectionState::Closing);
        shared.abort_driver();

        let cancelled = shared.requests.fail_all(Error::Cancelled).await;

        let writer = shared.writer.lock().await.take();
        if let Some(writer) = writer {
            writer.shutdown(CLOSE_GRACE).await;
        }

        shared.set_state(ConnectionState::Disconnected);
        if previous != ConnectionState::Disconnected {
            shared.events.emit(ClientEvent::Disconnected);
        }
        tracing::info!(cancelled, "Client closed");
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.shared.connection.state()
    }

    /// True while calls are accepted
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Watch connection state transitions
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.shared.connection.subscribe()
    }

    /// Subscribe to connection events and inbound responses
    pub fn events(&self) -> broadcast::Receiver<ClientEvent> {
        self.shared.events.subscribe()
    }

    /// Number of calls awaiting a response
    pub async fn pending_count(&self) -> usize {
        self.shared.requests.pending_count().await
    }

    /// Endpoint this client connects to
    pub fn url(&self) -> &str {
        &self.shared.config.url
    }
}

impl Shared {
    fn set_state(&self, state: ConnectionState) -> ConnectionState {
        if let Some(ref m) = self.metrics {
            m.update_connection_state(state);
        }
        self.connection.set_state(state)
    }

    fn is_closing(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }

    fn spawn_driver(self: &Arc<Self>, source: Option<WsSource>) {
        let handle = tokio::spawn(Arc::clone(self).drive(source));
        let mut driver = self.driver.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(old) = driver.replace(handle) {
            old.abort();
        }
    }

    fn abort_driver(&self) {
        let mut driver = self.driver.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(handle) = driver.take() {
            handle.abort();
        }
    }

    /// Handshake, start the writer, and mark the connection open
    async fn open_transport(&self) -> Result<WsSource> {
        let url = self.config.url.as_str();
        let (ws_stream, _) = match tokio::time::timeout(self.config.connect_timeout, connect_async(url)).await {
            Err(_) => return Err(Error::ConnectionTimeout(self.config.connect_timeout)),
            Ok(Err(e)) => return Err(Error::WebSocket(e.to_string())),
            Ok(Ok(pair)) => pair,
        };

        let (sink, source) = ws_stream.split();
        let writer = FrameWriter::spawn(sink);

        // close() may have started while the handshake was in flight; it
        // always takes this lock after raising the flag.
        let mut slot = self.writer.lock().await;
        if self.is_closing() {
            drop(slot);
            writer.shutdown(CLOSE_GRACE).await;
            return Err(Error::Cancelled);
        }
        if let Some(stale) = slot.replace(writer) {
            stale.abort();
        }
        self.connection.opened().await;
        if let Some(ref m) = self.metrics {
            m.update_connection_state(ConnectionState::Open);
        }
        drop(slot);

        self.events.emit(ClientEvent::Connected);
        Ok(source)
    }

    async fn call(&self, method: &str, params: Option<serde_json::Value>) -> Result<serde_json::Value> {
        let deadline = tokio::time::Instant::now() + self.config.request_timeout;
        if self.connection.state() != ConnectionState::Open {
            return Err(Error::NotConnected);
        }

        let id = RequestId::new_v4();
        let text = codec::encode(&Request::new(method, params, id.clone()))?;
        let mut rx = self.requests.register(id.clone(), method).await?;

        // Enqueue only; the writer task owns the socket.
        let queued = match self.writer.lock().await.as_ref() {
            Some(writer) => writer.send(Message::Text(text)),
            None => Err(Error::NotConnected),
        };
        if let Err(e) = queued {
            self.requests.discard(&id).await;
            return Err(e);
        }
        tracing::debug!(request_id = %id, "Request queued, waiting for response");

        let response = match tokio::time::timeout_at(deadline, &mut rx).await {
            Ok(Ok(resolved)) => resolved?,
            Ok(Err(_)) => return Err(Error::Internal("pending request dropped".to_string())),
            Err(_) => {
                if self.requests.discard(&id).await {
                    return Err(Error::RequestTimeout);
                }
                // Resolved at the same instant the deadline fired.
                match rx.try_recv() {
                    Ok(resolved) => resolved?,
                    Err(_) => return Err(Error::RequestTimeout),
                }
            }
        };

        response.into_result().map_err(Error::Remote)
    }

    /// Connection driver: read until the transport drops, then reconnect
    async fn drive(self: Arc<Self>, source: Option<WsSource>) {
        let mut source = match source {
            Some(source) => source,
            None => match self.reconnect().await {
                Some(source) => source,
                None => return,
            },
        };

        loop {
            self.read_until_closed(&mut source).await;
            if self.is_closing() {
                return;
            }

            tracing::info!("Connection lost");
            let writer = self.writer.lock().await.take();
            if let Some(writer) = writer {
                writer.abort();
            }
            self.events.emit(ClientEvent::Disconnected);

            source = match self.reconnect().await {
                Some(source) => source,
                None => return,
            };
        }
    }

    #[tracing::instrument(skip(self), fields(url = %self.config.url))]
    async fn reconnect(&self) -> Option<WsSource> {
        if !self.connection.can_reconnect().await {
            self.set_state(ConnectionState::Disconnected);
            return None;
        }

        loop {
            if self.is_closing() {
                return None;
            }

            let Some((attempt, delay)) = self.connection.next_reconnect_delay().await else {
                let attempts = self.connection.attempts();
                tracing::error!(attempts, "Reconnection abandoned (max attempts reached)");
                self.set_state(ConnectionState::Disconnected);
                self.events.emit(ClientEvent::ReconnectFailed { attempts });
                return None;
            };

            if let Some(ref m) = self.metrics {
                m.update_connection_state(ConnectionState::Reconnecting { attempt });
                m.record_reconnection_attempt();
            }
            tracing::info!(attempt, delay_ms = delay.as_millis() as u64, "Reconnecting");
            self.events.emit(ClientEvent::Reconnecting { attempt, delay });

            tokio::time::sleep(delay).await;
            if self.is_closing() {
                return None;
            }

            match self.open_transport().await {
                Ok(source) => {
                    tracing::info!(attempt, "Reconnected successfully");
                    if let Some(ref m) = self.metrics {
                        m.record_reconnection_success();
                    }
                    return Some(source);
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "Reconnection failed");
                    if let Some(ref m) = self.metrics {
                        m.record_error("reconnection");
                    }
                    self.events.emit(ClientEvent::Error(e.to_string()));
                }
            }
        }
    }

    async fn read_until_closed(&self, source: &mut WsSource) {
        while let Some(frame) = source.next().await {
            match frame {
                Ok(Message::Text(text)) => self.handle_text(&text).await,
                Ok(Message::Close(frame)) => {
                    tracing::info!(?frame, "Connection closed by server");
                    break;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "WebSocket error");
                    if let Some(ref m) = self.metrics {
                        m.record_error("websocket");
                    }
                    self.events.emit(ClientEvent::Error(e.to_string()));
                    break;
                }
                Ok(_) => {}
            }
        }
    }

    async fn handle_text(&self, text: &str) {
        match codec::decode(text) {
            Ok(Envelope::Response(response)) => {
                self.events.emit(ClientEvent::Message(response.clone()));
                let id = response.id.clone();
                if !self.requests.complete(response).await {
                    tracing::debug!(request_id = ?id, "Dropping response with no pending request");
                    if let Some(ref m) = self.metrics {
                        m.record_unmatched_response();
                    }
                }
            }
            Ok(Envelope::Request(request)) => {
                tracing::warn!(method = %request.method, "Received unexpected request message");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to decode inbound message");
                if let Some(ref m) = self.metrics {
                    m.record_error("decode");
                }
                self.events.emit(ClientEvent::Error(e.to_string()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_call_before_connect_is_not_connected() {
        let client = ClientBuilder::new("ws://127.0.0.1:9/rpc").build();

        let result = client.call_value("chat", None).await;
        assert!(matches!(result, Err(Error::NotConnected)));
        assert_eq!(client.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_close_unconnected_client_is_quiet() {
        let client = ClientBuilder::new("ws://127.0.0.1:9/rpc").build();
        let mut events = client.events();

        client.close().await;
        client.close().await;

        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let client = ClientBuilder::new("ws://127.0.0.1:9/rpc").build();
        let clone = client.clone();

        client.shared.set_state(ConnectionState::Closing);
        assert_eq!(clone.state(), ConnectionState::Closing);
    }
}
