//! Socket RPC client over WebSocket
//!
//! A [`ParleyClient`] keeps one persistent WebSocket to a parley server and
//! multiplexes concurrent calls over it.
//!
//! # Core Features
//!
//! - **Request correlation**: UUID ids, responses matched strictly by id
//! - **Timeouts**: 10 s connect timeout, 30 s per-call timeout (configurable)
//! - **Auto-Reconnection**: exponential backoff 1, 2, 4, 8, 10 s by default
//! - **At-most-once**: calls are never replayed after a reconnect
//! - **Cancellation**: `close()` fails every pending call with `Cancelled`
//! - **Events**: connection lifecycle and inbound responses on a broadcast stream
//! - **Observability**: OpenTelemetry metrics and `tracing` spans
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use parley_client::ParleyClient;
//! use parley_core::ChatParams;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ParleyClient::open("ws://localhost:3000/rpc").await?;
//!
//!     let reply = client.chat(ChatParams::text("hi")).await?;
//!     println!("{} ({})", reply.message, reply.timestamp);
//!
//!     let raw: serde_json::Value = client.call("echo", serde_json::json!({"x": 1})).await?;
//!     println!("{}", raw);
//!
//!     client.close().await;
//!     Ok(())
//! }
//! ```

mod client;
mod client_builder;
mod connection_state;
mod events;
mod metrics;
mod reconnect;
mod request;
mod writer;

pub use client::ParleyClient;
pub use client_builder::{ClientBuilder, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT};
pub use connection_state::{ConnectionManager, ConnectionState};
pub use events::{ClientEvent, EventBus};
pub use metrics::ClientMetrics;
pub use reconnect::{ExponentialBackoff, FixedDelay, NoReconnect, ReconnectionStrategy};
pub use request::RequestManager;
