//! Core wire types and codec for parley
//!
//! parley is a small socket RPC protocol: a client multiplexes concurrent
//! request/response pairs over one persistent WebSocket, and a server-side
//! dispatcher routes each request to a handler by method name. This crate
//! holds the pieces both sides share:
//!
//! - **Types**: the request/response envelope and correlation ids
//! - **Codec**: encoding and classification of inbound envelopes
//! - **Error handling**: the local error taxonomy and the wire error object
//! - **Chat**: params and reply payloads of the chat methods
//! - **Observability**: tracing subscriber and OpenTelemetry setup
//!
//! The `parley-server` and `parley-client` crates provide the WebSocket
//! transport on top of these.
//!
//! # Example
//!
//! ```rust
//! use parley_core::{codec, Message, Request, RequestId};
//!
//! let request = Request::new("chat", Some(serde_json::json!({"message": "hi"})), RequestId::new_v4());
//! let json = codec::encode(&request).unwrap();
//!
//! match codec::decode(&json).unwrap() {
//!     Message::Request(decoded) => assert_eq!(decoded.method, "chat"),
//!     Message::Response(_) => unreachable!(),
//! }
//! ```

pub mod chat;
pub mod codec;
pub mod error;
pub mod observability;
pub mod types;

pub use chat::{ChatParams, ChatReply, ScreenAnalysisParams};
pub use error::{Error, ErrorObject, Result};
pub use observability::{
    init_logging, init_observability, shutdown_observability, ObservabilityConfig,
};
pub use types::{Message, Outcome, Request, RequestId, Response};
