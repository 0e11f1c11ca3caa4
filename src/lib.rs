//! parley - socket RPC for a generative chat front-end
//!
//! Convenience crate re-exporting the parley sub-crates:
//!
//! - **parley-core**: envelopes, codec, error taxonomy, chat payloads, observability
//! - **parley-server**: WebSocket dispatcher and the chat methods
//! - **parley-client**: reconnecting client multiplexing calls over one socket
//!
//! # Quick Start - Server
//!
//! ```rust,no_run
//! use parley::server::from_typed_fn;
//! use parley::core::{ChatParams, ChatReply};
//! use parley::ParleyServer;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = ParleyServer::builder()
//!         .bind_str("127.0.0.1:3000")?
//!         .handler("chat", from_typed_fn(|p: ChatParams| async move {
//!             Ok(ChatReply { message: p.message, timestamp: String::new() })
//!         }))
//!         .build()
//!         .await?;
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Quick Start - Client
//!
//! ```rust,no_run
//! use parley::core::ChatParams;
//! use parley::ParleyClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ParleyClient::open("ws://localhost:3000/rpc").await?;
//!
//!     let reply = client.chat(ChatParams::text("hi")).await?;
//!     println!("{}", reply.message);
//!
//!     client.close().await;
//!     Ok(())
//! }
//! ```

pub use parley_client as client;
pub use parley_core as core;
pub use parley_server as server;

pub use parley_client::ParleyClient;
pub use parley_server::ParleyServer;
