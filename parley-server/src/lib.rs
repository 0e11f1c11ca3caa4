//! Socket RPC server over WebSocket
//!
//! A [`ParleyServer`] accepts WebSocket upgrades on a single path (`/rpc` by
//! default) and answers every request envelope with exactly one response.
//!
//! # Core Features
//!
//! - **Dispatch**: method name → [`Handler`], unknown methods get `-32601`
//! - **Concurrency**: each request runs on its own task; responses may go
//!   out in a different order than the requests came in
//! - **Containment**: handler errors and panics become `-32000` responses and
//!   never end the session
//! - **Chat**: `chat` and `screenAnalysis` backed by a [`Generator`]
//! - **Observability**: OpenTelemetry metrics and `tracing` spans
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use parley_server::{Attachment, BoxError, Generator, ParleyServer};
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl Generator for Echo {
//!     async fn generate(&self, prompt: &str, attachments: Vec<Attachment>) -> Result<String, BoxError> {
//!         Ok(format!("{} ({} images)", prompt, attachments.len()))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = ParleyServer::builder()
//!         .bind_str("127.0.0.1:3000")?
//!         .with_generator(Echo)
//!         .build()
//!         .await?;
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

mod builder;
mod chat;
mod connection;
mod dispatcher;
mod handler;
mod metrics;
mod registry;

pub use builder::{ServerBuilder, DEFAULT_PATH};
pub use chat::{Attachment, BoxError, ChatService, DataUrlError, Generator};
pub use dispatcher::Dispatcher;
pub use handler::{from_fn, from_typed_fn, AsyncHandler, Handler, HandlerResult};
pub use metrics::ServerMetrics;
pub use registry::{HandlerRegistry, RegistryBuilder};

use parley_core::{Error, Result};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct ParleyServer {
    listener: TcpListener,
    dispatcher: Dispatcher,
    path: Arc<str>,
    metrics: Option<Arc<ServerMetrics>>,
}

impl ParleyServer {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().map_err(|e| Error::Io(e.to_string()))
    }

    /// Path on which upgrades are accepted
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Registered method names
    pub fn methods(&self) -> Vec<String> {
        self.dispatcher.registry().methods()
    }

    /// Accept connections until the listener fails
    #[tracing::instrument(skip(self), name = "server.run")]
    pub async fn run(&self) -> Result<()> {
        tracing::info!("Starting parley server");
        let conn_counter = AtomicU64::new(0);

        loop {
            let (stream, addr) = self
                .listener
                .accept()
                .await
                .map_err(|e| Error::Io(e.to_string()))?;
            let conn_id = conn_counter.fetch_add(1, Ordering::SeqCst);
            let path = Arc::clone(&self.path);
            let dispatcher = self.dispatcher.clone();
            let metrics = self.metrics.clone();

            tracing::info!(conn_id = conn_id, addr = %addr, "New connection accepted");

            tokio::spawn(async move {
                if let Err(e) = connection::handle_connection(stream, conn_id, path, dispatcher, metrics).await {
                    tracing::warn!(conn_id = conn_id, error = %e, "Connection error");
                }
            });
        }
    }
}
