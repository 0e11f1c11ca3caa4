//! Server builder for constructing parley servers
//!
//! # Examples
//!
//! ```rust,no_run
//! use parley_server::{from_fn, ParleyServer};
//!
//! # async fn example() -> parley_core::Result<()> {
//! let server = ParleyServer::builder()
//!     .bind_str("127.0.0.1:3000")?
//!     .path("/rpc")
//!     .handler("ping", from_fn(|_| async { Ok(serde_json::json!("pong")) }))
//!     .with_default_observability()
//!     .build()
//!     .await?;
//!
//! server.run().await
//! # }
//! ```

use crate::chat::{ChatService, Generator};
use crate::{Dispatcher, Handler, HandlerRegistry, ParleyServer, ServerMetrics};
use parley_core::{Error, ObservabilityConfig, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Upgrade path used when none is configured
pub const DEFAULT_PATH: &str = "/rpc";

pub struct ServerBuilder {
    addr: Option<SocketAddr>,
    path: String,
    registry: HandlerRegistry,
    observability_config: Option<ObservabilityConfig>,
    service_name: Option<String>,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            addr: None,
            path: DEFAULT_PATH.to_string(),
            registry: HandlerRegistry::new(),
            observability_config: None,
            service_name: None,
        }
    }

    pub fn bind(mut self, addr: impl Into<SocketAddr>) -> Self {
        self.addr = Some(addr.into());
        self
    }

    pub fn bind_str(mut self, addr: &str) -> Result<Self> {
        let addr: SocketAddr = addr
            .parse()
            .map_err(|e| Error::Internal(format!("Invalid address: {}", e)))?;
        self.addr = Some(addr);
        Ok(self)
    }

    /// Only accept WebSocket upgrades on `path`
    pub fn path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.path = if path.starts_with('/') { path } else { format!("/{}", path) };
        self
    }

    pub fn handler(mut self, method: impl Into<String>, handler: Box<dyn Handler>) -> Self {
        self.registry.register(method, handler);
        self
    }

    pub fn registry(mut self, registry: HandlerRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Serve `chat` and `screenAnalysis` from `generator`
    pub fn with_generator(self, generator: impl Generator + 'static) -> Self {
        self.with_shared_generator(Arc::new(generator))
    }

    pub fn with_shared_generator(mut self, generator: Arc<dyn Generator>) -> Self {
        for (method, handler) in ChatService::new(generator).into_handlers() {
            self.registry.register(method, handler);
        }
        self
    }

    pub fn with_observability(mut self, config: ObservabilityConfig) -> Self {
        self.observability_config = Some(config);
        self
    }

    pub fn with_default_observability(mut self) -> Self {
        self.observability_config = Some(ObservabilityConfig::default());
        self
    }

    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    pub async fn build(self) -> Result<ParleyServer> {
        let addr = self
            .addr
            .ok_or_else(|| Error::Internal("No bind address specified".to_string()))?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Io(e.to_string()))?;

        let metrics = if let Some(mut config) = self.observability_config {
            if let Some(name) = self.service_name {
                config.service_name = name;
            }

            parley_core::init_observability(config.clone())
                .map_err(|e| Error::Internal(format!("Failed to initialize observability: {}", e)))?;

            Some(Arc::new(ServerMetrics::new(&config.service_name)))
        } else {
            None
        };

        let mut dispatcher = Dispatcher::new(self.registry);
        if let Some(ref m) = metrics {
            dispatcher = dispatcher.with_metrics(Arc::clone(m));
        }

        tracing::info!(
            addr = %listener.local_addr().unwrap_or(addr),
            path = %self.path,
            methods = dispatcher.registry().len(),
            "Server listening"
        );

        Ok(ParleyServer {
            listener,
            dispatcher,
            path: Arc::from(self.path),
            metrics,
        })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
