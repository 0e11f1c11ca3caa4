//! Client builder
//!
//! [`ClientBuilder`] collects the connection settings before a client is
//! created:
//! - connect and request timeouts
//! - the reconnection strategy (exponential backoff by default)
//! - an optional limit on in-flight calls
//! - OpenTelemetry observability and service name
//!
//! # Examples
//!
//! ```rust,no_run
//! use parley_client::{ClientBuilder, FixedDelay};
//! use std::time::Duration;
//!
//! # async fn example() -> parley_core::Result<()> {
//! let client = ClientBuilder::new("ws://localhost:3000/rpc")
//!     .request_timeout(Duration::from_secs(60))
//!     .with_reconnect(Box::new(FixedDelay::new(Duration::from_secs(2)).with_max_attempts(3)))
//!     .max_pending(32)
//!     .connect()
//!     .await?;
//! # Ok(())
//! # }
//! ```

use crate::client::ClientConfig;
use crate::connection_state::ConnectionManager;
use crate::reconnect::{ExponentialBackoff, ReconnectionStrategy};
use crate::request::RequestManager;
use crate::{ClientMetrics, ParleyClient};
use parley_core::{Error, ObservabilityConfig, Result};
use std::sync::Arc;
use std::time::Duration;

/// Default handshake timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default per-call timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Builder for configuring and creating a [`ParleyClient`]
pub struct ClientBuilder {
    url: String,
    connect_timeout: Duration,
    request_timeout: Duration,
    reconnect_strategy: Option<Box<dyn ReconnectionStrategy>>,
    max_pending: Option<usize>,
    observability_config: Option<ObservabilityConfig>,
    service_name: Option<String>,
}

impl ClientBuilder {
    /// Create a builder with default settings
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            reconnect_strategy: Some(Box::new(ExponentialBackoff::default())),
            max_pending: None,
            observability_config: None,
            service_name: None,
        }
    }

    /// How long the transport handshake may take
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// How long a call waits for its response
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Reconnect with the given strategy
    pub fn with_reconnect(mut self, strategy: Box<dyn ReconnectionStrategy>) -> Self {
        self.reconnect_strategy = Some(strategy);
        self
    }

    /// Reconnect with the default backoff (1, 2, 4, 8, 10 s)
    pub fn with_default_reconnect(mut self) -> Self {
        self.reconnect_strategy = Some(Box::new(ExponentialBackoff::default()));
        self
    }

    /// Never reconnect automatically
    pub fn without_reconnect(mut self) -> Self {
        self.reconnect_strategy = None;
        self
    }

    /// Reject calls with `Backpressure` once `limit` are in flight
    pub fn max_pending(mut self, limit: usize) -> Self {
        self.max_pending = Some(limit);
        self
    }

    /// Enable OpenTelemetry observability with custom configuration
    pub fn with_observability(mut self, config: ObservabilityConfig) -> Self {
        self.observability_config = Some(config);
        self
    }

    /// Enable OpenTelemetry observability with default configuration
    pub fn with_default_observability(mut self) -> Self {
        self.observability_config = Some(ObservabilityConfig::default());
        self
    }

    /// Service name for telemetry (used if observability is enabled)
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Build the client without connecting
    ///
    /// Metrics are created when observability is configured, but the global
    /// providers are not installed; use [`ClientBuilder::connect`] or call
    /// `parley_core::init_observability` yourself.
    pub fn build(self) -> ParleyClient {
        let metrics = self.observability_config.as_ref().map(|config| {
            let name = self.service_name.clone().unwrap_or_else(|| config.service_name.clone());
            Arc::new(ClientMetrics::new(name))
        });
        self.assemble(metrics)
    }

    /// Build the client and open the connection
    ///
    /// If the first connection fails the client is closed again, so no
    /// background reconnection outlives the returned error.
    pub async fn connect(mut self) -> Result<ParleyClient> {
        let metrics = if let Some(mut config) = self.observability_config.take() {
            if let Some(name) = self.service_name.take() {
                config.service_name = name;
            }

            parley_core::init_observability(config.clone())
                .map_err(|e| Error::Internal(format!("Failed to initialize observability: {}", e)))?;

            Some(Arc::new(ClientMetrics::new(&config.service_name)))
        } else {
            None
        };

        let client = self.assemble(metrics);
        if let Err(e) = client.connect().await {
            client.close().await;
            return Err(e);
        }
        Ok(client)
    }

    fn assemble(self, metrics: Option<Arc<ClientMetrics>>) -> ParleyClient {
        let requests = match self.max_pending {
            Some(limit) => RequestManager::with_limit(limit),
            None => RequestManager::new(),
        };
        let connection = ConnectionManager::new(self.reconnect_strategy);
        let config = ClientConfig {
            url: self.url,
            connect_timeout: self.connect_timeout,
            request_timeout: self.request_timeout,
        };
        ParleyClient::from_parts(config, connection, requests, metrics)
    }
}
