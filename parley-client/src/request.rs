//! Pending-request table
//!
//! Every outgoing call owns one entry, keyed by its id, holding a one-shot
//! completion slot. An entry leaves the table exactly once, by whichever of
//! these happens first:
//!
//! 1. a response with the same id arrives ([`RequestManager::complete`])
//! 2. the call's timeout fires ([`RequestManager::discard`])
//! 3. the client is closed ([`RequestManager::fail_all`])
//!
//! Because removal and resolution happen under the same lock, a response
//! that arrives after the entry is gone finds nothing and is dropped.

use parley_core::{Error, RequestId, Response, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{oneshot, Mutex};

/// Receiving half of a pending call
pub type ResponseReceiver = oneshot::Receiver<Result<Response>>;

/// A call waiting for its response
pub struct PendingRequest {
    tx: oneshot::Sender<Result<Response>>,
    method: String,
    issued_at: Instant,
}

/// Table of in-flight requests, keyed by id
#[derive(Clone)]
pub struct RequestManager {
    pending: Arc<Mutex<HashMap<RequestId, PendingRequest>>>,
    max_pending: Option<usize>,
}

impl RequestManager {
    /// Unbounded table
    pub fn new() -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            max_pending: None,
        }
    }

    /// Table that refuses registrations past `limit` in-flight requests
    pub fn with_limit(limit: usize) -> Self {
        Self {
            max_pending: Some(limit),
            ..Self::new()
        }
    }

    /// Register a pending request
    ///
    /// Fails with `Backpressure` when the table is full.
    pub async fn register(&self, id: RequestId, method: &str) -> Result<ResponseReceiver> {
        let mut pending = self.pending.lock().await;
        if let Some(limit) = self.max_pending {
            if pending.len() >= limit {
                return Err(Error::Backpressure { limit });
            }
        }

        let (tx, rx) = oneshot::channel();
        pending.insert(
            id,
            PendingRequest {
                tx,
                method: method.to_string(),
                issued_at: Instant::now(),
            },
        );
        Ok(rx)
    }

    /// Resolve the entry matching the response's id
    ///
    /// Returns false when no entry matched (unknown, timed out, or already
    /// resolved).
    pub async fn complete(&self, response: Response) -> bool {
        let Some(id) = response.id.clone() else {
            return false;
        };
        match self.pending.lock().await.remove(&id) {
            Some(entry) => {
                tracing::trace!(
                    request_id = %id,
                    method = %entry.method,
                    elapsed_ms = entry.issued_at.elapsed().as_millis() as u64,
                    "Resolved pending request"
                );
                let _ = entry.tx.send(Ok(response));
                true
            }
            None => false,
        }
    }

    /// Remove an entry without resolving it
    ///
    /// Returns false if the entry was already gone.
    pub async fn discard(&self, id: &RequestId) -> bool {
        self.pending.lock().await.remove(id).is_some()
    }

    /// Fail every entry, returning how many there were
    pub async fn fail_all(&self, error: Error) -> usize {
        let mut pending = self.pending.lock().await;
        let count = pending.len();
        for (_, entry) in pending.drain() {
            let _ = entry.tx.send(Err(error.clone()));
        }
        count
    }

    /// Number of in-flight requests
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}

impl Default for RequestManager {
    fn default() -> Self {
        Self::new()
    }
}
