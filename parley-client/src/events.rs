//! Client event stream
//!
//! Connection lifecycle changes and every inbound response are broadcast to
//! subscribers. Lagging subscribers lose the oldest events; nothing blocks the
//! connection driver.

use parley_core::Response;
use std::time::Duration;
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 64;

/// Something that happened on the client connection
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// The transport opened
    Connected,
    /// The transport closed (explicitly or not)
    Disconnected,
    /// A reconnection attempt is scheduled after `delay`
    Reconnecting {
        /// 1-based attempt number
        attempt: u32,
        /// Wait before the attempt
        delay: Duration,
    },
    /// Reconnection gave up; the client stays disconnected until `connect()`
    ReconnectFailed {
        /// Attempts made before giving up
        attempts: u32,
    },
    /// A transport or protocol error that did not belong to any call
    Error(String),
    /// A response arrived, matched or not
    Message(Response),
}

/// Fan-out of [`ClientEvent`]s
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ClientEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.tx.subscribe()
    }

    /// Publish an event; having no subscribers is fine
    pub fn emit(&self, event: ClientEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_without_subscribers() {
        EventBus::new().emit(ClientEvent::Connected);
    }

    #[tokio::test]
    async fn test_subscribers_receive_in_order() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.emit(ClientEvent::Connected);
        bus.emit(ClientEvent::ReconnectFailed { attempts: 5 });

        assert_eq!(rx.recv().await.unwrap(), ClientEvent::Connected);
        assert_eq!(rx.recv().await.unwrap(), ClientEvent::ReconnectFailed { attempts: 5 });
    }
}
