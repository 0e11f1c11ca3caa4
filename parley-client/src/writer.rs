//! Outbound frame writer
//!
//! The sink half of the socket is owned by a dedicated task fed from an
//! unbounded channel. Callers only ever enqueue, so a peer that stops reading
//! stalls the task and never the caller: call deadlines and `close()` keep
//! working while a write is stuck.

use futures::stream::SplitSink;
use futures::SinkExt;
use parley_core::{Error, Result};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{tungstenite::Message, MaybeTlsStream, WebSocketStream};

pub(crate) type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Handle to the task writing one connection's frames
pub(crate) struct FrameWriter {
    tx: mpsc::UnboundedSender<Message>,
    task: JoinHandle<()>,
}

impl FrameWriter {
    pub(crate) fn spawn(mut sink: WsSink) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

        let task = tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                if let Err(e) = sink.send(msg).await {
                    tracing::warn!(error = %e, "Error sending message");
                    return;
                }
            }
            // Every sender is gone: finish with a close handshake.
            if let Err(e) = sink.close().await {
                tracing::debug!(error = %e, "Close handshake failed");
            }
        });

        Self { tx, task }
    }

    /// Queue a frame without waiting for the socket
    pub(crate) fn send(&self, msg: Message) -> Result<()> {
        self.tx
            .send(msg)
            .map_err(|_| Error::WebSocket("connection writer has stopped".to_string()))
    }

    /// Flush queued frames and close the socket, giving up after `grace`
    pub(crate) async fn shutdown(self, grace: Duration) {
        let Self { tx, mut task } = self;
        drop(tx);
        if tokio::time::timeout(grace, &mut task).await.is_err() {
            tracing::debug!("Writer did not finish in time, aborting");
            task.abort();
        }
    }

    /// Stop writing immediately
    pub(crate) fn abort(self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tokio::net::TcpListener;
    use tokio_tungstenite::{accept_async, connect_async};

    async fn pair() -> (WsSink, WebSocketStream<TcpStream>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accept = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            accept_async(stream).await.unwrap()
        });
        let (client, _) = connect_async(format!("ws://{}/rpc", addr)).await.unwrap();
        let (sink, _source) = client.split();
        (sink, accept.await.unwrap())
    }

    #[tokio::test]
    async fn test_frames_are_written_in_order_then_closed() {
        let (sink, mut server) = pair().await;
        let writer = FrameWriter::spawn(sink);

        writer.send(Message::Text("one".into())).unwrap();
        writer.send(Message::Text("two".into())).unwrap();
        writer.shutdown(Duration::from_secs(1)).await;

        assert_eq!(server.next().await.unwrap().unwrap(), Message::Text("one".into()));
        assert_eq!(server.next().await.unwrap().unwrap(), Message::Text("two".into()));
        assert!(matches!(server.next().await, Some(Ok(Message::Close(_)))));
    }

    #[tokio::test]
    async fn test_send_after_abort_fails() {
        let (sink, _server) = pair().await;
        let writer = FrameWriter::spawn(sink);
        let tx = writer.tx.clone();

        writer.abort();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(tx.send(Message::Text("late".into())).is_err());
    }
}
