//! Message transport.
//!
//! Bridges a raw message channel to the connector: receive, dispatch, post
//! the reply if there is one. No business logic lives here — anything the
//! connector does not answer is dropped silently, because the channel is
//! shared with unrelated wallets and dapp traffic.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::connector::Connector;
use crate::error::TransportError;

/// A bidirectional raw message channel (a browser window bridge, a test
/// harness, an extension port).
#[async_trait]
pub trait MessagePort: Send {
    /// Next inbound message; `None` when the channel closed.
    async fn recv(&mut self) -> Option<Value>;

    /// Post a message back on the channel.
    async fn post(&self, message: Value) -> Result<(), TransportError>;
}

/// Pump a message port through a connector until the port closes.
///
/// Messages are processed one at a time; embedders that need a resolution
/// to keep suspending while later messages arrive can share the connector
/// and call [`Connector::handle_message`] from their own tasks instead.
pub async fn listen<P: MessagePort>(
    mut port: P,
    connector: &Connector,
) -> Result<(), TransportError> {
    while let Some(raw) = port.recv().await {
        trace!(?raw, "inbound message");
        match connector.handle_message(&raw).await {
            Some(response) => port.post(response).await?,
            None => debug!("no response for inbound message"),
        }
    }
    Ok(())
}

/// In-process port over tokio channels.
///
/// `pair()` returns the port plus the far end: a sender feeding inbound
/// messages and a receiver observing everything the connector posts.
pub struct InProcessPort {
    inbound: mpsc::Receiver<Value>,
    outbound: mpsc::Sender<Value>,
}

impl InProcessPort {
    pub fn pair(buffer: usize) -> (Self, mpsc::Sender<Value>, mpsc::Receiver<Value>) {
        let (inbound_tx, inbound_rx) = mpsc::channel(buffer);
        let (outbound_tx, outbound_rx) = mpsc::channel(buffer);
        (
            Self {
                inbound: inbound_rx,
                outbound: outbound_tx,
            },
            inbound_tx,
            outbound_rx,
        )
    }
}

#[async_trait]
impl MessagePort for InProcessPort {
    async fn recv(&mut self) -> Option<Value> {
        self.inbound.recv().await
    }

    async fn post(&self, message: Value) -> Result<(), TransportError> {
        self.outbound
            .send(message)
            .await
            .map_err(|e| TransportError::PostFailed {
                port: "in-process",
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_process_port_round_trips() {
        let (mut port, inbound_tx, mut outbound_rx) = InProcessPort::pair(4);
        inbound_tx
            .send(serde_json::json!({"hello": true}))
            .await
            .unwrap();
        let received = port.recv().await.unwrap();
        assert_eq!(received["hello"], true);

        port.post(serde_json::json!({"ack": 1})).await.unwrap();
        assert_eq!(outbound_rx.recv().await.unwrap()["ack"], 1);
    }

    #[tokio::test]
    async fn recv_returns_none_when_far_end_drops() {
        let (mut port, inbound_tx, _outbound_rx) = InProcessPort::pair(1);
        drop(inbound_tx);
        assert!(port.recv().await.is_none());
    }
}
