//! # Transport
//!
//! Sessions only ever "send bytes" and receive [`TransportEvent`]s. Peer
//! discovery, retries and presence belong to whatever implements
//! [`Transport`].

use async_trait::async_trait;
use tofmt_core::{Result, TimerError};
use tokio::sync::mpsc;

/// Something that arrives from the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// One complete envelope, binary or text
    Received(Vec<u8>),
    /// The remote side went away
    Closed,
}

/// Outbound half of a peer connection
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver one encoded envelope to every listening peer
    async fn send(&self, bytes: Vec<u8>) -> Result<()>;
}

/// In-process transport backed by a tokio channel
///
/// Whatever is sent comes out of the paired receiver as
/// [`TransportEvent::Received`].
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::Sender<TransportEvent>,
}

impl ChannelTransport {
    /// Create a transport and the receiver its peer reads from
    pub fn pair(capacity: usize) -> (Self, mpsc::Receiver<TransportEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Tell the receiving side the connection is gone
    pub async fn close(&self) -> Result<()> {
        self.tx
            .send(TransportEvent::Closed)
            .await
            .map_err(|_| TimerError::Transport("receiver dropped".into()))
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn send(&self, bytes: Vec<u8>) -> Result<()> {
        tracing::trace!("Sending {} bytes", bytes.len());
        self.tx
            .send(TransportEvent::Received(bytes))
            .await
            .map_err(|_| TimerError::Transport("receiver dropped".into()))
    }
}
