//! Where deliveries come from.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{Delivery, Result};

/// A stream of inbound deliveries.
///
/// `next_delivery` must be cancel-safe: the ingestion loop races it against
/// its shutdown signal.
#[async_trait]
pub trait DeliverySource: Send {
    /// Waits for the next delivery. Returns `None` once the source is closed.
    async fn next_delivery(&mut self) -> Option<Result<Delivery>>;
}

/// In-process source fed through a tokio channel.
///
/// Used by tests, and anywhere events are produced inside the same process.
pub struct ChannelSource {
    receiver: mpsc::Receiver<Delivery>,
}

impl ChannelSource {
    /// Wraps an existing receiver.
    pub fn new(receiver: mpsc::Receiver<Delivery>) -> Self {
        Self { receiver }
    }

    /// Creates a bounded channel and returns its sending half with the source.
    pub fn channel(capacity: usize) -> (mpsc::Sender<Delivery>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self::new(rx))
    }
}

#[async_trait]
impl DeliverySource for ChannelSource {
    async fn next_delivery(&mut self) -> Option<Result<Delivery>> {
        self.receiver.recv().await.map(Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn yields_in_send_order_then_closes() {
        let (tx, mut source) = ChannelSource::channel(4);
        tx.send(Delivery::new("a")).await.unwrap();
        tx.send(Delivery::new("b")).await.unwrap();
        drop(tx);

        assert_eq!(source.next_delivery().await.unwrap().unwrap().body, b"a");
        assert_eq!(source.next_delivery().await.unwrap().unwrap().body, b"b");
        assert!(source.next_delivery().await.is_none());
    }
}
