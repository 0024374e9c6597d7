// events/mod.rs
use tokio::sync::{broadcast, mpsc};

use crate::{error::BusError, models::BusMessage};

/// In-process message bus. Inbound messages queue up for the single lamp
/// task; outbound messages fan out to every subscribed session.
#[derive(Debug, Clone)]
pub struct Bus {
    inbound: mpsc::Sender<BusMessage>,
    outbound: broadcast::Sender<BusMessage>,
}

impl Bus {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<BusMessage>) {
        let capacity = capacity.max(1);
        let (inbound, receiver) = mpsc::channel(capacity);
        let (outbound, _) = broadcast::channel(capacity);
        (Self { inbound, outbound }, receiver)
    }

    pub async fn deliver(&self, message: BusMessage) -> Result<(), BusError> {
        self.inbound
            .send(message)
            .await
            .map_err(|_| BusError::QueueClosed)
    }

    /// Returns how many subscribers received the message.
    pub fn publish(&self, message: BusMessage) -> usize {
        self.outbound.send(message).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BusMessage> {
        self.outbound.subscribe()
    }
}
