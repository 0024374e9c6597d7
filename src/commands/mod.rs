// commands/mod.rs
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::{
    config::Topics,
    devices::Device,
    events::Bus,
    metrics,
    models::{BusMessage, StatePayload},
    utils,
};

/// Routes command-topic messages to the lamp and publishes the resulting state.
pub struct CommandDispatcher {
    bus: Bus,
    topics: Topics,
    latest: watch::Sender<StatePayload>,
}

impl CommandDispatcher {
    pub fn new(bus: Bus, topics: Topics, latest: watch::Sender<StatePayload>) -> Self {
        Self { bus, topics, latest }
    }

    /// Process inbound messages one at a time until the queue closes or
    /// shutdown is signalled. Hands the device back so it can be shut down.
    pub async fn run<D: Device>(
        self,
        mut device: D,
        mut inbound: mpsc::Receiver<BusMessage>,
        shutdown: watch::Receiver<bool>,
    ) -> D {
        info!(topic = %self.topics.command, "Listening for commands");
        loop {
            let message = tokio::select! {
                message = inbound.recv() => match message {
                    Some(message) => message,
                    None => break,
                },
                _ = utils::wait_for_shutdown(shutdown.clone()) => break,
            };
            self.dispatch(&mut device, &message).await;
        }
        info!("Command loop stopped");
        device
    }

    pub async fn dispatch<D: Device>(
        &self,
        device: &mut D,
        message: &BusMessage,
    ) -> Option<StatePayload> {
        if message.topic != self.topics.command {
            debug!(topic = %message.topic, "Ignoring message outside the command topic");
            return None;
        }
        debug!(payload = %message.payload, "Command received");

        match device.handle_command(&message.payload).await {
            Ok(state) => {
                metrics::record_command("applied");
                self.publish_state(state.clone());
                Some(state)
            }
            Err(e) => {
                metrics::record_command(e.outcome());
                warn!(payload = %message.payload, "Rejected command: {}", e);
                None
            }
        }
    }

    pub fn publish_state(&self, state: StatePayload) {
        match state.to_json() {
            Ok(payload) => {
                let receivers = self
                    .bus
                    .publish(BusMessage::new(self.topics.state.as_str(), payload));
                debug!(receivers, "State published");
            }
            Err(e) => error!("Failed to encode state: {}", e),
        }
        self.latest.send_replace(state);
    }
}
