// drivers/noop.rs
use async_trait::async_trait;
use tracing::debug;

use super::{Channel, OutputDriver};
use crate::error::DriverError;

/// Stand-in for hosts without PWM hardware. Writes are only logged.
#[derive(Debug, Default)]
pub struct NoopDriver {
    closed: bool,
}

impl NoopDriver {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OutputDriver for NoopDriver {
    async fn set_channel(&mut self, channel: Channel, duty_cycle: u8) -> Result<(), DriverError> {
        if self.closed {
            return Err(DriverError::Closed);
        }
        debug!(?channel, duty_cycle, "set duty cycle");
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        self.closed = true;
        Ok(())
    }
}
