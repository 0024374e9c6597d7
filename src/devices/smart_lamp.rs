// smart_lamp.rs
use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use super::Device;
use crate::{
    drivers::OutputDriver,
    error::{DriverError, LampError},
    lamp::{Calibration, ChannelOutput, LampCommand, LampState},
    metrics,
    models::{CommandPayload, StatePayload},
};

/// A lamp state bound to the driver that renders it.
pub struct SmartLamp<D> {
    state: LampState,
    calibration: Calibration,
    driver: D,
}

impl<D: OutputDriver> SmartLamp<D> {
    pub fn new(driver: D, calibration: Calibration) -> Self {
        Self {
            state: LampState::new(),
            calibration,
            driver,
        }
    }

    pub fn state(&self) -> &LampState {
        &self.state
    }

    pub fn output(&self) -> ChannelOutput {
        self.state.output(&self.calibration)
    }

    /// Apply `command`, then recompute and drive all three channels.
    pub async fn apply(&mut self, command: LampCommand) -> Result<ChannelOutput, DriverError> {
        let applied = self.state.apply(command);
        if let Some(token) = applied.unrecognized_state {
            warn!(%token, "Ignoring unrecognized state token");
        }

        let output = self.output();
        self.driver.drive(output).await?;
        Ok(output)
    }
}

#[async_trait]
impl<D: OutputDriver> Device for SmartLamp<D> {
    async fn handle_command(&mut self, payload: &str) -> Result<StatePayload, LampError> {
        let command = CommandPayload::decode(payload)?;
        if command.is_empty() {
            debug!("Command carries no known fields");
        } else {
            debug!(?command, "Applying command");
        }

        match self.apply(command).await {
            Ok(output) => debug!(?output, "Outputs updated"),
            Err(e) => {
                metrics::record_driver_error();
                error!("Failed to drive outputs: {}", e);
            }
        }

        info!("{}", self.state.describe());
        Ok(self.get_status())
    }

    fn get_status(&self) -> StatePayload {
        self.state.serialize()
    }

    async fn sync(&mut self) -> Result<(), DriverError> {
        let output = self.output();
        self.driver.drive(output).await
    }

    async fn shutdown(&mut self) -> Result<(), DriverError> {
        self.driver.close().await
    }
}
