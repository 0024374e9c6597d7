// devices/mod.rs
mod smart_lamp;
pub use smart_lamp::SmartLamp;

use crate::{
    error::{DriverError, LampError},
    models::StatePayload,
};

#[async_trait::async_trait]
pub trait Device: Send {
    /// Decode a raw command payload, apply it and return the resulting state.
    async fn handle_command(&mut self, payload: &str) -> Result<StatePayload, LampError>;
    fn get_status(&self) -> StatePayload;
    /// Drive the outputs from the current state without changing it.
    async fn sync(&mut self) -> Result<(), DriverError>;
    async fn shutdown(&mut self) -> Result<(), DriverError>;
}
