// drivers/mod.rs
mod noop;
mod pigpio;

pub use noop::NoopDriver;
pub use pigpio::{Pins, PigpioDriver};

use async_trait::async_trait;

use crate::{error::DriverError, lamp::ChannelOutput};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Red, Channel::Green, Channel::Blue];

    pub fn duty(self, output: &ChannelOutput) -> u8 {
        match self {
            Channel::Red => output.red,
            Channel::Green => output.green,
            Channel::Blue => output.blue,
        }
    }
}

/// Sink for per-channel duty cycles.
#[async_trait]
pub trait OutputDriver: Send {
    async fn set_channel(&mut self, channel: Channel, duty_cycle: u8) -> Result<(), DriverError>;

    /// Release the underlying hardware session. Further writes fail with `DriverError::Closed`.
    async fn close(&mut self) -> Result<(), DriverError>;

    /// Write all three channels, stopping at the first failure.
    async fn drive(&mut self, output: ChannelOutput) -> Result<(), DriverError> {
        for channel in Channel::ALL {
            self.set_channel(channel, channel.duty(&output)).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<D: OutputDriver + ?Sized> OutputDriver for Box<D> {
    async fn set_channel(&mut self, channel: Channel, duty_cycle: u8) -> Result<(), DriverError> {
        (**self).set_channel(channel, duty_cycle).await
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        (**self).close().await
    }
}
