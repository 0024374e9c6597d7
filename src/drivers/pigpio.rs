// drivers/pigpio.rs
use async_trait::async_trait;
use serde::Deserialize;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};
use tracing::{debug, info};

use super::{Channel, OutputDriver};
use crate::error::DriverError;

/// `set_PWM_dutycycle` in the pigpiod socket protocol.
const CMD_PWM: u32 = 5;
const FRAME_LEN: usize = 16;

/// Broadcom GPIO numbers wired to each channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Pins {
    pub red: u32,
    pub green: u32,
    pub blue: u32,
}

impl Pins {
    pub fn pin(&self, channel: Channel) -> u32 {
        match channel {
            Channel::Red => self.red,
            Channel::Green => self.green,
            Channel::Blue => self.blue,
        }
    }
}

impl Default for Pins {
    fn default() -> Self {
        Self {
            red: 17,
            green: 27,
            blue: 22,
        }
    }
}

/// Drives the channels through a running pigpio daemon.
///
/// Each request is a 16 byte frame of four little-endian `u32`s
/// (`cmd`, `p1`, `p2`, `p3`), answered by a frame of the same shape whose
/// last word is the signed result. Negative results are daemon errors.
#[derive(Debug)]
pub struct PigpioDriver {
    stream: Option<TcpStream>,
    pins: Pins,
}

impl PigpioDriver {
    pub async fn connect(host: &str, port: u16, pins: Pins) -> Result<Self, DriverError> {
        let stream = TcpStream::connect((host, port)).await?;
        stream.set_nodelay(true)?;
        info!(host, port, ?pins, "Connected to pigpio daemon");
        Ok(Self {
            stream: Some(stream),
            pins,
        })
    }

    async fn command(&mut self, cmd: u32, p1: u32, p2: u32) -> Result<(), DriverError> {
        let stream = self.stream.as_mut().ok_or(DriverError::Closed)?;

        let mut frame = [0u8; FRAME_LEN];
        frame[0..4].copy_from_slice(&cmd.to_le_bytes());
        frame[4..8].copy_from_slice(&p1.to_le_bytes());
        frame[8..12].copy_from_slice(&p2.to_le_bytes());
        stream.write_all(&frame).await?;

        let mut reply = [0u8; FRAME_LEN];
        stream.read_exact(&mut reply).await?;
        let code = i32::from_le_bytes([reply[12], reply[13], reply[14], reply[15]]);
        if code < 0 {
            return Err(DriverError::Rejected { command: cmd, code });
        }
        Ok(())
    }
}

#[async_trait]
impl OutputDriver for PigpioDriver {
    async fn set_channel(&mut self, channel: Channel, duty_cycle: u8) -> Result<(), DriverError> {
        let pin = self.pins.pin(channel);
        debug!(?channel, pin, duty_cycle, "set PWM duty cycle");
        self.command(CMD_PWM, pin, u32::from(duty_cycle)).await
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        if let Some(mut stream) = self.stream.take() {
            stream.shutdown().await?;
            info!("Disconnected from pigpio daemon");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;

    use super::*;

    /// Accepts one connection and answers `frames` requests with `code`,
    /// returning the `(cmd, p1, p2)` triples it saw.
    async fn fake_daemon(code: i32, frames: usize) -> (u16, tokio::task::JoinHandle<Vec<[u32; 3]>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut seen = Vec::new();
            for _ in 0..frames {
                let mut frame = [0u8; FRAME_LEN];
                socket.read_exact(&mut frame).await.unwrap();
                let word = |i: usize| u32::from_le_bytes(frame[i..i + 4].try_into().unwrap());
                seen.push([word(0), word(4), word(8)]);

                let mut reply = frame;
                reply[12..16].copy_from_slice(&code.to_le_bytes());
                socket.write_all(&reply).await.unwrap();
            }
            seen
        });
        (port, handle)
    }

    #[tokio::test]
    async fn writes_pwm_frames_to_configured_pins() {
        let (port, daemon) = fake_daemon(0, 3).await;
        let mut driver = PigpioDriver::connect("127.0.0.1", port, Pins::default())
            .await
            .unwrap();

        driver
            .drive(crate::lamp::ChannelOutput {
                red: 99,
                green: 19,
                blue: 29,
            })
            .await
            .unwrap();
        driver.close().await.unwrap();

        assert_eq!(
            daemon.await.unwrap(),
            vec![[CMD_PWM, 17, 99], [CMD_PWM, 27, 19], [CMD_PWM, 22, 29]]
        );
    }

    #[tokio::test]
    async fn negative_result_is_rejected() {
        let (port, _daemon) = fake_daemon(-8, 1).await;
        let mut driver = PigpioDriver::connect("127.0.0.1", port, Pins::default())
            .await
            .unwrap();

        let result = driver.set_channel(Channel::Green, 50).await;
        assert!(matches!(
            result,
            Err(DriverError::Rejected {
                command: CMD_PWM,
                code: -8
            })
        ));
    }

    #[tokio::test]
    async fn positive_result_is_success() {
        let (port, daemon) = fake_daemon(3, 1).await;
        let mut driver = PigpioDriver::connect("127.0.0.1", port, Pins::default())
            .await
            .unwrap();

        driver.set_channel(Channel::Blue, 200).await.unwrap();
        assert_eq!(daemon.await.unwrap(), vec![[CMD_PWM, 22, 200]]);
    }

    #[tokio::test]
    async fn closed_driver_refuses_writes() {
        let (port, _daemon) = fake_daemon(0, 0).await;
        let mut driver = PigpioDriver::connect("127.0.0.1", port, Pins::default())
            .await
            .unwrap();
        driver.close().await.unwrap();
        driver.close().await.unwrap();
        assert!(matches!(
            driver.set_channel(Channel::Red, 1).await,
            Err(DriverError::Closed)
        ));
    }
}
