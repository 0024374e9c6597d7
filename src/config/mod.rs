// config/mod.rs
use config::{Config, ConfigBuilder, builder::DefaultState};
use serde::Deserialize;

use crate::{drivers::Pins, lamp::Calibration};

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub metrics: MetricsSettings,
    pub bus: BusSettings,
    pub driver: DriverSettings,
    pub calibration: Calibration,
}

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    pub address: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize)]
pub struct MetricsSettings {
    pub enabled: bool,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct BusSettings {
    pub base_topic: String,
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    Noop,
    Pigpio,
}

#[derive(Debug, Deserialize)]
pub struct DriverSettings {
    pub kind: DriverKind,
    pub host: String,
    pub port: u16,
    pub pins: Pins,
}

/// State and command topics derived from the base topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub state: String,
    pub command: String,
}

impl BusSettings {
    pub fn topics(&self) -> Topics {
        Topics {
            state: self.base_topic.clone(),
            command: format!("{}/set", self.base_topic),
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, config::ConfigError> {
        Self::from_builder(
            Self::defaults()?
                .add_source(config::File::with_name("config/config").required(false))
                .add_source(
                    config::Environment::with_prefix("APP")
                        .separator("__")
                        .try_parsing(true),
                ),
        )
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, config::ConfigError> {
        let settings: Self = builder.build()?.try_deserialize()?;
        settings
            .calibration
            .check()
            .map_err(|e| config::ConfigError::Message(format!("Invalid calibration: {e}")))?;
        Ok(settings)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, config::ConfigError> {
        let pins = Pins::default();
        let calibration = Calibration::default();
        Config::builder()
            .set_default("server.address", "0.0.0.0:3000")?
            .set_default("server.max_connections", 16)?
            .set_default("metrics.enabled", false)?
            .set_default("metrics.port", 9000)?
            .set_default("bus.base_topic", "lamp/cat")?
            .set_default("bus.queue_capacity", 64)?
            .set_default("driver.kind", "noop")?
            .set_default("driver.host", "localhost")?
            .set_default("driver.port", 8888)?
            .set_default("driver.pins.red", i64::from(pins.red))?
            .set_default("driver.pins.green", i64::from(pins.green))?
            .set_default("driver.pins.blue", i64::from(pins.blue))?
            .set_default("calibration.green_compensation", calibration.green_compensation)?
            .set_default("calibration.blue_compensation", calibration.blue_compensation)
    }
}
