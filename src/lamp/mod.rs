// lamp/mod.rs
mod output;
mod state;

pub use output::{Calibration, ChannelOutput};
pub use state::{ColorMode, LampCommand, LampState, PowerToken};
