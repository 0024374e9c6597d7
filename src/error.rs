// error.rs
use thiserror::Error;

/// Rejections of an inbound command. The lamp state is untouched when these occur.
#[derive(Error, Debug)]
pub enum LampError {
    #[error("Malformed payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

impl LampError {
    pub fn outcome(&self) -> &'static str {
        match self {
            LampError::Decode(_) => "decode_error",
            LampError::Validation(_) => "validation_error",
        }
    }
}

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Driver I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Driver rejected command {command} with code {code}")]
    Rejected { command: u32, code: i32 },
    #[error("Driver is closed")]
    Closed,
}

#[derive(Error, Debug)]
pub enum BusError {
    #[error("Command queue closed")]
    QueueClosed,
}
