use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("device rejected command: {0}")]
    CommandRejected(String),
    #[error("device does not support {0}")]
    Unsupported(&'static str),
    #[error("device timeout")]
    Timeout,
    #[error("device disconnected")]
    Disconnected,
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
