use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShutterError {
    #[error("invalid target position {0} (expected 0..=100)")]
    InvalidTarget(i64),
    #[error("invalid calibration: {0}")]
    InvalidCalibration(String),
    #[error("device command failed: {0}")]
    DeviceCommandFailed(String),
    #[error("timeout waiting for device")]
    DeviceTimeout,
    #[error("shutter service is not running")]
    ServiceStopped,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("missing cover")]
    MissingCover,
    #[error("missing calibration")]
    MissingCalibration,
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
