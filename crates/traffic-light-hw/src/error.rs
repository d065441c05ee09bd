//! Error types for the traffic light hardware library.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the controller.
#[derive(Error, Debug)]
pub enum Error {
    /// Serial device not found or could not be opened.
    #[error("Traffic light device not found at {0}")]
    DeviceNotFound(String),

    /// Serial port communication error.
    #[error("Serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    /// Serial I/O error.
    #[error("Serial I/O error: {0}")]
    SerialIo(#[from] std::io::Error),

    /// The link has no open serial channel.
    #[error("Serial link is disconnected")]
    Disconnected,

    /// Unknown mode name.
    #[error("Invalid mode: {0}")]
    InvalidMode(String),

    /// Unknown light name.
    #[error("Invalid light: {0}")]
    InvalidLight(String),

    /// Unknown adjustment direction.
    #[error("Invalid direction (use up or down): {0}")]
    InvalidDirection(String),
}
