//! Error types shared across the protocol stack

use thiserror::Error;

/// Protocol errors
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("serial port error: {0}")]
    Serial(#[from] std::io::Error),

    #[error("request timeout")]
    Timeout,

    #[error("transmit failed with status {0:#04X}")]
    TransmitFailed(u8),

    #[error("unrecognised command {class:#04X}/{command:#04X}")]
    UnknownCommand { class: u8, command: u8 },

    #[error("command truncated: {0} bytes")]
    Truncated(usize),

    #[error("invalid configuration value size: {0}")]
    InvalidSize(u8),

    #[error("transport not connected")]
    NotConnected,
}
