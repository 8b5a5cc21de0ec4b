//! Z-Wave Serial API protocol implementation
//!
//! This crate implements the framed serial protocol used to communicate with
//! Z-Wave USB controller sticks: SOF data frames with XOR checksums, the
//! ACK/NAK/CAN link handshake, callback-id correlation of transmit
//! completions, and the command-class codec.

pub mod command;
pub mod consts;
pub mod frame;
pub mod transport;
pub mod types;

pub use command::{Command, EndpointAddress, ValueFormat};
pub use consts::{ApiFunction, TransmitStatus};
pub use transport::{ControllerEvent, SerialLink, ZWaveTransport};
pub use types::ProtocolError;
