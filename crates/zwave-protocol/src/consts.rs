//! Serial API frame and function constants

/// Start of a data frame
pub const SOF: u8 = 0x01;
/// Frame accepted
pub const ACK: u8 = 0x06;
/// Frame rejected
pub const NAK: u8 = 0x15;
/// Frame cancelled, the stick wants a resend
pub const CAN: u8 = 0x18;

/// Data frame type byte for host-originated requests
pub const REQUEST: u8 = 0x01;
/// Data frame type byte for stick-originated responses
pub const RESPONSE: u8 = 0x00;

/// Serial API function identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ApiFunction {
    /// Query the node bitfield held by the stick
    GetInitData = 0x02,
    /// Unsolicited application command from a remote node
    AppCommandHandler = 0x04,
    /// Transmit a command-class payload to a node
    ZwSendData = 0x13,
    /// Query the stick firmware version string
    ZwGetVersion = 0x15,
    /// Ask a node to broadcast its node information frame
    RequestNodeInfo = 0x60,
}

impl ApiFunction {
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x02 => Some(ApiFunction::GetInitData),
            0x04 => Some(ApiFunction::AppCommandHandler),
            0x13 => Some(ApiFunction::ZwSendData),
            0x15 => Some(ApiFunction::ZwGetVersion),
            0x60 => Some(ApiFunction::RequestNodeInfo),
            _ => None,
        }
    }
}

/// Transmit option flags for `ZwSendData` requests
pub mod tx_options {
    pub const ACK: u8 = 0x01;
    pub const LOW_POWER: u8 = 0x02;
    pub const AUTO_ROUTE: u8 = 0x04;
    pub const NO_ROUTE: u8 = 0x10;
    pub const EXPLORE: u8 = 0x20;

    /// Options applied to every outgoing transmission
    pub const DEFAULT: u8 = ACK | AUTO_ROUTE;
}

/// Completion codes reported back for a transmitted callback id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TransmitStatus {
    Ok = 0x00,
    NoAck = 0x01,
    Fail = 0x02,
    NotIdle = 0x03,
    NoRoute = 0x04,
}

impl TransmitStatus {
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(TransmitStatus::Ok),
            0x01 => Some(TransmitStatus::NoAck),
            0x02 => Some(TransmitStatus::Fail),
            0x03 => Some(TransmitStatus::NotIdle),
            0x04 => Some(TransmitStatus::NoRoute),
            _ => None,
        }
    }
}
