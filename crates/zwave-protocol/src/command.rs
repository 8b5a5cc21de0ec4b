//! Command-class frame model and codec
//!
//! Every Z-Wave application command starts with a two-byte
//! `(command class, command id)` signature followed by command-specific data.
//! [`Command`] models the supported frames as a tagged enum; [`Command::serialize`]
//! and [`Command::deserialize`] translate between the enum and payload bytes,
//! recursing through multi-channel encapsulation.

use crate::types::ProtocolError;
use serde::{Deserialize, Serialize};

/// Command class identifiers
pub mod class {
    pub const BASIC: u8 = 0x20;
    pub const SWITCH_BINARY: u8 = 0x25;
    pub const SWITCH_MULTILEVEL: u8 = 0x26;
    pub const METER: u8 = 0x32;
    pub const MULTI_CHANNEL: u8 = 0x60;
    pub const CONFIGURATION: u8 = 0x70;
    pub const ASSOCIATION: u8 = 0x85;
    pub const MULTI_CHANNEL_ASSOCIATION: u8 = 0x8E;
}

/// Per-class command identifiers
pub mod cmd {
    pub const BASIC_SET: u8 = 0x01;
    pub const BASIC_GET: u8 = 0x02;
    pub const BASIC_REPORT: u8 = 0x03;

    pub const SWITCH_BINARY_SET: u8 = 0x01;
    pub const SWITCH_BINARY_GET: u8 = 0x02;
    pub const SWITCH_BINARY_REPORT: u8 = 0x03;

    pub const SWITCH_MULTILEVEL_SET: u8 = 0x01;
    pub const SWITCH_MULTILEVEL_GET: u8 = 0x02;
    pub const SWITCH_MULTILEVEL_REPORT: u8 = 0x03;

    pub const METER_REPORT: u8 = 0x02;

    pub const MULTI_CHANNEL_CMD_ENCAP: u8 = 0x0D;

    pub const CONFIGURATION_SET: u8 = 0x04;
    pub const CONFIGURATION_GET: u8 = 0x05;
    pub const CONFIGURATION_REPORT: u8 = 0x06;

    pub const ASSOCIATION_GET: u8 = 0x02;
    pub const ASSOCIATION_REPORT: u8 = 0x03;

    pub const MULTI_CHANNEL_ASSOCIATION_SET: u8 = 0x01;
    pub const MULTI_CHANNEL_ASSOCIATION_GET: u8 = 0x02;
    pub const MULTI_CHANNEL_ASSOCIATION_REPORT: u8 = 0x03;
    pub const MULTI_CHANNEL_ASSOCIATION_REMOVE: u8 = 0x04;

    /// Separates plain node ids from (node, endpoint) pairs in association lists
    pub const MULTI_CHANNEL_ASSOCIATION_MARKER: u8 = 0x00;
}

/// Width of a configuration parameter value, always signed big-endian
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueFormat {
    #[serde(rename = "B")]
    Byte,
    #[serde(rename = "H")]
    Short,
    #[serde(rename = "I")]
    Int,
}

impl ValueFormat {
    #[must_use]
    pub fn size(self) -> u8 {
        match self {
            ValueFormat::Byte => 1,
            ValueFormat::Short => 2,
            ValueFormat::Int => 4,
        }
    }

    #[must_use]
    pub fn from_size(size: u8) -> Option<Self> {
        match size {
            1 => Some(ValueFormat::Byte),
            2 => Some(ValueFormat::Short),
            4 => Some(ValueFormat::Int),
            _ => None,
        }
    }

    /// Check that `value` is representable at this width
    #[must_use]
    pub fn fits(self, value: i64) -> bool {
        match self {
            ValueFormat::Byte => i8::try_from(value).is_ok(),
            ValueFormat::Short => i16::try_from(value).is_ok(),
            ValueFormat::Int => i32::try_from(value).is_ok(),
        }
    }
}

/// A multi-channel association member: a node plus one of its endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointAddress {
    pub node: u8,
    pub endpoint: u8,
}

/// A decoded command-class frame
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    BasicSet {
        value: u8,
    },
    BasicGet,
    BasicReport {
        value: u8,
    },
    BinarySwitchSet {
        value: u8,
    },
    BinarySwitchGet,
    BinarySwitchReport {
        value: u8,
    },
    MultilevelSwitchSet {
        level: u8,
    },
    MultilevelSwitchGet,
    MultilevelSwitchReport {
        level: u8,
    },
    /// Meter data is carried opaquely; the body is not interpreted
    MeterReport {
        data: Vec<u8>,
    },
    /// Addresses an inner command to a specific endpoint of a multi-channel node
    MultiChannelEncap {
        endpoint: u8,
        command: Box<Command>,
    },
    ConfigurationSet {
        parameter: u8,
        format: ValueFormat,
        value: i64,
    },
    ConfigurationGet {
        parameter: u8,
    },
    ConfigurationReport {
        parameter: u8,
        size: u8,
        value: i64,
    },
    AssociationGet {
        group: u8,
    },
    AssociationReport {
        group: u8,
        max_nodes: u8,
        num_reports: u8,
        nodes: Vec<u8>,
    },
    MultiChannelAssociationSet {
        group: u8,
        nodes: Vec<u8>,
        endpoints: Vec<EndpointAddress>,
    },
    MultiChannelAssociationGet {
        group: u8,
    },
    MultiChannelAssociationRemove {
        group: u8,
        nodes: Vec<u8>,
        endpoints: Vec<EndpointAddress>,
    },
    MultiChannelAssociationReport {
        group: u8,
        max_nodes: u8,
        num_reports: u8,
        nodes: Vec<u8>,
        endpoints: Vec<EndpointAddress>,
    },
}

impl Command {
    /// The `(class, command)` signature this frame serializes under
    #[must_use]
    pub fn signature(&self) -> (u8, u8) {
        match self {
            Command::BasicSet { .. } => (class::BASIC, cmd::BASIC_SET),
            Command::BasicGet => (class::BASIC, cmd::BASIC_GET),
            Command::BasicReport { .. } => (class::BASIC, cmd::BASIC_REPORT),
            Command::BinarySwitchSet { .. } => (class::SWITCH_BINARY, cmd::SWITCH_BINARY_SET),
            Command::BinarySwitchGet => (class::SWITCH_BINARY, cmd::SWITCH_BINARY_GET),
            Command::BinarySwitchReport { .. } => (class::SWITCH_BINARY, cmd::SWITCH_BINARY_REPORT),
            Command::MultilevelSwitchSet { .. } => {
                (class::SWITCH_MULTILEVEL, cmd::SWITCH_MULTILEVEL_SET)
            }
            Command::MultilevelSwitchGet => (class::SWITCH_MULTILEVEL, cmd::SWITCH_MULTILEVEL_GET),
            Command::MultilevelSwitchReport { .. } => {
                (class::SWITCH_MULTILEVEL, cmd::SWITCH_MULTILEVEL_REPORT)
            }
            Command::MeterReport { .. } => (class::METER, cmd::METER_REPORT),
            Command::MultiChannelEncap { .. } => {
                (class::MULTI_CHANNEL, cmd::MULTI_CHANNEL_CMD_ENCAP)
            }
            Command::ConfigurationSet { .. } => (class::CONFIGURATION, cmd::CONFIGURATION_SET),
            Command::ConfigurationGet { .. } => (class::CONFIGURATION, cmd::CONFIGURATION_GET),
            Command::ConfigurationReport { .. } => {
                (class::CONFIGURATION, cmd::CONFIGURATION_REPORT)
            }
            Command::AssociationGet { .. } => (class::ASSOCIATION, cmd::ASSOCIATION_GET),
            Command::AssociationReport { .. } => (class::ASSOCIATION, cmd::ASSOCIATION_REPORT),
            Command::MultiChannelAssociationSet { .. } => (
                class::MULTI_CHANNEL_ASSOCIATION,
                cmd::MULTI_CHANNEL_ASSOCIATION_SET,
            ),
            Command::MultiChannelAssociationGet { .. } => (
                class::MULTI_CHANNEL_ASSOCIATION,
                cmd::MULTI_CHANNEL_ASSOCIATION_GET,
            ),
            Command::MultiChannelAssociationRemove { .. } => (
                class::MULTI_CHANNEL_ASSOCIATION,
                cmd::MULTI_CHANNEL_ASSOCIATION_REMOVE,
            ),
            Command::MultiChannelAssociationReport { .. } => (
                class::MULTI_CHANNEL_ASSOCIATION,
                cmd::MULTI_CHANNEL_ASSOCIATION_REPORT,
            ),
        }
    }

    /// Serialize to command-class payload bytes
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let (class, command) = self.signature();
        let mut out = vec![class, command];

        match self {
            Command::BasicGet
            | Command::BinarySwitchGet
            | Command::MultilevelSwitchGet => {}

            Command::BasicSet { value }
            | Command::BasicReport { value }
            | Command::BinarySwitchSet { value }
            | Command::BinarySwitchReport { value }
            | Command::MultilevelSwitchSet { level: value }
            | Command::MultilevelSwitchReport { level: value } => out.push(*value),

            Command::MeterReport { data } => out.extend_from_slice(data),

            Command::MultiChannelEncap { endpoint, command } => {
                out.push(0x00);
                out.push(*endpoint);
                out.extend_from_slice(&command.serialize());
            }

            Command::ConfigurationSet {
                parameter,
                format,
                value,
            } => {
                out.push(*parameter);
                out.push(format.size());
                encode_signed(&mut out, *value, format.size());
            }
            Command::ConfigurationGet { parameter } => out.push(*parameter),
            Command::ConfigurationReport {
                parameter,
                size,
                value,
            } => {
                out.push(*parameter);
                out.push(*size);
                encode_signed(&mut out, *value, *size);
            }

            Command::AssociationGet { group }
            | Command::MultiChannelAssociationGet { group } => out.push(*group),

            Command::AssociationReport {
                group,
                max_nodes,
                num_reports,
                nodes,
            } => {
                out.push(*group);
                out.push(*max_nodes);
                out.push(*num_reports);
                out.extend_from_slice(nodes);
            }

            Command::MultiChannelAssociationSet {
                group,
                nodes,
                endpoints,
            }
            | Command::MultiChannelAssociationRemove {
                group,
                nodes,
                endpoints,
            } => {
                out.push(*group);
                out.extend_from_slice(nodes);
                out.push(cmd::MULTI_CHANNEL_ASSOCIATION_MARKER);
                for member in endpoints {
                    out.push(member.node);
                    out.push(member.endpoint);
                }
            }

            Command::MultiChannelAssociationReport {
                group,
                max_nodes,
                num_reports,
                nodes,
                endpoints,
            } => {
                out.push(*group);
                out.push(*max_nodes);
                out.push(*num_reports);
                out.extend_from_slice(nodes);
                out.push(cmd::MULTI_CHANNEL_ASSOCIATION_MARKER);
                for member in endpoints {
                    out.push(member.node);
                    out.push(member.endpoint);
                }
            }
        }

        out
    }

    /// Deserialize command-class payload bytes
    #[allow(clippy::missing_errors_doc)]
    pub fn deserialize(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() < 2 {
            return Err(ProtocolError::Truncated(data.len()));
        }

        let (class, command) = (data[0], data[1]);
        let body = &data[2..];

        match (class, command) {
            (class::BASIC, cmd::BASIC_SET) => Ok(Command::BasicSet {
                value: first_byte(body)?,
            }),
            (class::BASIC, cmd::BASIC_GET) => Ok(Command::BasicGet),
            (class::BASIC, cmd::BASIC_REPORT) => Ok(Command::BasicReport {
                value: first_byte(body)?,
            }),

            (class::SWITCH_BINARY, cmd::SWITCH_BINARY_SET) => Ok(Command::BinarySwitchSet {
                value: first_byte(body)?,
            }),
            (class::SWITCH_BINARY, cmd::SWITCH_BINARY_GET) => Ok(Command::BinarySwitchGet),
            (class::SWITCH_BINARY, cmd::SWITCH_BINARY_REPORT) => Ok(Command::BinarySwitchReport {
                value: first_byte(body)?,
            }),

            (class::SWITCH_MULTILEVEL, cmd::SWITCH_MULTILEVEL_SET) => {
                Ok(Command::MultilevelSwitchSet {
                    level: first_byte(body)?,
                })
            }
            (class::SWITCH_MULTILEVEL, cmd::SWITCH_MULTILEVEL_GET) => {
                Ok(Command::MultilevelSwitchGet)
            }
            (class::SWITCH_MULTILEVEL, cmd::SWITCH_MULTILEVEL_REPORT) => {
                Ok(Command::MultilevelSwitchReport {
                    level: first_byte(body)?,
                })
            }

            (class::METER, cmd::METER_REPORT) => Ok(Command::MeterReport {
                data: body.to_vec(),
            }),

            (class::MULTI_CHANNEL, cmd::MULTI_CHANNEL_CMD_ENCAP) => {
                // body[0] is the reporting endpoint, body[1] the source
                // endpoint, which is skipped without validation
                if body.len() < 2 {
                    return Err(ProtocolError::Truncated(data.len()));
                }
                let command = Command::deserialize(&body[2..])?;
                Ok(Command::MultiChannelEncap {
                    endpoint: body[0],
                    command: Box::new(command),
                })
            }

            (class::CONFIGURATION, cmd::CONFIGURATION_SET) => {
                if body.len() < 2 {
                    return Err(ProtocolError::Truncated(data.len()));
                }
                let format =
                    ValueFormat::from_size(body[1]).ok_or(ProtocolError::InvalidSize(body[1]))?;
                let value = decode_signed(body.get(2..2 + format.size() as usize))
                    .ok_or(ProtocolError::Truncated(data.len()))?;
                Ok(Command::ConfigurationSet {
                    parameter: body[0],
                    format,
                    value,
                })
            }
            (class::CONFIGURATION, cmd::CONFIGURATION_GET) => Ok(Command::ConfigurationGet {
                parameter: first_byte(body)?,
            }),
            (class::CONFIGURATION, cmd::CONFIGURATION_REPORT) => {
                if body.len() < 2 {
                    return Err(ProtocolError::Truncated(data.len()));
                }
                let size = body[1];
                ValueFormat::from_size(size).ok_or(ProtocolError::InvalidSize(size))?;
                let value = decode_signed(body.get(2..2 + size as usize))
                    .ok_or(ProtocolError::Truncated(data.len()))?;
                Ok(Command::ConfigurationReport {
                    parameter: body[0],
                    size,
                    value,
                })
            }

            (class::ASSOCIATION, cmd::ASSOCIATION_GET) => Ok(Command::AssociationGet {
                group: first_byte(body)?,
            }),
            (class::ASSOCIATION, cmd::ASSOCIATION_REPORT) => {
                if body.len() < 3 {
                    return Err(ProtocolError::Truncated(data.len()));
                }
                Ok(Command::AssociationReport {
                    group: body[0],
                    max_nodes: body[1],
                    num_reports: body[2],
                    nodes: body[3..].to_vec(),
                })
            }

            (class::MULTI_CHANNEL_ASSOCIATION, cmd::MULTI_CHANNEL_ASSOCIATION_GET) => {
                Ok(Command::MultiChannelAssociationGet {
                    group: first_byte(body)?,
                })
            }
            (class::MULTI_CHANNEL_ASSOCIATION, cmd::MULTI_CHANNEL_ASSOCIATION_SET) => {
                let group = first_byte(body)?;
                let (nodes, endpoints) = split_members(&body[1..]);
                Ok(Command::MultiChannelAssociationSet {
                    group,
                    nodes,
                    endpoints,
                })
            }
            (class::MULTI_CHANNEL_ASSOCIATION, cmd::MULTI_CHANNEL_ASSOCIATION_REMOVE) => {
                let group = first_byte(body)?;
                let (nodes, endpoints) = split_members(&body[1..]);
                Ok(Command::MultiChannelAssociationRemove {
                    group,
                    nodes,
                    endpoints,
                })
            }
            (class::MULTI_CHANNEL_ASSOCIATION, cmd::MULTI_CHANNEL_ASSOCIATION_REPORT) => {
                if body.len() < 3 {
                    return Err(ProtocolError::Truncated(data.len()));
                }
                let (nodes, endpoints) = split_members(&body[3..]);
                Ok(Command::MultiChannelAssociationReport {
                    group: body[0],
                    max_nodes: body[1],
                    num_reports: body[2],
                    nodes,
                    endpoints,
                })
            }

            _ => Err(ProtocolError::UnknownCommand { class, command }),
        }
    }
}

fn first_byte(body: &[u8]) -> Result<u8, ProtocolError> {
    body.first()
        .copied()
        .ok_or(ProtocolError::Truncated(body.len()))
}

/// Append the signed big-endian encoding of `value` at the given width
fn encode_signed(out: &mut Vec<u8>, value: i64, size: u8) {
    match size {
        1 => out.extend_from_slice(&(value as i8).to_be_bytes()),
        2 => out.extend_from_slice(&(value as i16).to_be_bytes()),
        _ => out.extend_from_slice(&(value as i32).to_be_bytes()),
    }
}

/// Decode a signed big-endian integer of 1, 2 or 4 bytes
fn decode_signed(bytes: Option<&[u8]>) -> Option<i64> {
    let bytes = bytes?;
    match bytes.len() {
        1 => Some(i64::from(bytes[0] as i8)),
        2 => Some(i64::from(i16::from_be_bytes([bytes[0], bytes[1]]))),
        4 => Some(i64::from(i32::from_be_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3],
        ]))),
        _ => None,
    }
}

/// Split an association member list at the marker byte into plain node ids
/// and (node, endpoint) pairs. Without a marker the whole list is plain nodes.
fn split_members(data: &[u8]) -> (Vec<u8>, Vec<EndpointAddress>) {
    let (plain, pairs) = match data
        .iter()
        .position(|&b| b == cmd::MULTI_CHANNEL_ASSOCIATION_MARKER)
    {
        Some(pos) => (&data[..pos], &data[pos + 1..]),
        None => (data, &[][..]),
    };

    let endpoints = pairs
        .chunks_exact(2)
        .map(|pair| EndpointAddress {
            node: pair[0],
            endpoint: pair[1],
        })
        .collect();

    (plain.to_vec(), endpoints)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_switch_set() {
        let cmd = Command::BinarySwitchSet { value: 0xFF };
        assert_eq!(cmd.serialize(), vec![0x25, 0x01, 0xFF]);
    }

    #[test]
    fn test_gets_have_no_body() {
        assert_eq!(Command::BasicGet.serialize(), vec![0x20, 0x02]);
        assert_eq!(Command::BinarySwitchGet.serialize(), vec![0x25, 0x02]);
        assert_eq!(Command::MultilevelSwitchGet.serialize(), vec![0x26, 0x02]);
    }

    #[test]
    fn test_multi_channel_encap() {
        let cmd = Command::MultiChannelEncap {
            endpoint: 2,
            command: Box::new(Command::BinarySwitchSet { value: 0 }),
        };
        assert_eq!(
            cmd.serialize(),
            vec![0x60, 0x0D, 0x00, 0x02, 0x25, 0x01, 0x00]
        );
    }

    #[test]
    fn test_multi_channel_encap_deserialize() {
        // incoming frames carry the reporting endpoint first, then one
        // skipped byte, then the inner command
        let decoded =
            Command::deserialize(&[0x60, 0x0D, 0x03, 0x01, 0x26, 0x03, 0x2A]).unwrap();
        assert_eq!(
            decoded,
            Command::MultiChannelEncap {
                endpoint: 3,
                command: Box::new(Command::MultilevelSwitchReport { level: 42 }),
            }
        );
    }

    #[test]
    fn test_configuration_set_byte() {
        let cmd = Command::ConfigurationSet {
            parameter: 1,
            format: ValueFormat::Byte,
            value: 16,
        };
        assert_eq!(cmd.serialize(), vec![0x70, 0x04, 0x01, 0x01, 0x10]);
    }

    #[test]
    fn test_configuration_set_short() {
        let cmd = Command::ConfigurationSet {
            parameter: 58,
            format: ValueFormat::Short,
            value: 3599,
        };
        assert_eq!(cmd.serialize(), vec![0x70, 0x04, 0x3A, 0x02, 0x0E, 0x0F]);
    }

    #[test]
    fn test_configuration_report_signed() {
        let decoded =
            Command::deserialize(&[0x70, 0x06, 0x07, 0x02, 0xFF, 0xFE]).unwrap();
        assert_eq!(
            decoded,
            Command::ConfigurationReport {
                parameter: 7,
                size: 2,
                value: -2,
            }
        );
    }

    #[test]
    fn test_configuration_report_bad_size() {
        assert!(Command::deserialize(&[0x70, 0x06, 0x07, 0x03, 0x01, 0x02, 0x03]).is_err());
    }

    #[test]
    fn test_value_format_fits() {
        assert!(ValueFormat::Byte.fits(-128));
        assert!(!ValueFormat::Byte.fits(128));
        assert!(ValueFormat::Short.fits(3599));
        assert!(!ValueFormat::Short.fits(0x10000));
        assert!(ValueFormat::Int.fits(-1));
    }

    #[test]
    fn test_association_report() {
        let decoded = Command::deserialize(&[0x85, 0x03, 0x01, 0x05, 0x01, 0x02, 0x09]).unwrap();
        assert_eq!(
            decoded,
            Command::AssociationReport {
                group: 1,
                max_nodes: 5,
                num_reports: 1,
                nodes: vec![2, 9],
            }
        );
    }

    #[test]
    fn test_multi_channel_association_report_marker_split() {
        let decoded = Command::deserialize(&[
            0x8E, 0x03, 0x02, 0x08, 0x01, 0x05, 0x06, 0x00, 0x07, 0x01, 0x07, 0x02,
        ])
        .unwrap();
        assert_eq!(
            decoded,
            Command::MultiChannelAssociationReport {
                group: 2,
                max_nodes: 8,
                num_reports: 1,
                nodes: vec![5, 6],
                endpoints: vec![
                    EndpointAddress {
                        node: 7,
                        endpoint: 1
                    },
                    EndpointAddress {
                        node: 7,
                        endpoint: 2
                    },
                ],
            }
        );
    }

    #[test]
    fn test_multi_channel_association_report_without_marker() {
        let decoded =
            Command::deserialize(&[0x8E, 0x03, 0x02, 0x08, 0x01, 0x05, 0x06]).unwrap();
        assert_eq!(
            decoded,
            Command::MultiChannelAssociationReport {
                group: 2,
                max_nodes: 8,
                num_reports: 1,
                nodes: vec![5, 6],
                endpoints: vec![],
            }
        );
    }

    #[test]
    fn test_multi_channel_association_set_roundtrip() {
        let cmd = Command::MultiChannelAssociationSet {
            group: 3,
            nodes: vec![4],
            endpoints: vec![EndpointAddress {
                node: 9,
                endpoint: 2,
            }],
        };
        assert_eq!(
            cmd.serialize(),
            vec![0x8E, 0x01, 0x03, 0x04, 0x00, 0x09, 0x02]
        );
        assert_eq!(Command::deserialize(&cmd.serialize()).unwrap(), cmd);
    }

    #[test]
    fn test_roundtrip_law() {
        let commands = [
            Command::BasicSet { value: 0xFF },
            Command::BasicGet,
            Command::BasicReport { value: 0 },
            Command::BinarySwitchSet { value: 0 },
            Command::BinarySwitchGet,
            Command::BinarySwitchReport { value: 0xFF },
            Command::MultilevelSwitchSet { level: 99 },
            Command::MultilevelSwitchGet,
            Command::MultilevelSwitchReport { level: 0xFF },
            Command::ConfigurationSet {
                parameter: 9,
                format: ValueFormat::Int,
                value: -70000,
            },
            Command::ConfigurationGet { parameter: 5 },
            Command::ConfigurationReport {
                parameter: 5,
                size: 1,
                value: -1,
            },
            Command::AssociationGet { group: 1 },
            Command::AssociationReport {
                group: 1,
                max_nodes: 5,
                num_reports: 1,
                nodes: vec![3],
            },
            Command::MultiChannelAssociationGet { group: 2 },
            Command::MultiChannelAssociationRemove {
                group: 2,
                nodes: vec![],
                endpoints: vec![EndpointAddress {
                    node: 4,
                    endpoint: 1,
                }],
            },
        ];

        for cmd in commands {
            let decoded = Command::deserialize(&cmd.serialize()).unwrap();
            assert_eq!(decoded, cmd);
        }
    }

    #[test]
    fn test_unknown_signature() {
        let err = Command::deserialize(&[0x31, 0x05, 0x01]).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::UnknownCommand {
                class: 0x31,
                command: 0x05
            }
        ));
    }

    #[test]
    fn test_truncated() {
        assert!(Command::deserialize(&[0x20]).is_err());
        assert!(Command::deserialize(&[0x25, 0x03]).is_err());
        assert!(Command::deserialize(&[0x60, 0x0D, 0x02]).is_err());
    }
}
