//! Z-Wave object model
//!
//! This crate provides the node and endpoint abstractions on top of the
//! low-level Serial API transport: per-node command builders, named
//! configuration parameters, association management, and the routing of
//! unsolicited reports back to whoever is waiting for them.

pub mod config;
pub mod endpoint;
pub mod network;
pub mod node;

pub use config::{DeviceEntry, NetworkConfig, NodeEntry, ParamSpec};
pub use endpoint::{Endpoint, EndpointKind};
pub use network::{NetworkError, ZWaveNetwork};
pub use node::{AssociationMembers, Node};
