//! Topology and per-device configuration files
//!
//! The network topology is a YAML mapping with `nodes`, `switches` and
//! `dimmers` lists; each node may point at a per-device file naming its
//! configuration parameters.

use crate::network::NetworkError;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tokio::fs;
use zwave_protocol::ValueFormat;

/// Network topology: nodes plus the switches and dimmers they expose
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    #[serde(default)]
    pub nodes: Vec<NodeEntry>,
    #[serde(default)]
    pub switches: Vec<DeviceEntry>,
    #[serde(default)]
    pub dimmers: Vec<DeviceEntry>,
}

/// A physical node on the Z-Wave network
#[derive(Debug, Clone, Deserialize)]
pub struct NodeEntry {
    pub id: String,
    pub node: u8,
    #[serde(default)]
    pub name: String,
    /// Path to the per-device parameter map
    #[serde(default)]
    pub config: Option<String>,
}

/// A switch or dimmer exposed by a node endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceEntry {
    pub id: String,
    pub nodeid: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: u8,
    #[serde(default)]
    pub name: String,
}

fn default_endpoint() -> u8 {
    1
}

/// A named configuration parameter: device address and value format
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ParamSpec {
    pub address: u8,
    pub format: ValueFormat,
}

/// Per-device parameter file contents
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    #[serde(default)]
    pub config: HashMap<String, ParamSpec>,
}

/// Load the network topology file
#[allow(clippy::missing_errors_doc)]
pub async fn load_network_config(path: &Path) -> Result<NetworkConfig, NetworkError> {
    let contents = fs::read_to_string(path).await?;
    let config: NetworkConfig = serde_yaml::from_str(&contents)?;
    tracing::info!(
        "Loaded topology from {:?}: {} nodes, {} switches, {} dimmers",
        path,
        config.nodes.len(),
        config.switches.len(),
        config.dimmers.len()
    );
    Ok(config)
}

/// Load a per-device parameter map
#[allow(clippy::missing_errors_doc)]
pub async fn load_device_config(path: &Path) -> Result<DeviceConfig, NetworkError> {
    let contents = fs::read_to_string(path).await?;
    Ok(serde_yaml::from_str(&contents)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_topology() {
        let yaml = "
nodes:
  - id: relay
    node: 4
    name: Stair relay
    config: fgs_223.yaml
switches:
  - id: stair
    nodeid: relay
    endpoint: 2
    name: Stair light
dimmers:
  - id: hall
    nodeid: relay
    name: Hall dimmer
";
        let config: NetworkConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.nodes.len(), 1);
        assert_eq!(config.nodes[0].node, 4);
        assert_eq!(config.switches[0].endpoint, 2);
        // endpoint defaults to 1 when omitted
        assert_eq!(config.dimmers[0].endpoint, 1);
    }

    #[test]
    fn test_parse_device_config() {
        let yaml = "
config:
  minimum_brightness:
    address: 1
    format: B
  auto_off_delay:
    address: 58
    format: H
";
        let config: DeviceConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.config["minimum_brightness"].address, 1);
        assert_eq!(config.config["minimum_brightness"].format, ValueFormat::Byte);
        assert_eq!(config.config["auto_off_delay"].format, ValueFormat::Short);
    }
}
