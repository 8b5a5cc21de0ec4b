//! Z-Wave network manager
//!
//! Builds the object model from the topology configuration and routes
//! unsolicited controller events to the owning node.

use crate::config::{self, NetworkConfig};
use crate::endpoint::{Endpoint, EndpointKind};
use crate::node::Node;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use zwave_protocol::{ControllerEvent, ProtocolError, ZWaveTransport};

/// Network errors
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("unknown node: {0}")]
    UnknownNode(String),

    #[error("unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("bad value: {0}")]
    BadValue(String),

    #[error("report timeout")]
    Timeout,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] serde_yaml::Error),
}

/// The Z-Wave network: nodes keyed for HTTP lookup and for dispatch
#[derive(Debug)]
pub struct ZWaveNetwork {
    api: Arc<ZWaveTransport>,
    nodes: HashMap<String, Arc<Node>>,
    switches: HashMap<String, Arc<Endpoint>>,
    dimmers: HashMap<String, Arc<Endpoint>>,
}

impl ZWaveNetwork {
    /// Build nodes, switches and dimmers from the topology and start routing
    /// controller events to them
    #[allow(clippy::missing_errors_doc)]
    pub async fn build(
        config: NetworkConfig,
        api: Arc<ZWaveTransport>,
    ) -> Result<Self, NetworkError> {
        let mut nodes: HashMap<String, Arc<Node>> = HashMap::new();
        let mut nodes_by_id: HashMap<u8, Arc<Node>> = HashMap::new();

        for entry in &config.nodes {
            let parameters = match &entry.config {
                Some(path) => config::load_device_config(Path::new(path)).await?.config,
                None => HashMap::new(),
            };

            let node = Node::new(entry.node, entry.name.clone(), parameters, api.clone());
            if nodes_by_id.insert(entry.node, node.clone()).is_some() {
                tracing::warn!("Node {} appears twice in the topology", entry.node);
            }
            nodes.insert(entry.id.clone(), node);
        }

        let mut switches = HashMap::new();
        for entry in &config.switches {
            let node = nodes
                .get(&entry.nodeid)
                .ok_or_else(|| NetworkError::UnknownNode(entry.nodeid.clone()))?;
            let endpoint = Endpoint::new(
                node,
                entry.endpoint,
                entry.name.clone(),
                EndpointKind::BinarySwitch,
            );
            switches.insert(entry.id.clone(), endpoint);
        }

        let mut dimmers = HashMap::new();
        for entry in &config.dimmers {
            let node = nodes
                .get(&entry.nodeid)
                .ok_or_else(|| NetworkError::UnknownNode(entry.nodeid.clone()))?;
            let endpoint = Endpoint::new(
                node,
                entry.endpoint,
                entry.name.clone(),
                EndpointKind::MultilevelSwitch,
            );
            dimmers.insert(entry.id.clone(), endpoint);
        }

        let network = Self {
            api,
            nodes,
            switches,
            dimmers,
        };
        network.start_event_listener(nodes_by_id);

        Ok(network)
    }

    /// Route controller events to the owning node in the background
    fn start_event_listener(&self, nodes_by_id: HashMap<u8, Arc<Node>>) {
        let mut events = self.api.subscribe();

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(ControllerEvent::NodeCommand { node_id, payload }) => {
                        match nodes_by_id.get(&node_id) {
                            Some(node) => node.handle_command(&payload).await,
                            None => tracing::warn!(
                                "Command from unknown node {}: {:02X?}",
                                node_id,
                                payload
                            ),
                        }
                    }
                    Ok(ControllerEvent::NodesDiscovered(node_ids)) => {
                        tracing::info!("Controller reports nodes {:?}", node_ids);
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("Event listener lagged by {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            tracing::debug!("Event listener shutting down");
        });
    }

    /// The underlying transport
    #[must_use]
    pub fn transport(&self) -> &ZWaveTransport {
        &self.api
    }

    #[must_use]
    pub fn nodes(&self) -> &HashMap<String, Arc<Node>> {
        &self.nodes
    }

    #[must_use]
    pub fn node(&self, id: &str) -> Option<Arc<Node>> {
        self.nodes.get(id).cloned()
    }

    #[must_use]
    pub fn switches(&self) -> &HashMap<String, Arc<Endpoint>> {
        &self.switches
    }

    #[must_use]
    pub fn switch(&self, id: &str) -> Option<Arc<Endpoint>> {
        self.switches.get(id).cloned()
    }

    #[must_use]
    pub fn dimmers(&self) -> &HashMap<String, Arc<Endpoint>> {
        &self.dimmers
    }

    #[must_use]
    pub fn dimmer(&self, id: &str) -> Option<Arc<Endpoint>> {
        self.dimmers.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;
    use zwave_protocol::{frame, Command, SerialLink};

    struct FakeStick {
        reads: StdMutex<VecDeque<u8>>,
    }

    impl FakeStick {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                reads: StdMutex::new(VecDeque::new()),
            })
        }

        fn inject(&self, bytes: &[u8]) {
            self.reads.lock().unwrap().extend(bytes);
        }
    }

    impl SerialLink for FakeStick {
        fn read(&self, buf: &mut [u8]) -> std::io::Result<usize> {
            let mut reads = self.reads.lock().unwrap();
            if reads.is_empty() {
                drop(reads);
                std::thread::sleep(Duration::from_millis(5));
                return Err(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "read timeout",
                ));
            }
            let n = buf.len().min(reads.len());
            for slot in buf.iter_mut().take(n) {
                *slot = reads.pop_front().unwrap();
            }
            Ok(n)
        }

        fn write_all(&self, buf: &[u8]) -> std::io::Result<()> {
            if buf.first() == Some(&0x01) {
                self.reads.lock().unwrap().push_back(0x06);
            }
            Ok(())
        }
    }

    fn topology() -> NetworkConfig {
        serde_yaml::from_str(
            "
nodes:
  - id: relay
    node: 4
    name: Stair relay
switches:
  - id: stair
    nodeid: relay
    name: Stair light
dimmers:
  - id: hall
    nodeid: relay
    endpoint: 2
    name: Hall dimmer
",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_build_registers_devices() {
        let api = Arc::new(zwave_protocol::ZWaveTransport::with_link(FakeStick::new()));
        let network = ZWaveNetwork::build(topology(), api).await.unwrap();

        assert!(network.node("relay").is_some());
        assert!(network.node("nope").is_none());
        assert_eq!(network.switches().len(), 1);
        assert_eq!(network.dimmers().len(), 1);
        assert_eq!(network.switch("stair").unwrap().id(), 1);
        assert_eq!(network.dimmer("hall").unwrap().id(), 2);
    }

    #[tokio::test]
    async fn test_build_rejects_unknown_node_reference() {
        let config: NetworkConfig = serde_yaml::from_str(
            "
nodes: []
switches:
  - id: stair
    nodeid: relay
",
        )
        .unwrap();

        let api = Arc::new(zwave_protocol::ZWaveTransport::with_link(FakeStick::new()));
        let err = ZWaveNetwork::build(config, api).await.unwrap_err();
        assert!(matches!(err, NetworkError::UnknownNode(_)));
    }

    #[tokio::test]
    async fn test_incoming_command_routed_to_node_endpoint() {
        let stick = FakeStick::new();
        let api = Arc::new(zwave_protocol::ZWaveTransport::with_link(stick.clone()));
        let network = ZWaveNetwork::build(topology(), api).await.unwrap();

        // unsolicited binary switch report from node 4, endpoint 1
        let mut body = vec![0x00, 0x04, 0x00, 0x04, 0x03];
        body.extend(Command::BinarySwitchReport { value: 0xFF }.serialize());
        stick.inject(&frame::encode(&body));

        let switch = network.switch("stair").unwrap();
        for _ in 0..100 {
            if switch.last_value() == Some(0xFF) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("report never reached the endpoint");
    }
}
