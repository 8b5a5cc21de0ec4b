//! Z-Wave node representation
//!
//! A node owns its endpoints and the tables of outstanding configuration and
//! association waiters. Incoming commands for the node are decoded here and
//! routed to whichever waiter or endpoint they belong to.

use crate::config::ParamSpec;
use crate::endpoint::Endpoint;
use crate::network::NetworkError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio::time::timeout;
use zwave_protocol::{Command, EndpointAddress, ValueFormat, ZWaveTransport};

/// How long a configuration get waits for the matching report
pub const CONFIG_TIMEOUT: Duration = Duration::from_secs(1);

/// How long an association get waits for the matching report
pub const ASSOC_TIMEOUT: Duration = Duration::from_secs(2);

/// Membership of an association group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationMembers {
    #[serde(default)]
    pub nodes: Vec<u8>,
    #[serde(default)]
    pub multi_channel_nodes: Vec<EndpointAddress>,
}

/// A node on the Z-Wave network
#[derive(Debug)]
pub struct Node {
    id: u8,
    name: String,
    api: Arc<ZWaveTransport>,
    config: HashMap<String, ParamSpec>,
    config_waiters: Mutex<HashMap<u8, oneshot::Sender<i64>>>,
    assoc_waiters: Mutex<HashMap<u8, oneshot::Sender<AssociationMembers>>>,
    endpoints: RwLock<HashMap<u8, Arc<Endpoint>>>,
}

impl Node {
    #[must_use]
    pub fn new(
        id: u8,
        name: impl Into<String>,
        config: HashMap<String, ParamSpec>,
        api: Arc<ZWaveTransport>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id,
            name: name.into(),
            api,
            config,
            config_waiters: Mutex::new(HashMap::new()),
            assoc_waiters: Mutex::new(HashMap::new()),
            endpoints: RwLock::new(HashMap::new()),
        })
    }

    #[must_use]
    pub fn id(&self) -> u8 {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of the configuration parameters known for this device
    #[must_use]
    pub fn parameter_names(&self) -> Vec<String> {
        self.config.keys().cloned().collect()
    }

    pub(crate) fn register_endpoint(&self, endpoint: Arc<Endpoint>) {
        let endpoint_id = endpoint.id();
        let mut endpoints = self.endpoints.write().unwrap();
        if endpoints.insert(endpoint_id, endpoint).is_some() {
            tracing::warn!("Node {}: endpoint {} registered twice", self.id, endpoint_id);
        }
    }

    /// Serialize a command and hand it to the transport
    #[allow(clippy::missing_errors_doc)]
    pub async fn send_command(&self, command: &Command) -> Result<(), NetworkError> {
        self.api.send_data(self.id, &command.serialize()).await?;
        Ok(())
    }

    /// Send a command to one endpoint, encapsulating it if the node has more
    /// than one endpoint registered
    #[allow(clippy::missing_errors_doc)]
    pub async fn send_endpoint_command(
        &self,
        endpoint_id: u8,
        command: Command,
    ) -> Result<(), NetworkError> {
        let multi_channel = self.endpoints.read().unwrap().len() > 1;
        let command = if multi_channel {
            Command::MultiChannelEncap {
                endpoint: endpoint_id,
                command: Box::new(command),
            }
        } else {
            command
        };
        self.send_command(&command).await
    }

    /// Decode an incoming command payload and route it
    pub async fn handle_command(&self, payload: &[u8]) {
        let command = match Command::deserialize(payload) {
            Ok(command) => command,
            Err(e) => {
                tracing::warn!(
                    "Node {}: undecodable command {:02X?}: {}",
                    self.id,
                    payload,
                    e
                );
                return;
            }
        };
        tracing::debug!("Node {}: received {:?}", self.id, command);
        self.deliver(command).await;
    }

    async fn deliver(&self, command: Command) {
        match command {
            Command::ConfigurationReport {
                parameter, value, ..
            } => match self.config_waiters.lock().await.remove(&parameter) {
                Some(waiter) => {
                    let _ = waiter.send(value);
                }
                None => tracing::debug!(
                    "Node {}: unsolicited configuration report for parameter {}",
                    self.id,
                    parameter
                ),
            },

            Command::AssociationReport { group, nodes, .. } => {
                self.resolve_association(
                    group,
                    AssociationMembers {
                        nodes,
                        multi_channel_nodes: Vec::new(),
                    },
                )
                .await;
            }

            Command::MultiChannelAssociationReport {
                group,
                nodes,
                endpoints,
                ..
            } => {
                self.resolve_association(
                    group,
                    AssociationMembers {
                        nodes,
                        multi_channel_nodes: endpoints,
                    },
                )
                .await;
            }

            Command::MultiChannelEncap { endpoint, command } => {
                let target = self.endpoints.read().unwrap().get(&endpoint).cloned();
                match target {
                    Some(target) => target.handle_command(&command),
                    None => {
                        tracing::warn!("Node {}: report for unknown endpoint {}", self.id, endpoint);
                    }
                }
            }

            other => {
                let target = self.endpoints.read().unwrap().get(&1).cloned();
                match target {
                    Some(target) => target.handle_command(&other),
                    None => tracing::warn!("Node {}: unhandled command {:?}", self.id, other),
                }
            }
        }
    }

    async fn resolve_association(&self, group: u8, members: AssociationMembers) {
        match self.assoc_waiters.lock().await.remove(&group) {
            Some(waiter) => {
                let _ = waiter.send(members);
            }
            None => tracing::debug!(
                "Node {}: unsolicited association report for group {}",
                self.id,
                group
            ),
        }
    }

    /// Read a configuration parameter by symbolic name or raw address.
    /// An unresolvable name yields `Ok(None)` without touching the network.
    #[allow(clippy::missing_errors_doc)]
    pub async fn get_configuration(&self, parameter: &str) -> Result<Option<i64>, NetworkError> {
        let address = match self.config.get(parameter) {
            Some(spec) => spec.address,
            None => match parameter.parse::<u8>() {
                Ok(address) => address,
                Err(_) => {
                    tracing::warn!("Node {}: unknown parameter {}", self.id, parameter);
                    return Ok(None);
                }
            },
        };

        let (tx, rx) = oneshot::channel();
        self.config_waiters.lock().await.insert(address, tx);

        if let Err(e) = self
            .send_command(&Command::ConfigurationGet { parameter: address })
            .await
        {
            self.config_waiters.lock().await.remove(&address);
            return Err(e);
        }

        match timeout(CONFIG_TIMEOUT, rx).await {
            Ok(Ok(value)) => Ok(Some(value)),
            _ => {
                self.config_waiters.lock().await.remove(&address);
                Err(NetworkError::Timeout)
            }
        }
    }

    /// Write a configuration parameter. Raw addresses need an explicit
    /// format; named parameters carry theirs in the device map. Does not
    /// wait for a report.
    #[allow(clippy::missing_errors_doc)]
    pub async fn set_configuration(
        &self,
        parameter: &str,
        value: i64,
        format: Option<ValueFormat>,
    ) -> Result<(), NetworkError> {
        let (address, format) = match self.config.get(parameter) {
            Some(spec) => (spec.address, spec.format),
            None => match (parameter.parse::<u8>(), format) {
                (Ok(address), Some(format)) => (address, format),
                _ => {
                    tracing::warn!("Node {}: unknown parameter {}", self.id, parameter);
                    return Err(NetworkError::UnknownParameter(parameter.to_string()));
                }
            },
        };

        if !format.fits(value) {
            return Err(NetworkError::BadValue(format!(
                "value {value} does not fit parameter {parameter}"
            )));
        }

        self.send_command(&Command::ConfigurationSet {
            parameter: address,
            format,
            value,
        })
        .await
    }

    /// Query a plain association group
    #[allow(clippy::missing_errors_doc)]
    pub async fn get_association(&self, group: u8) -> Result<AssociationMembers, NetworkError> {
        self.await_association(group, Command::AssociationGet { group })
            .await
    }

    /// Query a multi-channel association group
    #[allow(clippy::missing_errors_doc)]
    pub async fn get_multi_channel_association(
        &self,
        group: u8,
    ) -> Result<AssociationMembers, NetworkError> {
        self.await_association(group, Command::MultiChannelAssociationGet { group })
            .await
    }

    async fn await_association(
        &self,
        group: u8,
        command: Command,
    ) -> Result<AssociationMembers, NetworkError> {
        let (tx, rx) = oneshot::channel();
        self.assoc_waiters.lock().await.insert(group, tx);

        if let Err(e) = self.send_command(&command).await {
            self.assoc_waiters.lock().await.remove(&group);
            return Err(e);
        }

        match timeout(ASSOC_TIMEOUT, rx).await {
            Ok(Ok(members)) => Ok(members),
            _ => {
                self.assoc_waiters.lock().await.remove(&group);
                Err(NetworkError::Timeout)
            }
        }
    }

    /// Add members to a multi-channel association group (fire and forget)
    #[allow(clippy::missing_errors_doc)]
    pub async fn set_multi_channel_association(
        &self,
        group: u8,
        nodes: Vec<u8>,
        multi_channel_nodes: Vec<EndpointAddress>,
    ) -> Result<(), NetworkError> {
        self.send_command(&Command::MultiChannelAssociationSet {
            group,
            nodes,
            endpoints: multi_channel_nodes,
        })
        .await
    }

    /// Remove members from a multi-channel association group (fire and forget)
    #[allow(clippy::missing_errors_doc)]
    pub async fn remove_multi_channel_association(
        &self,
        group: u8,
        nodes: Vec<u8>,
        multi_channel_nodes: Vec<EndpointAddress>,
    ) -> Result<(), NetworkError> {
        self.send_command(&Command::MultiChannelAssociationRemove {
            group,
            nodes,
            endpoints: multi_channel_nodes,
        })
        .await
    }
}
