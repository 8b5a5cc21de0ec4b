//! Node endpoints: basic, binary switch and multilevel switch
//!
//! An endpoint is a logical sub-device of a node; endpoint 1 is canonical for
//! single-endpoint nodes. Each endpoint keeps a single completion slot for
//! its most recent `get` and latches the last value it saw reported.

use crate::network::NetworkError;
use crate::node::Node;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::timeout;
use zwave_protocol::Command;

/// How long a `get` waits for the matching report
pub const GET_TIMEOUT: Duration = Duration::from_secs(2);

/// The capability set an endpoint speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    Basic,
    BinarySwitch,
    MultilevelSwitch,
}

/// A logical sub-device of a node
#[derive(Debug)]
pub struct Endpoint {
    node: Weak<Node>,
    id: u8,
    name: String,
    kind: EndpointKind,
    pending_get: Mutex<Option<oneshot::Sender<u8>>>,
    last_value: Mutex<Option<u8>>,
}

impl Endpoint {
    /// Create the endpoint and register it with its node
    #[must_use]
    pub fn new(node: &Arc<Node>, id: u8, name: impl Into<String>, kind: EndpointKind) -> Arc<Self> {
        let endpoint = Arc::new(Self {
            node: Arc::downgrade(node),
            id,
            name: name.into(),
            kind,
            pending_get: Mutex::new(None),
            last_value: Mutex::new(None),
        });
        node.register_endpoint(endpoint.clone());
        endpoint
    }

    #[must_use]
    pub fn id(&self) -> u8 {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> EndpointKind {
        self.kind
    }

    /// The most recently reported value, if any
    #[must_use]
    pub fn last_value(&self) -> Option<u8> {
        *self.last_value.lock().unwrap()
    }

    /// Set the endpoint state. Multilevel endpoints only accept levels in
    /// `[0, 99]` or `0xFF` for "restore previous".
    #[allow(clippy::missing_errors_doc)]
    pub async fn set(&self, value: u8) -> Result<(), NetworkError> {
        let command = match self.kind {
            EndpointKind::Basic => Command::BasicSet { value },
            EndpointKind::BinarySwitch => Command::BinarySwitchSet { value },
            EndpointKind::MultilevelSwitch => {
                if value > 99 && value != 0xFF {
                    return Err(NetworkError::BadValue(format!(
                        "level {value} out of range"
                    )));
                }
                Command::MultilevelSwitchSet { level: value }
            }
        };
        self.send(command).await
    }

    /// Read the endpoint state. Returns `None` when no report arrives in
    /// time; a fresh `get` displaces any still-outstanding one, which then
    /// observes the timeout outcome.
    #[allow(clippy::missing_errors_doc)]
    pub async fn get(&self) -> Result<Option<u8>, NetworkError> {
        let (tx, rx) = oneshot::channel();
        *self.pending_get.lock().unwrap() = Some(tx);

        let command = match self.kind {
            EndpointKind::Basic => Command::BasicGet,
            EndpointKind::BinarySwitch => Command::BinarySwitchGet,
            EndpointKind::MultilevelSwitch => Command::MultilevelSwitchGet,
        };
        self.send(command).await?;

        match timeout(GET_TIMEOUT, rx).await {
            Ok(Ok(value)) => Ok(Some(value)),
            _ => Ok(None),
        }
    }

    async fn send(&self, command: Command) -> Result<(), NetworkError> {
        let Some(node) = self.node.upgrade() else {
            return Err(NetworkError::UnknownNode(self.name.clone()));
        };
        node.send_endpoint_command(self.id, command).await
    }

    /// Handle a report addressed to this endpoint. Typed switches also
    /// accept plain basic reports.
    pub(crate) fn handle_command(&self, command: &Command) {
        match (self.kind, command) {
            (EndpointKind::BinarySwitch, Command::BinarySwitchReport { value })
            | (EndpointKind::MultilevelSwitch, Command::MultilevelSwitchReport { level: value })
            | (_, Command::BasicReport { value }) => self.resolve(*value),
            _ => tracing::debug!("Endpoint {}: ignoring {:?}", self.id, command),
        }
    }

    fn resolve(&self, value: u8) {
        *self.last_value.lock().unwrap() = Some(value);
        if let Some(waiter) = self.pending_get.lock().unwrap().take() {
            let _ = waiter.send(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use zwave_protocol::{SerialLink, ZWaveTransport};

    /// Serial double that ACKs and completes everything it is handed
    struct FakeStick {
        reads: StdMutex<VecDeque<u8>>,
    }

    impl FakeStick {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                reads: StdMutex::new(VecDeque::new()),
            })
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
                let mut reads = self.reads.lock().unwrap();
                reads.push_back(0x06);
                if buf.len() > 4 && buf[3] == 0x13 {
                    let callback_id = buf[buf.len() - 2];
                    reads.extend(zwave_protocol::frame::encode(&[
                        0x00,
                        0x13,
                        callback_id,
                        0x00,
                    ]));
                }
            }
            Ok(())
        }
    }

    fn switch_fixture(kind: EndpointKind) -> (Arc<Node>, Arc<Endpoint>) {
        let api = Arc::new(ZWaveTransport::with_link(FakeStick::new()));
        let node = Node::new(4, "test node", HashMap::new(), api);
        let endpoint = Endpoint::new(&node, 1, "switch", kind);
        (node, endpoint)
    }

    #[tokio::test]
    async fn test_get_resolves_on_report() {
        let (node, endpoint) = switch_fixture(EndpointKind::BinarySwitch);

        let get = {
            let endpoint = endpoint.clone();
            tokio::spawn(async move { endpoint.get().await })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        node.handle_command(&Command::BinarySwitchReport { value: 0xFF }.serialize())
            .await;

        assert_eq!(get.await.unwrap().unwrap(), Some(0xFF));
        assert_eq!(endpoint.last_value(), Some(0xFF));
    }

    #[tokio::test]
    async fn test_second_get_displaces_first() {
        let (node, endpoint) = switch_fixture(EndpointKind::BinarySwitch);

        let first = {
            let endpoint = endpoint.clone();
            tokio::spawn(async move { endpoint.get().await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;

        let second = {
            let endpoint = endpoint.clone();
            tokio::spawn(async move { endpoint.get().await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;

        node.handle_command(&Command::BinarySwitchReport { value: 0 }.serialize())
            .await;

        assert_eq!(first.await.unwrap().unwrap(), None);
        assert_eq!(second.await.unwrap().unwrap(), Some(0));
    }

    #[tokio::test]
    async fn test_multilevel_level_validation() {
        let (_node, dimmer) = switch_fixture(EndpointKind::MultilevelSwitch);

        assert!(matches!(
            dimmer.set(150).await,
            Err(NetworkError::BadValue(_))
        ));
        dimmer.set(99).await.unwrap();
        dimmer.set(0xFF).await.unwrap();
    }

    #[tokio::test]
    async fn test_basic_report_fallthrough() {
        let (node, endpoint) = switch_fixture(EndpointKind::MultilevelSwitch);

        node.handle_command(&Command::BasicReport { value: 42 }.serialize())
            .await;

        assert_eq!(endpoint.last_value(), Some(42));
    }

    #[tokio::test]
    async fn test_mismatched_report_is_ignored() {
        let (node, endpoint) = switch_fixture(EndpointKind::BinarySwitch);

        node.handle_command(&Command::MultilevelSwitchReport { level: 10 }.serialize())
            .await;

        assert_eq!(endpoint.last_value(), None);
    }
}
