//! Async serial transport for the Z-Wave Serial API
//!
//! A writer task owns the outbound frame queue and the ACK/NAK/CAN handshake
//! with the stick; a dedicated reader thread does the blocking serial reads
//! and feeds complete frames to a dispatcher task, which correlates transmit
//! completions by callback id and surfaces everything else as events.

use crate::consts::{tx_options, ApiFunction, TransmitStatus, ACK, CAN, NAK, REQUEST, RESPONSE, SOF};
use crate::frame;
use crate::types::ProtocolError;

use serial2::SerialPort;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, Mutex};
use tokio::time::timeout;

/// Default baud rate for Z-Wave USB sticks
pub const BAUD_RATE: u32 = 115_200;

/// How long the reader blocks on the port before looping
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// How long the writer waits for the stick to answer a written frame
pub const ACK_TIMEOUT: Duration = Duration::from_secs(1);

/// Back-off before rewriting a frame the stick cancelled
pub const RETRY_TIME: Duration = Duration::from_millis(50);

/// Total write attempts per frame, CAN retries included
pub const MAX_RETRIES: u32 = 5;

/// How long a caller waits for the far-end transmit completion
pub const SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Callback ids cycle through `[FIRST_CALLBACK_ID, 0xFF]`
const FIRST_CALLBACK_ID: u8 = 0x20;

/// Byte-level serial access shared by the writer task and reader thread
pub trait SerialLink: Send + Sync + 'static {
    fn read(&self, buf: &mut [u8]) -> std::io::Result<usize>;
    fn write_all(&self, buf: &[u8]) -> std::io::Result<()>;
}

impl SerialLink for SerialPort {
    fn read(&self, buf: &mut [u8]) -> std::io::Result<usize> {
        SerialPort::read(self, buf)
    }

    fn write_all(&self, buf: &[u8]) -> std::io::Result<()> {
        SerialPort::write_all(self, buf)?;
        self.flush()
    }
}

/// Events surfaced from the stick
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    /// Unsolicited application command from a remote node
    NodeCommand { node_id: u8, payload: Vec<u8> },
    /// Node list reported by the stick's init data
    NodesDiscovered(Vec<u8>),
}

/// Transmission awaiting its completion callback
#[derive(Debug)]
struct PendingSend {
    /// Original command payload, kept for diagnostics
    payload: Vec<u8>,
    completion: oneshot::Sender<u8>,
}

/// Single-slot rendezvous between the writer and the reader for ACK/NAK/CAN
type HandshakeSlot = Arc<StdMutex<Option<oneshot::Sender<u8>>>>;

/// Transport for communicating with a Z-Wave controller stick
#[derive(Debug)]
pub struct ZWaveTransport {
    frame_tx: mpsc::Sender<Vec<u8>>,
    callback_id: AtomicU8,
    pending: Arc<Mutex<HashMap<u8, PendingSend>>>,
    event_tx: broadcast::Sender<ControllerEvent>,
    known_nodes: Arc<StdMutex<Vec<u8>>>,
}

impl ZWaveTransport {
    /// Open the serial device and start the background tasks
    #[allow(clippy::missing_errors_doc)]
    pub async fn connect(path: &str) -> Result<Self, ProtocolError> {
        tracing::info!("Opening Z-Wave controller at {}", path);

        let mut port = SerialPort::open(path, BAUD_RATE)?;
        port.set_read_timeout(READ_TIMEOUT)?;

        Ok(Self::with_link(Arc::new(port)))
    }

    /// Start the transport over an already-open serial link
    pub fn with_link<L: SerialLink>(link: Arc<L>) -> Self {
        let (frame_tx, frame_rx) = mpsc::channel(32);
        let (ack_tx, ack_rx) = mpsc::channel(32);
        let (body_tx, body_rx) = mpsc::channel(64);
        let (event_tx, _) = broadcast::channel(64);

        let handshake: HandshakeSlot = Arc::new(StdMutex::new(None));
        let pending: Arc<Mutex<HashMap<u8, PendingSend>>> = Arc::new(Mutex::new(HashMap::new()));
        let known_nodes = Arc::new(StdMutex::new(Vec::new()));

        tokio::spawn(Self::writer_task(
            link.clone(),
            frame_rx,
            ack_rx,
            handshake.clone(),
        ));

        {
            let link = link.clone();
            let handshake = handshake.clone();
            std::thread::spawn(move || Self::reader_loop(&link, &ack_tx, &body_tx, &handshake));
        }

        tokio::spawn(Self::dispatch_task(
            body_rx,
            pending.clone(),
            event_tx.clone(),
            known_nodes.clone(),
        ));

        Self {
            frame_tx,
            callback_id: AtomicU8::new(FIRST_CALLBACK_ID),
            pending,
            event_tx,
            known_nodes,
        }
    }

    /// Writer task: lone ACKs first, then queued request bodies
    async fn writer_task<L: SerialLink>(
        link: Arc<L>,
        mut frame_rx: mpsc::Receiver<Vec<u8>>,
        mut ack_rx: mpsc::Receiver<()>,
        handshake: HandshakeSlot,
    ) {
        loop {
            tokio::select! {
                biased;
                ack = ack_rx.recv() => match ack {
                    Some(()) => write_lone_ack(link.as_ref()),
                    None => break,
                },
                body = frame_rx.recv() => match body {
                    Some(body) => Self::write_frame(&link, &mut ack_rx, &handshake, &body).await,
                    None => break,
                },
            }
        }
        tracing::debug!("Writer task shutting down");
    }

    /// Write one frame and see it through the stick handshake
    async fn write_frame<L: SerialLink>(
        link: &Arc<L>,
        ack_rx: &mut mpsc::Receiver<()>,
        handshake: &HandshakeSlot,
        body: &[u8],
    ) {
        let data = frame::encode(body);

        let mut attempt = 0;
        loop {
            attempt += 1;

            let (tx, rx) = oneshot::channel();
            *handshake.lock().unwrap() = Some(tx);

            tracing::debug!("Tx: {:02X?}", data);
            if let Err(e) = link.write_all(&data) {
                tracing::error!("Serial write error: {}", e);
                break;
            }

            match Self::await_handshake(link.as_ref(), ack_rx, rx).await {
                Some(ACK) => break,
                Some(CAN) if attempt < MAX_RETRIES => {
                    tracing::debug!("Transmit cancelled, retrying ({}/{})", attempt, MAX_RETRIES);
                    tokio::time::sleep(RETRY_TIME).await;
                }
                Some(CAN) => {
                    tracing::error!("Transmit retries exhausted: {:02X?}", data);
                    break;
                }
                Some(NAK) => {
                    tracing::error!("Stick rejected frame: {:02X?}", data);
                    break;
                }
                Some(other) => {
                    tracing::warn!("Unexpected handshake byte {:#04X}", other);
                    break;
                }
                None => {
                    tracing::error!("No handshake for frame: {:02X?}", data);
                    break;
                }
            }
        }

        handshake.lock().unwrap().take();
    }

    /// Wait for the deposited control byte, servicing lone ACKs meanwhile so
    /// incoming data frames are acknowledged without waiting for this frame
    async fn await_handshake<L: SerialLink>(
        link: &L,
        ack_rx: &mut mpsc::Receiver<()>,
        rx: oneshot::Receiver<u8>,
    ) -> Option<u8> {
        let deadline = tokio::time::sleep(ACK_TIMEOUT);
        tokio::pin!(deadline);
        tokio::pin!(rx);

        loop {
            tokio::select! {
                result = &mut rx => return result.ok(),
                ack = ack_rx.recv() => match ack {
                    Some(()) => write_lone_ack(link),
                    None => return None,
                },
                () = &mut deadline => return None,
            }
        }
    }

    /// Reader thread: blocking reads, frame reassembly, handshake delivery
    fn reader_loop<L: SerialLink>(
        link: &Arc<L>,
        ack_tx: &mpsc::Sender<()>,
        body_tx: &mpsc::Sender<Vec<u8>>,
        handshake: &HandshakeSlot,
    ) {
        tracing::debug!("Reader thread started");
        loop {
            let mut first = [0u8; 1];
            match link.read(&mut first) {
                Ok(0) => {
                    tracing::warn!("Serial port closed");
                    break;
                }
                Ok(_) => {}
                Err(ref e) if is_timeout(e) => continue,
                Err(e) => {
                    tracing::error!("Serial read error: {}", e);
                    break;
                }
            }

            match first[0] {
                SOF => {
                    let Some(body) = Self::read_data_frame(link.as_ref()) else {
                        continue;
                    };
                    // acknowledge through the writer's priority lane
                    if ack_tx.blocking_send(()).is_err() || body_tx.blocking_send(body).is_err() {
                        break;
                    }
                }
                control @ (ACK | NAK | CAN) => match handshake.lock().unwrap().take() {
                    Some(slot) => {
                        let _ = slot.send(control);
                    }
                    None => tracing::warn!("Unexpected control byte {:#04X}", control),
                },
                other => tracing::warn!("Unexpected start byte {:#04X}", other),
            }
        }
        tracing::debug!("Reader thread shutting down");
    }

    /// Read length and body after a SOF byte. The length byte counts the body
    /// plus the trailing checksum, which is accepted without verification and
    /// stripped before dispatch.
    fn read_data_frame<L: SerialLink>(link: &L) -> Option<Vec<u8>> {
        let mut len_buf = [0u8; 1];
        match link.read(&mut len_buf) {
            Ok(1) => {}
            Ok(_) | Err(_) => {
                tracing::warn!("Timeout waiting for frame length");
                return None;
            }
        }

        let length = len_buf[0] as usize;
        if length == 0 {
            tracing::warn!("Empty data frame");
            return None;
        }

        let mut body = vec![0u8; length];
        let mut filled = 0;
        while filled < length {
            match link.read(&mut body[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(ref e) if is_timeout(e) => break,
                Err(e) => {
                    tracing::error!("Serial read error: {}", e);
                    return None;
                }
            }
        }

        if filled != length {
            tracing::warn!("Frame length mismatch {}/{}", filled, length);
            return None;
        }

        tracing::debug!("Rx: {:02X?}", body);
        body.pop();
        Some(body)
    }

    /// Dispatcher task: routes reassembled frame bodies
    async fn dispatch_task(
        mut body_rx: mpsc::Receiver<Vec<u8>>,
        pending: Arc<Mutex<HashMap<u8, PendingSend>>>,
        event_tx: broadcast::Sender<ControllerEvent>,
        known_nodes: Arc<StdMutex<Vec<u8>>>,
    ) {
        while let Some(body) = body_rx.recv().await {
            Self::dispatch(&body, &pending, &event_tx, &known_nodes).await;
        }
        tracing::debug!("Dispatcher task shutting down");
    }

    async fn dispatch(
        body: &[u8],
        pending: &Mutex<HashMap<u8, PendingSend>>,
        event_tx: &broadcast::Sender<ControllerEvent>,
        known_nodes: &StdMutex<Vec<u8>>,
    ) {
        if body.len() < 2 {
            tracing::warn!("Runt frame: {:02X?}", body);
            return;
        }

        let Some(function) = ApiFunction::from_u8(body[1]) else {
            tracing::debug!("Ignoring frame for function {:#04X}", body[1]);
            return;
        };

        match (body[0], function) {
            (RESPONSE, ApiFunction::AppCommandHandler) => {
                // [type, function, status, source node, payload length, payload...]
                if body.len() < 5 {
                    tracing::warn!("Short application command: {:02X?}", body);
                    return;
                }
                let node_id = body[3];
                let payload = body[5..].to_vec();
                let _ = event_tx.send(ControllerEvent::NodeCommand { node_id, payload });
            }
            (RESPONSE, ApiFunction::ZwSendData) => {
                // [type, function, callback id, completion code]
                if body.len() < 4 {
                    tracing::warn!("Short transmit completion: {:02X?}", body);
                    return;
                }
                let callback_id = body[2];
                let status = body[3];
                match pending.lock().await.remove(&callback_id) {
                    Some(sent) => {
                        if status != TransmitStatus::Ok as u8 {
                            tracing::warn!(
                                "Transmit failed ({:#04X}): {:02X?}",
                                status,
                                sent.payload
                            );
                        }
                        let _ = sent.completion.send(status);
                    }
                    None => {
                        tracing::warn!("Completion for unknown callback id {:#04X}", callback_id);
                    }
                }
            }
            (REQUEST, ApiFunction::GetInitData) => {
                // [type, function, version, capabilities, bitfield count, bitfields...]
                if body.len() < 5 {
                    tracing::warn!("Short init data: {:02X?}", body);
                    return;
                }
                let count = body[4] as usize;
                let Some(bitfields) = body.get(5..5 + count) else {
                    tracing::warn!("Truncated init data: {:02X?}", body);
                    return;
                };
                let nodes = decode_node_bitfield(bitfields);
                tracing::info!("Stick reports {} nodes: {:?}", nodes.len(), nodes);
                *known_nodes.lock().unwrap() = nodes.clone();
                let _ = event_tx.send(ControllerEvent::NodesDiscovered(nodes));
            }
            _ => tracing::debug!("Unhandled frame: {:02X?}", body),
        }
    }

    /// Transmit a command payload to a node and wait for the far-end
    /// completion report
    #[allow(clippy::missing_errors_doc)]
    pub async fn send_data(&self, node_id: u8, command_payload: &[u8]) -> Result<(), ProtocolError> {
        let callback_id = self.next_callback_id();

        let mut body = Vec::with_capacity(command_payload.len() + 6);
        body.push(REQUEST);
        body.push(ApiFunction::ZwSendData as u8);
        body.push(node_id);
        body.push(command_payload.len() as u8);
        body.extend_from_slice(command_payload);
        body.push(tx_options::DEFAULT);
        body.push(callback_id);

        let (completion_tx, completion_rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            pending.insert(
                callback_id,
                PendingSend {
                    payload: command_payload.to_vec(),
                    completion: completion_tx,
                },
            );
        }

        self.frame_tx
            .send(body)
            .await
            .map_err(|_| ProtocolError::NotConnected)?;

        match timeout(SEND_TIMEOUT, completion_rx).await {
            Ok(Ok(status)) => match TransmitStatus::from_u8(status) {
                Some(TransmitStatus::Ok) => Ok(()),
                _ => Err(ProtocolError::TransmitFailed(status)),
            },
            Ok(Err(_)) => Err(ProtocolError::Timeout),
            Err(_) => {
                self.pending.lock().await.remove(&callback_id);
                Err(ProtocolError::Timeout)
            }
        }
    }

    /// Ask the stick for its firmware version (fire and forget; the answer
    /// arrives as an unsolicited frame)
    #[allow(clippy::missing_errors_doc)]
    pub async fn request_version(&self) -> Result<(), ProtocolError> {
        self.enqueue(vec![REQUEST, ApiFunction::ZwGetVersion as u8])
            .await
    }

    /// Ask the stick for its node bitfield
    #[allow(clippy::missing_errors_doc)]
    pub async fn request_init_data(&self) -> Result<(), ProtocolError> {
        self.enqueue(vec![REQUEST, ApiFunction::GetInitData as u8])
            .await
    }

    async fn enqueue(&self, body: Vec<u8>) -> Result<(), ProtocolError> {
        self.frame_tx
            .send(body)
            .await
            .map_err(|_| ProtocolError::NotConnected)
    }

    /// Node ids most recently reported by the stick's init data
    #[must_use]
    pub fn known_nodes(&self) -> Vec<u8> {
        self.known_nodes.lock().unwrap().clone()
    }

    /// Subscribe to controller events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.event_tx.subscribe()
    }

    fn next_callback_id(&self) -> u8 {
        self.callback_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |id| {
                Some(if id == 0xFF { FIRST_CALLBACK_ID } else { id + 1 })
            })
            .unwrap_or(FIRST_CALLBACK_ID)
    }
}

fn write_lone_ack<L: SerialLink>(link: &L) {
    if let Err(e) = link.write_all(&[ACK]) {
        tracing::error!("Failed to write ACK: {}", e);
    }
}

fn is_timeout(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
    ) || e.raw_os_error() == Some(libc::EAGAIN)
}

/// Decode the LSB-first node bitfield: byte `i` bit `b` set means node
/// `i * 8 + b + 1` is present
fn decode_node_bitfield(bitfields: &[u8]) -> Vec<u8> {
    let mut nodes = Vec::new();
    for (index, bits) in bitfields.iter().enumerate() {
        for bit in 0..8 {
            if bits & (1 << bit) != 0 {
                nodes.push((index * 8 + bit + 1) as u8);
            }
        }
    }
    nodes
}
