//! The RDMnet stream client
//!
//! Owns one TCP/TLS connection to a broker and everything that rides
//! on it: stream reassembly, decode dispatch, the request/response
//! waiter table, the broker session state machine, the endpoint
//! capability cache, heartbeats and reconnects.
//!
//! One reader task drains the socket and dispatches packets; one
//! writer task drains an mpsc queue onto the socket; a heartbeat task
//! ticks on its own timer. All session state lives behind short-lived
//! locks that are never held across an await point.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use luxflow_core::Uid;
use luxflow_proto::acn::{build_rdmnet_packet, extract_rdmnet_packets, RootPacket};
use luxflow_proto::rdm::RdmFrame;
use luxflow_proto::rdmnet::{
    BrokerMessage, BrokerStatusCode, ClientRole, DisconnectReason, EndpointRole, EptMessage,
    LlrpMessage, RdmnetMessage, RptMessage, RptStatusCode, VECTOR_ROOT_BROKER, VECTOR_ROOT_EPT,
    VECTOR_ROOT_LLRP, VECTOR_ROOT_RPT,
};

use crate::error::{ErrorCode, ErrorDomain, RdmnetError};

use super::capabilities::{normalize_profiles, CapabilitySource, EndpointCapability};
use super::config::{AuthContext, RdmnetClientConfig};
use super::events::{BrokerState, RdmnetEvent};
use super::transport::{connect_stream, RdmnetStream};
use super::waiters::WaiterTable;

/// Options for [`RdmnetClient::start_broker_session`]
#[derive(Debug, Clone)]
pub struct BrokerSessionOptions {
    /// Broker scope to connect under
    pub scope: String,
    /// Role announced in the ConnectRequest
    pub role: ClientRole,
    /// Endpoint to bind after connecting
    pub endpoint_id: u16,
    /// Continue into the bind step after a successful connect
    pub auto_bind: bool,
    /// Role requested for the endpoint bind
    pub endpoint_role: EndpointRole,
    /// Profiles offered in the bind request
    pub profiles: Vec<u16>,
    /// Fail the session when the broker negotiates something else
    pub strict_negotiation: bool,
    /// Per-step deadline; the client default when unset
    pub timeout: Option<Duration>,
}

impl Default for BrokerSessionOptions {
    fn default() -> Self {
        Self {
            scope: "default".to_string(),
            role: ClientRole::Controller,
            endpoint_id: 1,
            auto_bind: true,
            endpoint_role: EndpointRole::Controller,
            profiles: Vec::new(),
            strict_negotiation: false,
            timeout: None,
        }
    }
}

/// A successful endpoint advertisement acknowledgement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvertisementAck {
    pub accepted: bool,
    pub status: RptStatusCode,
}

struct SessionState {
    broker: BrokerState,
    client_id: Option<u32>,
}

struct Shared {
    config: RdmnetClientConfig,
    cid: [u8; 16],
    state: Mutex<SessionState>,
    waiters: WaiterTable,
    capabilities: Mutex<HashMap<u16, EndpointCapability>>,
    sequence: AtomicU32,
    events: broadcast::Sender<RdmnetEvent>,
    writer: Mutex<Option<mpsc::Sender<Vec<u8>>>>,
    connected: AtomicBool,
    manual_close: AtomicBool,
    reconnect_attempt: AtomicU32,
    connect_lock: tokio::sync::Mutex<()>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    reconnect_task: Mutex<Option<JoinHandle<()>>>,
}

/// RDMnet stream client
///
/// Cheap to share: all methods take `&self` and the heavy state lives
/// in one internally synchronized allocation.
pub struct RdmnetClient {
    shared: Arc<Shared>,
}

impl RdmnetClient {
    /// Create a client; no connection is made until [`connect`](Self::connect)
    pub fn new(config: RdmnetClientConfig) -> Self {
        let cid = config.cid.unwrap_or_else(|| *uuid::Uuid::new_v4().as_bytes());
        let (events, _) = broadcast::channel(256);
        Self {
            shared: Arc::new(Shared {
                config,
                cid,
                state: Mutex::new(SessionState {
                    broker: BrokerState::Disconnected,
                    client_id: None,
                }),
                waiters: WaiterTable::default(),
                capabilities: Mutex::new(HashMap::new()),
                sequence: AtomicU32::new(0),
                events,
                writer: Mutex::new(None),
                connected: AtomicBool::new(false),
                manual_close: AtomicBool::new(false),
                reconnect_attempt: AtomicU32::new(0),
                connect_lock: tokio::sync::Mutex::new(()),
                tasks: Mutex::new(Vec::new()),
                reconnect_task: Mutex::new(None),
            }),
        }
    }

    /// The client's component identifier
    pub fn cid(&self) -> [u8; 16] {
        self.shared.cid
    }

    /// Subscribe to the client's event stream
    pub fn subscribe(&self) -> broadcast::Receiver<RdmnetEvent> {
        self.shared.events.subscribe()
    }

    /// Whether a transport connection is up
    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    /// Current broker session state
    pub fn broker_state(&self) -> BrokerState {
        self.shared.state().broker
    }

    /// Client id assigned by the broker, if connected to one
    pub fn client_id(&self) -> Option<u32> {
        self.shared.state().client_id
    }

    /// Snapshot of one endpoint's cached capabilities
    pub fn capability(&self, endpoint_id: u16) -> Option<EndpointCapability> {
        self.shared.caps().get(&endpoint_id).cloned()
    }

    /// Snapshot of the whole capability cache, ordered by endpoint id
    pub fn capabilities(&self) -> Vec<EndpointCapability> {
        let mut entries: Vec<EndpointCapability> = self.shared.caps().values().cloned().collect();
        entries.sort_by_key(|entry| entry.endpoint_id);
        entries
    }

    /// Open the transport connection
    ///
    /// Idempotent: concurrent and repeated calls coalesce onto one
    /// attempt. Runs the post-connect auth hook when configured; the
    /// hook failing fails the connect.
    pub async fn connect(&self) -> Result<(), RdmnetError> {
        self.shared.manual_close.store(false, Ordering::SeqCst);
        Shared::establish(&self.shared).await
    }

    /// Close the connection and cancel reconnects and waiters
    pub async fn disconnect(&self) {
        let shared = &self.shared;
        shared.manual_close.store(true, Ordering::SeqCst);
        if let Some(task) = shared.reconnect_task().take() {
            task.abort();
        }
        for task in shared.tasks().drain(..) {
            task.abort();
        }
        Shared::teardown(shared);
        tracing::info!("RDMnet client disconnected");
    }

    /// Wait for the next inbound message matching `matcher`
    pub async fn wait_for_message<F>(
        &self,
        matcher: F,
        timeout: Duration,
    ) -> Result<RdmnetMessage, RdmnetError>
    where
        F: Fn(&RdmnetMessage) -> bool + Send + 'static,
    {
        self.shared.wait(matcher, timeout).await
    }

    /// Run the broker connect (and optionally bind) sequence
    pub async fn start_broker_session(
        &self,
        options: BrokerSessionOptions,
    ) -> Result<(), RdmnetError> {
        let shared = &self.shared;
        if !self.is_connected() {
            return Err(RdmnetError::socket_closed());
        }
        let timeout = options.timeout.unwrap_or(shared.config.request_timeout);

        // Connect step
        let connect_sequence = shared.next_sequence();
        let (waiter_id, receiver) = shared.waiters.register(move |message| {
            matches!(
                message,
                RdmnetMessage::Broker(BrokerMessage::ConnectReply { sequence, .. })
                    if *sequence == connect_sequence
            )
        });
        shared.set_broker_state(BrokerState::Connecting);
        let request = BrokerMessage::ConnectRequest {
            sequence: connect_sequence,
            role: options.role,
            scope: options.scope.clone(),
        };
        if let Err(error) = shared.send_packet(VECTOR_ROOT_BROKER, request.encode()).await {
            shared.waiters.remove(waiter_id);
            shared.set_broker_state(BrokerState::Error);
            return Err(error);
        }

        let reply = shared
            .await_waiter(waiter_id, receiver, timeout)
            .await
            .inspect_err(|_| shared.set_broker_state(BrokerState::Error))?;
        let RdmnetMessage::Broker(BrokerMessage::ConnectReply {
            status,
            client_id,
            text,
            ..
        }) = reply
        else {
            shared.set_broker_state(BrokerState::Error);
            return Err(RdmnetError::new(
                ErrorDomain::Broker,
                ErrorCode::ProtocolError,
                "waiter resolved with a non-ConnectReply message",
            ));
        };
        if status != BrokerStatusCode::Ok {
            shared.set_broker_state(BrokerState::Error);
            return Err(RdmnetError::broker_status(status, &text));
        }

        shared.state().client_id = Some(client_id);
        shared.set_broker_state(BrokerState::Connected);
        tracing::info!("broker session connected, client id {}", client_id);

        if !options.auto_bind {
            return Ok(());
        }

        // Bind step
        let bind_sequence = shared.next_sequence();
        let endpoint_id = options.endpoint_id;
        let (waiter_id, receiver) = shared.waiters.register(move |message| {
            matches!(
                message,
                RdmnetMessage::Broker(BrokerMessage::ClientBindReply { sequence, endpoint_id: reply_endpoint, .. })
                    if *sequence == bind_sequence && *reply_endpoint == endpoint_id
            )
        });
        shared.set_broker_state(BrokerState::Binding);
        let request = BrokerMessage::ClientBindRequest {
            sequence: bind_sequence,
            endpoint_id,
            requested_role: options.endpoint_role,
            profiles: options.profiles.clone(),
        };
        if let Err(error) = shared.send_packet(VECTOR_ROOT_BROKER, request.encode()).await {
            shared.waiters.remove(waiter_id);
            shared.set_broker_state(BrokerState::Error);
            return Err(error);
        }

        let reply = shared
            .await_waiter(waiter_id, receiver, timeout)
            .await
            .inspect_err(|_| shared.set_broker_state(BrokerState::Error))?;
        let RdmnetMessage::Broker(BrokerMessage::ClientBindReply {
            status,
            negotiated_role,
            negotiated_profile,
            text,
            ..
        }) = reply
        else {
            shared.set_broker_state(BrokerState::Error);
            return Err(RdmnetError::new(
                ErrorDomain::Broker,
                ErrorCode::ProtocolError,
                "waiter resolved with a non-ClientBindReply message",
            ));
        };
        if status != BrokerStatusCode::Ok {
            shared.set_broker_state(BrokerState::Error);
            return Err(RdmnetError::broker_status(status, &text));
        }

        if options.strict_negotiation {
            if negotiated_role != options.endpoint_role {
                shared.set_broker_state(BrokerState::Error);
                return Err(RdmnetError::new(
                    ErrorDomain::Broker,
                    ErrorCode::NegotiationRoleMismatch,
                    format!(
                        "requested role {:?}, broker negotiated {:?}",
                        options.endpoint_role, negotiated_role
                    ),
                ));
            }
            if !options.profiles.is_empty() && !options.profiles.contains(&negotiated_profile) {
                shared.set_broker_state(BrokerState::Error);
                return Err(RdmnetError::new(
                    ErrorDomain::Broker,
                    ErrorCode::NegotiationProfileMismatch,
                    format!(
                        "broker negotiated profile {:#06x} outside the requested set",
                        negotiated_profile
                    ),
                ));
            }
        }

        // Profile 0 means the broker left the choice to the requested set.
        let profiles = if negotiated_profile != 0 {
            vec![negotiated_profile]
        } else {
            options.profiles.clone()
        };
        shared.update_capability(
            endpoint_id,
            Some(negotiated_role),
            profiles,
            CapabilitySource::BrokerNegotiation,
        );
        shared.set_broker_state(BrokerState::Bound);
        tracing::info!("endpoint {} bound as {:?}", endpoint_id, negotiated_role);
        Ok(())
    }

    /// Leave the broker session, staying on the transport
    pub async fn stop_broker_session(
        &self,
        reason: DisconnectReason,
        text: &str,
    ) -> Result<(), RdmnetError> {
        let shared = &self.shared;
        let sequence = shared.next_sequence();
        let message = BrokerMessage::Disconnect {
            sequence,
            reason,
            text: text.to_string(),
        };
        shared.send_packet(VECTOR_ROOT_BROKER, message.encode()).await?;
        shared.state().client_id = None;
        shared.caps().clear();
        shared.set_broker_state(BrokerState::TcpConnected);
        Ok(())
    }

    /// Query the broker's client list
    pub async fn request_client_list(&self) -> Result<Vec<u32>, RdmnetError> {
        let shared = &self.shared;
        let sequence = shared.next_sequence();
        let (waiter_id, receiver) = shared.waiters.register(move |message| {
            matches!(
                message,
                RdmnetMessage::Broker(BrokerMessage::ClientListReply { sequence: reply, .. })
                    if *reply == sequence
            )
        });
        shared
            .send_packet(
                VECTOR_ROOT_BROKER,
                BrokerMessage::ClientListRequest { sequence }.encode(),
            )
            .await
            .inspect_err(|_| shared.waiters.remove(waiter_id))?;

        let reply = shared
            .await_waiter(waiter_id, receiver, shared.config.request_timeout)
            .await?;
        match reply {
            RdmnetMessage::Broker(BrokerMessage::ClientListReply {
                status, client_ids, ..
            }) if status == BrokerStatusCode::Ok => Ok(client_ids),
            RdmnetMessage::Broker(BrokerMessage::ClientListReply { status, .. }) => {
                Err(RdmnetError::broker_status(status, "client list refused"))
            }
            _ => Err(RdmnetError::new(
                ErrorDomain::Broker,
                ErrorCode::ProtocolError,
                "waiter resolved with a non-ClientListReply message",
            )),
        }
    }

    /// Query the broker's endpoint list
    pub async fn request_endpoint_list(&self) -> Result<Vec<u16>, RdmnetError> {
        let shared = &self.shared;
        let sequence = shared.next_sequence();
        let (waiter_id, receiver) = shared.waiters.register(move |message| {
            matches!(
                message,
                RdmnetMessage::Broker(BrokerMessage::EndpointListReply { sequence: reply, .. })
                    if *reply == sequence
            )
        });
        shared
            .send_packet(
                VECTOR_ROOT_BROKER,
                BrokerMessage::EndpointListRequest { sequence }.encode(),
            )
            .await
            .inspect_err(|_| shared.waiters.remove(waiter_id))?;

        let reply = shared
            .await_waiter(waiter_id, receiver, shared.config.request_timeout)
            .await?;
        match reply {
            RdmnetMessage::Broker(BrokerMessage::EndpointListReply {
                status, endpoints, ..
            }) if status == BrokerStatusCode::Ok => Ok(endpoints),
            RdmnetMessage::Broker(BrokerMessage::EndpointListReply { status, .. }) => {
                Err(RdmnetError::broker_status(status, "endpoint list refused"))
            }
            _ => Err(RdmnetError::new(
                ErrorDomain::Broker,
                ErrorCode::ProtocolError,
                "waiter resolved with a non-EndpointListReply message",
            )),
        }
    }

    /// Run one RDM transaction over RPT, correlated by sequence
    pub async fn rdm_transaction(
        &self,
        request: &RdmFrame,
        endpoint_id: u16,
        timeout: Option<Duration>,
    ) -> Result<RdmFrame, RdmnetError> {
        let shared = &self.shared;
        let timeout = timeout.unwrap_or(shared.config.request_timeout);
        let sequence = shared.next_sequence();
        let (waiter_id, receiver) = shared.waiters.register(move |message| {
            matches!(
                message,
                RdmnetMessage::Rpt(RptMessage::RdmResponse { sequence: reply, .. })
                    if *reply == sequence
            )
        });

        let command = RptMessage::RdmCommand {
            sequence,
            endpoint_id,
            frame: request.clone(),
        };
        let encoded = command.encode().map_err(|error| {
            shared.waiters.remove(waiter_id);
            RdmnetError::new(ErrorDomain::Rpt, ErrorCode::ProtocolError, error.to_string())
        })?;
        shared
            .send_packet(VECTOR_ROOT_RPT, encoded)
            .await
            .inspect_err(|_| shared.waiters.remove(waiter_id))?;

        let reply = shared.await_waiter(waiter_id, receiver, timeout).await?;
        match reply {
            RdmnetMessage::Rpt(RptMessage::RdmResponse { frame, .. }) => Ok(frame),
            _ => Err(RdmnetError::new(
                ErrorDomain::Rpt,
                ErrorCode::ProtocolError,
                "waiter resolved with a non-RdmResponse message",
            )),
        }
    }

    /// Fire-and-forget RPT RdmCommand; returns the allocated sequence
    pub async fn send_rdm_command(
        &self,
        request: &RdmFrame,
        endpoint_id: u16,
    ) -> Result<u32, RdmnetError> {
        let shared = &self.shared;
        let sequence = shared.next_sequence();
        let command = RptMessage::RdmCommand {
            sequence,
            endpoint_id,
            frame: request.clone(),
        };
        let encoded = command.encode().map_err(|error| {
            RdmnetError::new(ErrorDomain::Rpt, ErrorCode::ProtocolError, error.to_string())
        })?;
        shared.send_packet(VECTOR_ROOT_RPT, encoded).await?;
        Ok(sequence)
    }

    /// Send an EPT data payload; returns the allocated sequence
    pub async fn send_ept_data(
        &self,
        manufacturer: u16,
        protocol: u16,
        payload: Vec<u8>,
    ) -> Result<u32, RdmnetError> {
        let shared = &self.shared;
        let sequence = shared.next_sequence();
        let message = EptMessage::Data {
            sequence,
            manufacturer,
            protocol,
            payload,
        };
        shared.send_packet(VECTOR_ROOT_EPT, message.encode()).await?;
        Ok(sequence)
    }

    /// Advertise an endpoint's role and profiles; returns the sequence
    pub async fn send_endpoint_advertisement(
        &self,
        endpoint_id: u16,
        role: EndpointRole,
        profiles: Vec<u16>,
    ) -> Result<u32, RdmnetError> {
        let shared = &self.shared;
        let sequence = shared.next_sequence();
        let message = RptMessage::EndpointAdvertisement {
            sequence,
            endpoint_id,
            role,
            profiles: profiles.clone(),
        };
        let encoded = message.encode().map_err(|error| {
            RdmnetError::new(ErrorDomain::Rpt, ErrorCode::ProtocolError, error.to_string())
        })?;
        shared.send_packet(VECTOR_ROOT_RPT, encoded).await?;
        shared.update_capability(
            endpoint_id,
            Some(role),
            profiles,
            CapabilitySource::LocalAdvertisement,
        );
        Ok(sequence)
    }

    /// Wait for the acknowledgement of a previously sent advertisement
    pub async fn wait_for_endpoint_advertisement_ack(
        &self,
        sequence: u32,
        endpoint_id: u16,
        timeout: Option<Duration>,
    ) -> Result<AdvertisementAck, RdmnetError> {
        let shared = &self.shared;
        let timeout = timeout.unwrap_or(shared.config.request_timeout);
        let reply = shared
            .wait(
                move |message| {
                    matches!(
                        message,
                        RdmnetMessage::Rpt(RptMessage::EndpointAdvertisementAck {
                            sequence: reply,
                            endpoint_id: reply_endpoint,
                            ..
                        }) if *reply == sequence && *reply_endpoint == endpoint_id
                    )
                },
                timeout,
            )
            .await?;
        match reply {
            RdmnetMessage::Rpt(RptMessage::EndpointAdvertisementAck {
                accepted, status, ..
            }) => Ok(AdvertisementAck { accepted, status }),
            _ => Err(RdmnetError::new(
                ErrorDomain::Rpt,
                ErrorCode::ProtocolError,
                "waiter resolved with a non-EndpointAdvertisementAck message",
            )),
        }
    }

    /// Probe the LLRP UID range and collect replies for `timeout`
    ///
    /// Replies are deduplicated by target UID.
    pub async fn discover_llrp_targets(
        &self,
        lower: Uid,
        upper: Uid,
        timeout: Option<Duration>,
    ) -> Result<Vec<Uid>, RdmnetError> {
        let shared = &self.shared;
        let timeout = timeout.unwrap_or(shared.config.request_timeout);
        let sequence = shared.next_sequence();

        // Subscribe before sending so no reply can slip past.
        let mut events = shared.events.subscribe();
        let probe = LlrpMessage::ProbeRequest {
            sequence,
            lower,
            upper,
        };
        shared.send_packet(VECTOR_ROOT_LLRP, probe.encode()).await?;

        let deadline = tokio::time::Instant::now() + timeout;
        let mut targets = BTreeSet::new();
        loop {
            let event = match tokio::time::timeout_at(deadline, events.recv()).await {
                Ok(Ok(event)) => event,
                Ok(Err(broadcast::error::RecvError::Lagged(_))) => continue,
                Ok(Err(broadcast::error::RecvError::Closed)) | Err(_) => break,
            };
            if let RdmnetEvent::Message(RdmnetMessage::Llrp(LlrpMessage::ProbeReply {
                sequence: reply,
                target,
            })) = event
            {
                if reply == sequence {
                    targets.insert(target);
                }
            }
        }
        Ok(targets.into_iter().collect())
    }
}

impl Drop for RdmnetClient {
    fn drop(&mut self) {
        // Background tasks hold their own Arc; stop them so a dropped
        // client does not keep reading the socket forever.
        self.shared.manual_close.store(true, Ordering::SeqCst);
        if let Some(task) = self.shared.reconnect_task().take() {
            task.abort();
        }
        for task in self.shared.tasks().drain(..) {
            task.abort();
        }
    }
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    fn caps(&self) -> MutexGuard<'_, HashMap<u16, EndpointCapability>> {
        self.capabilities
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    fn tasks(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.tasks.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    fn reconnect_task(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.reconnect_task
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    fn writer_handle(&self) -> Option<mpsc::Sender<Vec<u8>>> {
        self.writer
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .clone()
    }

    fn emit(&self, event: RdmnetEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn emit_error(&self, domain: ErrorDomain, code: ErrorCode, message: String) {
        tracing::warn!("{}/{}: {}", domain, code, message);
        self.emit(RdmnetEvent::Error {
            domain,
            code,
            message,
        });
    }

    /// Unsigned 32-bit sequence, skipping 0
    fn next_sequence(&self) -> u32 {
        loop {
            let value = self.sequence.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
            if value != 0 {
                return value;
            }
        }
    }

    fn set_broker_state(&self, new: BrokerState) {
        let changed = {
            let mut state = self.state();
            if state.broker != new {
                state.broker = new;
                true
            } else {
                false
            }
        };
        if changed {
            tracing::debug!("broker state -> {:?}", new);
            self.emit(RdmnetEvent::BrokerState(new));
        }
    }

    fn update_capability(
        &self,
        endpoint_id: u16,
        role: Option<EndpointRole>,
        profiles: Vec<u16>,
        source: CapabilitySource,
    ) {
        let profiles = normalize_profiles(profiles);
        let entry = EndpointCapability {
            endpoint_id,
            role,
            profiles,
            source,
            updated_at: Instant::now(),
        };
        let changed = {
            let mut caps = self.caps();
            let changed = match caps.get(&endpoint_id) {
                Some(previous) => previous.differs_from(entry.role, &entry.profiles, source),
                None => true,
            };
            caps.insert(endpoint_id, entry.clone());
            changed
        };
        if changed {
            self.emit(RdmnetEvent::EndpointCapabilitiesUpdated(entry));
        }
    }

    async fn send_packet(&self, vector: u32, data: Vec<u8>) -> Result<(), RdmnetError> {
        let packet = build_rdmnet_packet(vector, &data, Some(self.cid)).map_err(|error| {
            RdmnetError::new(
                ErrorDomain::Transport,
                ErrorCode::ProtocolError,
                error.to_string(),
            )
        })?;
        let Some(writer) = self.writer_handle() else {
            return Err(RdmnetError::socket_closed());
        };
        writer
            .send(packet)
            .await
            .map_err(|_| RdmnetError::socket_closed())
    }

    async fn wait<F>(
        self: &Arc<Self>,
        matcher: F,
        timeout: Duration,
    ) -> Result<RdmnetMessage, RdmnetError>
    where
        F: Fn(&RdmnetMessage) -> bool + Send + 'static,
    {
        let (waiter_id, receiver) = self.waiters.register(matcher);
        self.await_waiter(waiter_id, receiver, timeout).await
    }

    async fn await_waiter(
        &self,
        waiter_id: u64,
        receiver: oneshot::Receiver<RdmnetMessage>,
        timeout: Duration,
    ) -> Result<RdmnetMessage, RdmnetError> {
        match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(message)) => Ok(message),
            Ok(Err(_)) => Err(RdmnetError::socket_closed()),
            Err(_) => {
                self.waiters.remove(waiter_id);
                Err(RdmnetError::timeout())
            }
        }
    }

    async fn establish(shared: &Arc<Shared>) -> Result<(), RdmnetError> {
        let _guard = shared.connect_lock.lock().await;
        if shared.connected.load(Ordering::SeqCst) {
            return Ok(());
        }

        let stream = connect_stream(&shared.config).await?;
        if let Some(hook) = &shared.config.post_connect_auth {
            let context = AuthContext {
                host: shared.config.host.clone(),
                port: shared.config.port,
                tls: shared.config.tls.is_some(),
            };
            hook.authenticate(&context).await?;
        }

        let (read_half, write_half) = tokio::io::split(stream);
        let (writer_tx, writer_rx) = mpsc::channel(64);
        *shared
            .writer
            .lock()
            .unwrap_or_else(|poison| poison.into_inner()) = Some(writer_tx);
        shared.connected.store(true, Ordering::SeqCst);
        shared.reconnect_attempt.store(0, Ordering::SeqCst);
        shared.set_broker_state(BrokerState::TcpConnected);

        let mut tasks = shared.tasks();
        tasks.clear();
        tasks.push(tokio::spawn(writer_task(write_half, writer_rx)));
        tasks.push(tokio::spawn(reader_task(Arc::clone(shared), read_half)));
        tasks.push(tokio::spawn(heartbeat_task(Arc::clone(shared))));
        drop(tasks);

        tracing::info!(
            "RDMnet client connected to {}:{}{}",
            shared.config.host,
            shared.config.port,
            if shared.config.tls.is_some() { " (TLS)" } else { "" }
        );
        Ok(())
    }

    /// Tear down the current connection; no-op when already down
    fn teardown(shared: &Arc<Shared>) {
        if !shared.connected.swap(false, Ordering::SeqCst) {
            return;
        }
        *shared
            .writer
            .lock()
            .unwrap_or_else(|poison| poison.into_inner()) = None;
        shared.waiters.reject_all();
        shared.state().client_id = None;
        shared.set_broker_state(BrokerState::Disconnected);
        shared.emit(RdmnetEvent::Disconnected);

        if !shared.manual_close.load(Ordering::SeqCst) && shared.config.auto_reconnect {
            Shared::schedule_reconnect(shared);
        }
    }

    fn schedule_reconnect(shared: &Arc<Shared>) {
        let attempt = shared.reconnect_attempt.fetch_add(1, Ordering::SeqCst) + 1;
        let delay = reconnect_delay(
            shared.config.initial_reconnect_delay,
            shared.config.max_reconnect_delay,
            attempt,
        );
        tracing::info!("reconnect attempt {} in {:?}", attempt, delay);
        shared.emit(RdmnetEvent::Reconnecting { attempt, delay });

        let task_shared = Arc::clone(shared);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if task_shared.manual_close.load(Ordering::SeqCst) {
                return;
            }
            if let Err(error) = Shared::establish(&task_shared).await {
                tracing::warn!("reconnect attempt {} failed: {}", attempt, error);
                Shared::schedule_reconnect(&task_shared);
            }
        });
        *shared.reconnect_task() = Some(handle);
    }

    fn dispatch_packet(self: &Arc<Self>, packet: RootPacket) {
        match RdmnetMessage::decode(packet.vector, &packet.data) {
            Ok(message) => {
                // All waiters matching this packet resolve before any
                // listener sees the next one.
                self.waiters.dispatch(&message);
                self.observe_message(&message);
                self.emit(RdmnetEvent::Message(message));
            }
            Err(error) => {
                let (domain, code) = decode_error_meta(packet.vector);
                self.emit_error(domain, code, error.to_string());
            }
        }
    }

    fn observe_message(self: &Arc<Self>, message: &RdmnetMessage) {
        match message {
            RdmnetMessage::Rpt(RptMessage::EndpointAdvertisement {
                endpoint_id,
                role,
                profiles,
                ..
            }) => {
                self.update_capability(
                    *endpoint_id,
                    Some(*role),
                    profiles.clone(),
                    CapabilitySource::RemoteAdvertisement,
                );
            }
            RdmnetMessage::Broker(BrokerMessage::Disconnect { reason, .. }) => {
                let in_session = matches!(
                    self.state().broker,
                    BrokerState::Connected | BrokerState::Bound
                );
                if in_session {
                    tracing::info!("broker disconnected us: {:?}", reason);
                    self.state().client_id = None;
                    self.caps().clear();
                    self.set_broker_state(BrokerState::TcpConnected);
                }
            }
            _ => {}
        }
    }
}

fn decode_error_meta(root_vector: u32) -> (ErrorDomain, ErrorCode) {
    match root_vector {
        VECTOR_ROOT_BROKER => (ErrorDomain::Broker, ErrorCode::BrokerDecodeError),
        VECTOR_ROOT_RPT => (ErrorDomain::Rpt, ErrorCode::RptDecodeError),
        VECTOR_ROOT_EPT => (ErrorDomain::Ept, ErrorCode::EptDecodeError),
        VECTOR_ROOT_LLRP => (ErrorDomain::Llrp, ErrorCode::LlrpDecodeError),
        _ => (ErrorDomain::Transport, ErrorCode::ProtocolError),
    }
}

/// Exponential backoff: `initial * 2^(attempt-1)`, capped at `max`
fn reconnect_delay(initial: Duration, max: Duration, attempt: u32) -> Duration {
    let factor = 1u32 << (attempt.saturating_sub(1)).min(31);
    initial.saturating_mul(factor).min(max)
}

async fn writer_task(mut write_half: WriteHalf<RdmnetStream>, mut rx: mpsc::Receiver<Vec<u8>>) {
    while let Some(packet) = rx.recv().await {
        if let Err(error) = write_half.write_all(&packet).await {
            tracing::warn!("RDMnet write failed: {}", error);
            break;
        }
    }
    let _ = write_half.shutdown().await;
}

async fn reader_task(shared: Arc<Shared>, mut read_half: ReadHalf<RdmnetStream>) {
    let mut buffer: Vec<u8> = Vec::new();
    let mut chunk = vec![0u8; 8192];
    loop {
        match read_half.read(&mut chunk).await {
            Ok(0) => break,
            Ok(count) => {
                buffer.extend_from_slice(&chunk[..count]);
                if buffer.len() > shared.config.stream_buffer_cap {
                    shared.emit_error(
                        ErrorDomain::Transport,
                        ErrorCode::StreamFramingError,
                        format!(
                            "reassembly buffer exceeded {} bytes",
                            shared.config.stream_buffer_cap
                        ),
                    );
                    break;
                }
                match extract_rdmnet_packets(&buffer) {
                    Ok((packets, remainder)) => {
                        buffer = remainder;
                        for packet in packets {
                            shared.dispatch_packet(packet);
                        }
                    }
                    Err(error) => {
                        shared.emit_error(
                            ErrorDomain::Transport,
                            ErrorCode::StreamFramingError,
                            error.to_string(),
                        );
                        break;
                    }
                }
            }
            Err(error) => {
                shared.emit_error(
                    ErrorDomain::Protocol,
                    ErrorCode::ProtocolError,
                    error.to_string(),
                );
                break;
            }
        }
    }
    Shared::teardown(&shared);
}

async fn heartbeat_task(shared: Arc<Shared>) {
    let mut interval = tokio::time::interval(shared.config.heartbeat_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick fires immediately; the heartbeat starts one
    // period after connect.
    interval.tick().await;
    loop {
        interval.tick().await;
        if !shared.connected.load(Ordering::SeqCst) {
            break;
        }
        let in_session = matches!(
            shared.state().broker,
            BrokerState::Connected | BrokerState::Bound
        );
        let result = if in_session {
            let sequence = shared.next_sequence();
            shared
                .send_packet(
                    VECTOR_ROOT_BROKER,
                    BrokerMessage::Heartbeat { sequence }.encode(),
                )
                .await
        } else {
            shared.send_packet(shared.config.heartbeat_vector, Vec::new()).await
        };
        match result {
            Ok(()) => shared.emit(RdmnetEvent::Heartbeat),
            Err(error) => tracing::warn!("heartbeat failed: {}", error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_counter_skips_zero() {
        let client = RdmnetClient::new(RdmnetClientConfig::default());
        assert_eq!(client.shared.next_sequence(), 1);
        assert_eq!(client.shared.next_sequence(), 2);

        client.shared.sequence.store(u32::MAX - 1, Ordering::Relaxed);
        assert_eq!(client.shared.next_sequence(), u32::MAX);
        // Wraps past zero straight to one.
        assert_eq!(client.shared.next_sequence(), 1);
    }

    #[test]
    fn test_reconnect_delay_backoff() {
        let initial = Duration::from_millis(500);
        let max = Duration::from_secs(10);
        assert_eq!(reconnect_delay(initial, max, 1), Duration::from_millis(500));
        assert_eq!(reconnect_delay(initial, max, 2), Duration::from_secs(1));
        assert_eq!(reconnect_delay(initial, max, 3), Duration::from_secs(2));
        assert_eq!(reconnect_delay(initial, max, 5), Duration::from_secs(8));
        assert_eq!(reconnect_delay(initial, max, 6), Duration::from_secs(10));
        assert_eq!(reconnect_delay(initial, max, 60), Duration::from_secs(10));
    }

    #[test]
    fn test_initial_state() {
        let client = RdmnetClient::new(RdmnetClientConfig::default());
        assert!(!client.is_connected());
        assert_eq!(client.broker_state(), BrokerState::Disconnected);
        assert!(client.client_id().is_none());
        assert!(client.capabilities().is_empty());
    }

    #[test]
    fn test_capability_update_event_fires_only_on_change() {
        let client = RdmnetClient::new(RdmnetClientConfig::default());
        let mut events = client.subscribe();

        client.shared.update_capability(
            1,
            Some(EndpointRole::Controller),
            vec![0x0300, 0x0100, 0x0100],
            CapabilitySource::LocalAdvertisement,
        );
        // Same content again: no second event.
        client.shared.update_capability(
            1,
            Some(EndpointRole::Controller),
            vec![0x0100, 0x0300],
            CapabilitySource::LocalAdvertisement,
        );
        // Provenance change: event.
        client.shared.update_capability(
            1,
            Some(EndpointRole::Controller),
            vec![0x0100, 0x0300],
            CapabilitySource::RemoteAdvertisement,
        );

        let first = events.try_recv().unwrap();
        match first {
            RdmnetEvent::EndpointCapabilitiesUpdated(entry) => {
                assert_eq!(entry.profiles, vec![0x0100, 0x0300]);
                assert_eq!(entry.source, CapabilitySource::LocalAdvertisement);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        let second = events.try_recv().unwrap();
        assert!(matches!(
            second,
            RdmnetEvent::EndpointCapabilitiesUpdated(entry)
                if entry.source == CapabilitySource::RemoteAdvertisement
        ));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_send_without_connection_fails() {
        let client = RdmnetClient::new(RdmnetClientConfig::default());
        let error = client
            .shared
            .send_packet(VECTOR_ROOT_BROKER, Vec::new())
            .await
            .unwrap_err();
        assert_eq!(error.code, ErrorCode::ProtocolError);
    }

    #[tokio::test]
    async fn test_start_session_requires_connection() {
        let client = RdmnetClient::new(RdmnetClientConfig::default());
        let error = client
            .start_broker_session(BrokerSessionOptions::default())
            .await
            .unwrap_err();
        assert_eq!(error.code, ErrorCode::ProtocolError);
    }
}
