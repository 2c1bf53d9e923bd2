use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use sessionprims_frame::channel::{is_chunk_control, is_reserved, CONTROL};
use sessionprims_frame::{ChunkAssembler, ChunkPlan, Envelope};
use sessionprims_transport::{
    CloseStatus, Inbound, Payload, Transport, TransportError, TransportKind, TransportSink,
    TransportStream,
};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{ClientIdentity, EndpointConfig, Role};
use crate::control::ControlMessage;
use crate::dispatch::{ChannelHandler, DispatchResult, HandlerTable};
use crate::error::{EndpointError, Result};
use crate::events::EndpointObserver;
use crate::metrics::{Counters, EndpointStats};
use crate::registration::{
    self, new_connection_id, ConnRegisterDTO, ConnRegisterReplyDTO, RegistrationAttempt,
};
use crate::state::{ConnectionState, StateCell};

/// Upper bound on flushing a close notification or closing the transport.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

const MIN_HOUSEKEEPING_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Default)]
struct Identity {
    connection_id: String,
    user_id: Option<Uuid>,
    device_id: String,
}

/// One unit of work for the writer task. Chunks of a message travel as a
/// single unit so they never interleave with other sends.
struct Outbound {
    frames: Vec<Payload>,
    chunked: bool,
    ack: Option<oneshot::Sender<Result<usize>>>,
}

struct Shared {
    config: EndpointConfig,
    kind: TransportKind,
    peer_addr: Option<String>,
    started: Instant,
    state: StateCell,
    identity: RwLock<Identity>,
    handlers: HandlerTable,
    observers: Vec<Arc<dyn EndpointObserver>>,
    counters: Counters,
    outbound: mpsc::Sender<Outbound>,
    requests: Mutex<HashMap<String, oneshot::Sender<Envelope>>>,
    attempt: Mutex<RegistrationAttempt>,
    registered: watch::Sender<bool>,
    last_inbound: Mutex<Instant>,
    closing: AtomicBool,
    close_status: Mutex<CloseStatus>,
    shutdown: CancellationToken,
    terminated: CancellationToken,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Builds an [`Endpoint`] around a connected transport.
///
/// Observers and handlers given here are in place before the first inbound
/// message is read.
pub struct EndpointBuilder {
    config: EndpointConfig,
    observers: Vec<Arc<dyn EndpointObserver>>,
    handlers: Vec<(String, Arc<dyn ChannelHandler>)>,
}

impl EndpointBuilder {
    pub fn observer(mut self, observer: Arc<dyn EndpointObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn handler<H: ChannelHandler>(mut self, channel: impl Into<String>, handler: H) -> Self {
        self.handlers.push((channel.into(), Arc::new(handler)));
        self
    }

    /// Add an already shared handler.
    pub fn shared_handler(
        mut self,
        channel: impl Into<String>,
        handler: Arc<dyn ChannelHandler>,
    ) -> Self {
        self.handlers.push((channel.into(), handler));
        self
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    /// Take ownership of `transport` and start the endpoint's tasks.
    ///
    /// A client endpoint sends its registration immediately; use
    /// [`Endpoint::wait_registered`] to wait for the reply. Must be called
    /// from within a Tokio runtime.
    pub fn start<T: Transport>(self, transport: T) -> Result<Endpoint> {
        if self.config.chunk_size == 0 {
            return Err(sessionprims_frame::ChunkError::InvalidChunkSize.into());
        }

        let kind = transport.kind();
        let peer_addr = transport.peer_addr();
        let (outbound, queue) = mpsc::channel(self.config.send_queue_depth.max(1));
        let (registered, _) = watch::channel(false);
        let identity = match &self.config.role {
            Role::Server => Identity {
                connection_id: new_connection_id(),
                ..Identity::default()
            },
            Role::Client(client) => Identity {
                connection_id: String::new(),
                user_id: Some(client.user_id),
                device_id: client.device_id.clone(),
            },
        };
        let now = Instant::now();

        let endpoint = Endpoint {
            shared: Arc::new(Shared {
                config: self.config,
                kind,
                peer_addr,
                started: now,
                state: StateCell::new(),
                identity: RwLock::new(identity),
                handlers: HandlerTable::default(),
                observers: self.observers,
                counters: Counters::default(),
                outbound,
                requests: Mutex::new(HashMap::new()),
                attempt: Mutex::new(RegistrationAttempt::default()),
                registered,
                last_inbound: Mutex::new(now),
                closing: AtomicBool::new(false),
                close_status: Mutex::new(CloseStatus::Normal),
                shutdown: CancellationToken::new(),
                terminated: CancellationToken::new(),
            }),
        };
        for (channel, handler) in self.handlers {
            endpoint.shared.handlers.register(&channel, handler)?;
        }

        let (sink, stream) = transport.split();
        info!(
            connection_id = %endpoint.connection_id(),
            transport = %kind,
            peer = ?endpoint.shared.peer_addr,
            "endpoint started"
        );
        endpoint.set_state(ConnectionState::NewlyOpened);

        let reader = tokio::spawn(receive_loop(endpoint.clone(), stream));
        let writer = tokio::spawn(send_loop(endpoint.clone(), sink, queue));
        tokio::spawn(supervise(endpoint.clone(), reader, writer));

        if let Role::Client(identity) = &endpoint.shared.config.role {
            if let Err(err) = endpoint.begin_registration(identity) {
                endpoint.disconnect();
                return Err(err);
            }
        }
        Ok(endpoint)
    }
}

/// One logical connection: state machine, registration, dispatch.
///
/// `Endpoint` is a cheap handle; clones refer to the same connection.
#[derive(Clone)]
pub struct Endpoint {
    shared: Arc<Shared>,
}

impl Endpoint {
    pub fn builder(config: EndpointConfig) -> EndpointBuilder {
        EndpointBuilder {
            config,
            observers: Vec::new(),
            handlers: Vec::new(),
        }
    }

    /// Current connection id. Server-assigned once registration completes.
    pub fn connection_id(&self) -> String {
        self.identity().connection_id.clone()
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.identity().user_id
    }

    pub fn device_id(&self) -> String {
        self.identity().device_id.clone()
    }

    pub fn role(&self) -> &Role {
        &self.shared.config.role
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.shared.config
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.shared.kind
    }

    pub fn peer_addr(&self) -> Option<&str> {
        self.shared.peer_addr.as_deref()
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state.get()
    }

    pub fn stats(&self) -> EndpointStats {
        self.shared.counters.snapshot()
    }

    pub fn is_registered(&self) -> bool {
        *self.shared.registered.borrow()
    }

    /// True once closure has begun; no further sends are accepted.
    pub fn is_closing(&self) -> bool {
        self.shared.closing.load(Ordering::Acquire)
    }

    /// True if both handles refer to the same connection.
    pub fn ptr_eq(&self, other: &Endpoint) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Route messages on `channel` to `handler`, replacing any earlier one.
    pub fn register_handler<H: ChannelHandler>(&self, channel: &str, handler: H) -> Result<()> {
        self.shared.handlers.register(channel, Arc::new(handler))
    }

    pub fn remove_handler(&self, channel: &str) -> bool {
        self.shared.handlers.remove(channel)
    }

    /// Channels with a registered handler, sorted.
    pub fn channels(&self) -> Vec<String> {
        self.shared.handlers.channels()
    }

    /// Send an envelope and wait until every wire message is written.
    ///
    /// Returns the number of wire messages: 1, or the chunk count plus 2
    /// for a chunked message.
    pub async fn send(&self, envelope: Envelope) -> Result<usize> {
        check_reserved(&envelope)?;
        self.send_unchecked(envelope).await
    }

    /// Send `data` as `message_type` on `channel`.
    pub async fn send_message(
        &self,
        channel: &str,
        message_type: &str,
        data: impl Into<String>,
    ) -> Result<usize> {
        self.send(Envelope::new(message_type, data).on_channel(channel))
            .await
    }

    /// Queue an envelope without waiting for the write.
    ///
    /// Usable from synchronous contexts such as channel handlers. Fails with
    /// [`EndpointError::QueueFull`] rather than waiting for space.
    pub fn post(&self, envelope: Envelope) -> Result<usize> {
        check_reserved(&envelope)?;
        self.post_unchecked(envelope)
    }

    /// Queue an answer to `request` on the same channel.
    pub fn reply(
        &self,
        request: &Envelope,
        message_type: &str,
        data: impl Into<String>,
    ) -> Result<usize> {
        self.post(
            Envelope::new(message_type, data)
                .on_channel(request.channel.as_str())
                .with_scope(request.scope.as_str())
                .in_reply_to(request.msg_id.as_str()),
        )
    }

    /// Send `envelope` and wait for the message whose `ReplyTo` is its id.
    ///
    /// The reply is delivered here instead of to the channel handler.
    pub async fn request(&self, envelope: Envelope, timeout: Duration) -> Result<Envelope> {
        check_reserved(&envelope)?;
        let msg_id = envelope.msg_id.clone();
        let (tx, rx) = oneshot::channel();
        lock(&self.shared.requests).insert(msg_id.clone(), tx);

        let exchange = async {
            self.send_unchecked(envelope).await?;
            rx.await.map_err(|_| EndpointError::Closed)
        };
        let result = match tokio::time::timeout(timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(EndpointError::Timeout(timeout)),
        };
        if result.is_err() {
            lock(&self.shared.requests).remove(&msg_id);
        }
        result
    }

    /// Wait until registration completes, returning the connection id.
    pub async fn wait_registered(&self, timeout: Duration) -> Result<String> {
        let mut registered = self.shared.registered.subscribe();
        let shutdown = self.shared.shutdown.clone();
        let wait = async move {
            tokio::select! {
                biased;
                result = registered.wait_for(|done| *done) => result.is_ok(),
                _ = shutdown.cancelled() => false,
            }
        };
        match tokio::time::timeout(timeout, wait).await {
            Ok(true) => Ok(self.connection_id()),
            Ok(false) => Err(EndpointError::Closed),
            Err(_) => Err(EndpointError::Timeout(timeout)),
        }
    }

    /// Close gracefully: tell the peer, release the transport, and wait
    /// until closure has completed.
    pub async fn close(&self) {
        self.close_with_reason("").await;
    }

    pub async fn close_with_reason(&self, reason: &str) {
        if !self.is_closing() {
            let notify = self.send_control(ControlMessage::close(reason));
            if let Ok(Err(err)) = tokio::time::timeout(CLOSE_TIMEOUT, notify).await {
                debug!(connection_id = %self.connection_id(), %err, "close request not delivered");
            }
        }
        self.begin_close(ConnectionState::ShuttingDown, CloseStatus::Normal);
        self.closed().await;
    }

    /// Begin closing without notifying the peer or waiting.
    pub fn disconnect(&self) {
        self.begin_close(ConnectionState::ShuttingDown, CloseStatus::Normal);
    }

    /// Resolves once closure has completed and observers were notified.
    pub async fn closed(&self) {
        self.shared.terminated.cancelled().await;
    }

    fn identity(&self) -> std::sync::RwLockReadGuard<'_, Identity> {
        self.shared
            .identity
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn adopt_identity(&self, connection_id: &str, user_id: Option<Uuid>, device_id: Option<&str>) {
        let mut identity = self
            .shared
            .identity
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        identity.connection_id = connection_id.to_string();
        if user_id.is_some() {
            identity.user_id = user_id;
        }
        if let Some(device_id) = device_id {
            identity.device_id = device_id.to_string();
        }
    }

    fn close_status(&self) -> CloseStatus {
        *lock(&self.shared.close_status)
    }

    async fn send_unchecked(&self, envelope: Envelope) -> Result<usize> {
        let (ack, done) = oneshot::channel();
        let command = self.prepare(envelope, Some(ack))?;
        self.shared
            .outbound
            .send(command)
            .await
            .map_err(|_| EndpointError::Closed)?;
        done.await.map_err(|_| EndpointError::Closed)?
    }

    fn post_unchecked(&self, envelope: Envelope) -> Result<usize> {
        let command = self.prepare(envelope, None)?;
        let frames = command.frames.len();
        self.shared
            .outbound
            .try_send(command)
            .map_err(|err| match err {
                TrySendError::Full(_) => EndpointError::QueueFull,
                TrySendError::Closed(_) => EndpointError::Closed,
            })?;
        Ok(frames)
    }

    async fn send_control(&self, message: ControlMessage) -> Result<usize> {
        self.send_unchecked(message.to_envelope()?).await
    }

    fn post_control(&self, message: ControlMessage) -> Result<usize> {
        self.post_unchecked(message.to_envelope()?)
    }

    /// Serialize, chunking first if the payload is over the chunk size.
    fn prepare(
        &self,
        envelope: Envelope,
        ack: Option<oneshot::Sender<Result<usize>>>,
    ) -> Result<Outbound> {
        if self.is_closing() {
            return Err(EndpointError::Closed);
        }
        let config = &self.shared.config;
        let chunked =
            envelope.data_len() > config.chunk_size && !is_chunk_control(&envelope.message_type);
        let parts = if chunked {
            let plan = ChunkPlan::split(&envelope, config.chunk_size)?;
            debug!(
                connection_id = %self.connection_id(),
                msg_id = %envelope.msg_id,
                chunks = plan.chunks.len(),
                "chunking outbound message"
            );
            plan.into_envelopes()?
        } else {
            vec![envelope]
        };

        let frames = parts
            .iter()
            .map(|part| self.encode(part))
            .collect::<Result<Vec<_>>>()?;
        Ok(Outbound {
            frames,
            chunked,
            ack,
        })
    }

    fn encode(&self, envelope: &Envelope) -> Result<Payload> {
        let serializer = &self.shared.config.serializer;
        let bytes = serializer.encode(envelope)?;
        let max = self.shared.config.max_message_size;
        if bytes.len() > max {
            return Err(EndpointError::MessageTooLarge {
                size: bytes.len(),
                max,
            });
        }
        Ok(Payload::from_kind(serializer.kind(), bytes)?)
    }

    fn set_state(&self, next: ConnectionState) -> bool {
        let Some(previous) = self.shared.state.transition(next) else {
            return false;
        };
        info!(
            connection_id = %self.connection_id(),
            from = %previous,
            to = %next,
            "state changed"
        );
        for observer in &self.shared.observers {
            observer.on_status_change(self, next);
        }
        true
    }

    /// First step of the closure sequence. Only the first caller does any
    /// work; the rest runs on the supervisor once both tasks have stopped.
    fn begin_close(&self, target: ConnectionState, status: CloseStatus) -> bool {
        if self.shared.closing.swap(true, Ordering::AcqRel) {
            return false;
        }
        *lock(&self.shared.close_status) = status;
        self.set_state(target);
        self.shared.shutdown.cancel();
        true
    }

    fn finalize(&self) {
        self.set_state(ConnectionState::Closed);
        info!(
            connection_id = %self.connection_id(),
            state = %self.state(),
            "connection closed"
        );
        for observer in &self.shared.observers {
            observer.on_connection_closed(self);
        }
        self.shared.handlers.clear();
        lock(&self.shared.requests).clear();
        self.shared.terminated.cancel();
    }

    fn transport_failed(&self, err: &TransportError) {
        let (state, status) = if err.is_protocol_violation() {
            (ConnectionState::Error, CloseStatus::ProtocolError)
        } else {
            (ConnectionState::Lost, CloseStatus::Normal)
        };
        if self.begin_close(state, status) {
            warn!(connection_id = %self.connection_id(), %err, %state, "transport failed");
        }
    }

    fn peer_closed(&self, reason: Option<String>) {
        match self.shared.kind {
            TransportKind::WebSocket => {
                if self.begin_close(ConnectionState::ShuttingDown, CloseStatus::Normal) {
                    info!(connection_id = %self.connection_id(), ?reason, "peer closed websocket");
                }
            }
            TransportKind::Stream => {
                if self.begin_close(ConnectionState::Lost, CloseStatus::Normal) {
                    warn!(connection_id = %self.connection_id(), "peer closed stream without close request");
                }
            }
        }
    }

    fn touch(&self) {
        *lock(&self.shared.last_inbound) = Instant::now();
    }

    fn begin_registration(&self, identity: &ClientIdentity) -> Result<()> {
        let request = lock(&self.shared.attempt).begin(identity);
        debug!(connection_id = %request.connection_id, "registering");
        self.adopt_identity(&request.connection_id, None, None);
        self.post_control(ControlMessage::Register(request))?;
        Ok(())
    }

    async fn write<S: TransportSink>(&self, sink: &mut S, command: Outbound) -> bool {
        let Outbound {
            frames,
            chunked,
            ack,
        } = command;
        let total = frames.len();

        for frame in frames {
            let len = frame.len();
            let result = tokio::select! {
                result = sink.send(frame) => result,
                _ = self.shared.shutdown.cancelled() => {
                    if let Some(ack) = ack {
                        let _ = ack.send(Err(EndpointError::Closed));
                    }
                    return false;
                }
            };
            if let Err(err) = result {
                self.transport_failed(&err);
                if let Some(ack) = ack {
                    let _ = ack.send(Err(err.into()));
                }
                return false;
            }
            self.shared.counters.record_sent(len);
            self.set_state(ConnectionState::Open);
        }

        if chunked {
            self.shared.counters.record_chunked_sent();
        }
        if let Some(ack) = ack {
            let _ = ack.send(Ok(total));
        }
        true
    }

    fn housekeeping(&self, assembler: &mut ChunkAssembler) {
        let now = Instant::now();
        let evicted = assembler.evict_expired(now.into_std());
        if !evicted.is_empty() {
            self.shared.counters.record_evictions(evicted.len());
            for _ in &evicted {
                self.shared.counters.record_dispatch_failure();
            }
        }

        let config = &self.shared.config;
        if let (true, Some(timeout)) = (config.require_chatty_peer, config.keepalive_timeout) {
            let silent_for = now.saturating_duration_since(*lock(&self.shared.last_inbound));
            if silent_for > timeout {
                warn!(
                    connection_id = %self.connection_id(),
                    ?silent_for,
                    "peer silent past keepalive timeout"
                );
                self.begin_close(ConnectionState::Lost, CloseStatus::Normal);
                return;
            }
        }

        if config.role == Role::Server
            && !self.is_registered()
            && now.saturating_duration_since(self.shared.started) > config.registration_timeout
        {
            warn!(connection_id = %self.connection_id(), "peer did not register in time");
            self.begin_close(ConnectionState::Error, CloseStatus::ProtocolError);
        }
    }

    fn on_payload(&self, payload: Payload, assembler: &mut ChunkAssembler) {
        self.shared.counters.record_received(payload.len());
        self.touch();

        let serializer = &self.shared.config.serializer;
        if let Some(actual) = payload.kind() {
            let expected = serializer.kind();
            if actual != expected {
                if self.begin_close(ConnectionState::Error, CloseStatus::ProtocolError) {
                    warn!(
                        connection_id = %self.connection_id(),
                        ?expected,
                        ?actual,
                        "unexpected payload kind"
                    );
                }
                return;
            }
        }

        let envelope = match serializer.decode(payload.as_bytes()) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(connection_id = %self.connection_id(), %err, "dropping undecodable message");
                self.shared.counters.record_dispatch_failure();
                return;
            }
        };

        let result = if is_chunk_control(&envelope.message_type) {
            match assembler.handle(&envelope, Instant::now().into_std()) {
                Ok(None) => return,
                Ok(Some(complete)) => {
                    self.shared.counters.record_chunked_received();
                    self.process(complete)
                }
                Err(err) => {
                    warn!(
                        connection_id = %self.connection_id(),
                        msg_id = %envelope.msg_id,
                        %err,
                        "dropping chunked message"
                    );
                    DispatchResult::Recoverable
                }
            }
        } else {
            self.process(envelope)
        };

        match result {
            DispatchResult::Handled => {}
            DispatchResult::Recoverable => self.shared.counters.record_dispatch_failure(),
            DispatchResult::Fatal => {
                if self.begin_close(ConnectionState::Error, CloseStatus::InternalError) {
                    warn!(connection_id = %self.connection_id(), "handler failed fatally");
                }
            }
        }
    }

    fn process(&self, envelope: Envelope) -> DispatchResult {
        if envelope.channel == CONTROL {
            return self.on_control(&envelope);
        }

        if !envelope.reply_to.is_empty() {
            let waiter = lock(&self.shared.requests).remove(&envelope.reply_to);
            if let Some(waiter) = waiter {
                let _ = waiter.send(envelope);
                return DispatchResult::Handled;
            }
        }

        let Some(handler) = self.shared.handlers.get(&envelope.channel) else {
            debug!(
                connection_id = %self.connection_id(),
                channel = %envelope.channel,
                msg_id = %envelope.msg_id,
                "no handler for channel"
            );
            return DispatchResult::Recoverable;
        };
        handler.handle(self, &envelope)
    }

    fn on_control(&self, envelope: &Envelope) -> DispatchResult {
        let message = match ControlMessage::parse(envelope) {
            Ok(Some(message)) => message,
            Ok(None) => {
                debug!(message_type = %envelope.message_type, "unknown control message");
                return DispatchResult::Recoverable;
            }
            Err(err) => {
                warn!(message_type = %envelope.message_type, %err, "malformed control message");
                return DispatchResult::Recoverable;
            }
        };

        match message {
            ControlMessage::Register(request) => self.on_register(request),
            ControlMessage::RegisterReply(reply) => self.on_register_reply(&reply),
            ControlMessage::Close(close) => {
                if self.begin_close(ConnectionState::ShuttingDown, CloseStatus::Normal) {
                    info!(
                        connection_id = %self.connection_id(),
                        reason = %close.reason,
                        "peer requested close"
                    );
                }
                DispatchResult::Handled
            }
        }
    }

    fn on_register(&self, request: ConnRegisterDTO) -> DispatchResult {
        if self.shared.config.role != Role::Server {
            debug!("ignoring registration request on client endpoint");
            return DispatchResult::Recoverable;
        }
        let reply = match registration::answer(&request) {
            Ok(reply) => reply,
            Err(err) => {
                warn!(connection_id = %self.connection_id(), ?request, %err, "rejecting registration");
                return DispatchResult::Recoverable;
            }
        };
        if let Err(err) = self.post_control(ControlMessage::RegisterReply(reply.clone())) {
            warn!(connection_id = %self.connection_id(), %err, "registration reply not queued");
            return DispatchResult::Recoverable;
        }

        self.adopt_identity(
            &reply.connection_id,
            Some(request.user_id),
            Some(&request.device_id),
        );
        self.registered(&reply.old_connection_id, &reply.connection_id);
        DispatchResult::Handled
    }

    fn on_register_reply(&self, reply: &ConnRegisterReplyDTO) -> DispatchResult {
        let accepted = lock(&self.shared.attempt).accept(reply);
        let Some((old, new)) = accepted else {
            debug!(
                old_connection_id = %reply.old_connection_id,
                "dropping registration reply for another attempt"
            );
            return DispatchResult::Handled;
        };
        self.adopt_identity(&new, None, None);
        self.registered(&old, &new);
        DispatchResult::Handled
    }

    fn registered(&self, old: &str, new: &str) {
        self.shared.registered.send_replace(true);
        info!(
            old_connection_id = %old,
            connection_id = %new,
            user_id = ?self.user_id(),
            device_id = %self.device_id(),
            "connection registered"
        );
        for observer in &self.shared.observers {
            observer.on_connection_registered(self, old, new);
        }
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("connection_id", &self.connection_id())
            .field("state", &self.state())
            .field("transport", &self.shared.kind)
            .field("peer_addr", &self.shared.peer_addr)
            .finish()
    }
}

/// Application envelopes may not use session-layer names, either as the
/// channel or as the message type.
fn check_reserved(envelope: &Envelope) -> Result<()> {
    if is_reserved(&envelope.channel) {
        return Err(EndpointError::ReservedChannel(envelope.channel.clone()));
    }
    if is_reserved(&envelope.message_type) {
        return Err(EndpointError::ReservedMessageType(
            envelope.message_type.clone(),
        ));
    }
    Ok(())
}

async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn receive_loop<S: TransportStream>(endpoint: Endpoint, mut stream: S) {
    let shared = &endpoint.shared;
    let mut assembler = ChunkAssembler::new(shared.config.assembler());
    let mut housekeeping = interval(
        shared
            .config
            .housekeeping_interval
            .max(MIN_HOUSEKEEPING_INTERVAL),
    );
    housekeeping.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shared.shutdown.cancelled() => break,
            _ = housekeeping.tick() => endpoint.housekeeping(&mut assembler),
            inbound = stream.recv() => match inbound {
                Ok(Inbound::Message(payload)) => endpoint.on_payload(payload, &mut assembler),
                Ok(Inbound::Ping) => {
                    shared.counters.record_ping();
                    endpoint.touch();
                }
                Ok(Inbound::Closed(reason)) => {
                    endpoint.peer_closed(reason);
                    break;
                }
                Err(err) => {
                    endpoint.transport_failed(&err);
                    break;
                }
            },
        }
    }
    assembler.clear();
}

async fn send_loop<S: TransportSink>(
    endpoint: Endpoint,
    mut sink: S,
    mut queue: mpsc::Receiver<Outbound>,
) {
    let shared = &endpoint.shared;
    let mut pings = shared.config.ping_interval.map(|period| {
        let mut timer = interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        timer
    });

    loop {
        tokio::select! {
            biased;
            _ = shared.shutdown.cancelled() => break,
            command = queue.recv() => {
                let Some(command) = command else { break };
                if !endpoint.write(&mut sink, command).await {
                    break;
                }
            }
            _ = next_tick(&mut pings) => {
                if let Err(err) = sink.ping().await {
                    endpoint.transport_failed(&err);
                    break;
                }
            }
        }
    }

    queue.close();
    while let Ok(command) = queue.try_recv() {
        if let Some(ack) = command.ack {
            let _ = ack.send(Err(EndpointError::Closed));
        }
    }

    match tokio::time::timeout(CLOSE_TIMEOUT, sink.close(endpoint.close_status())).await {
        Ok(Ok(())) => debug!(connection_id = %endpoint.connection_id(), "transport closed"),
        Ok(Err(err)) => debug!(connection_id = %endpoint.connection_id(), %err, "transport close failed"),
        Err(_) => debug!(connection_id = %endpoint.connection_id(), "transport close timed out"),
    }
}

async fn supervise(endpoint: Endpoint, reader: JoinHandle<()>, writer: JoinHandle<()>) {
    if let Err(err) = reader.await {
        warn!(connection_id = %endpoint.connection_id(), %err, "receive task failed");
        endpoint.begin_close(ConnectionState::Error, CloseStatus::InternalError);
    }
    if let Err(err) = writer.await {
        warn!(connection_id = %endpoint.connection_id(), %err, "send task failed");
        endpoint.begin_close(ConnectionState::Error, CloseStatus::InternalError);
    }
    endpoint.finalize();
}
