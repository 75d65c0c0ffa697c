use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::close::{self, close_code, CloseKind};
use super::dispatcher::{Dispatcher, GatewayEvent};
use super::events::{
    self, invalid_session_resumable, opcode, GatewayMessage, HelloData, IdentifyData, ReadyData,
    RequestMembersData, ResumeData,
};
use super::heartbeat::{HeartbeatMonitor, HeartbeatTick};
use super::intents::{intent_for_event, Intents};
use super::session::Session;
use super::transport::{Transport, TransportEvent, TransportSink};
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::models::presence::{Activity, Presence, Status};
use crate::rate_limit::{RateLimitClass, RateLimiter};
use crate::state::{self, ClientSnapshot, ConnectionState, SharedSnapshot};
use crate::stats::ConnectionStats;

pub(crate) type Reply = oneshot::Sender<Result<(), GatewayError>>;

/// Requests from [`GatewayClient`](super::GatewayClient) handles.
pub(crate) enum Command {
    Connect(Reply),
    Disconnect(Reply),
    Reconnect(Reply),
    Presence(PresenceChange, Reply),
    RequestMembers(RequestMembersData, Reply),
    Send {
        op: u8,
        data: serde_json::Value,
        reply: Reply,
    },
    ResetStats(Reply),
    ResetRateLimits(Reply),
    Shutdown(Reply),
    #[cfg(test)]
    Flush(Reply),
}

pub(crate) enum PresenceChange {
    Status(Status),
    Activity(Option<Activity>),
    Replace(Presence),
}

/// Everything the actor reacts to. Timer and transport inputs carry the
/// generation they were issued for so stale ones can be dropped.
pub(crate) enum Input {
    Command(Command),
    Transport { epoch: u64, event: TransportEvent },
    ConnectTimeout { epoch: u64 },
    HeartbeatTick { epoch: u64 },
    Reidentify { epoch: u64 },
    ReconnectDue { generation: u64 },
}

/// Owns all connection state. Runs as a single task; every transition
/// happens inside [`Actor::handle`].
pub(crate) struct Actor<T: Transport> {
    config: GatewayConfig,
    transport: T,
    session: Session,
    state: ConnectionState,
    heartbeat: HeartbeatMonitor,
    limiter: RateLimiter,
    stats: ConnectionStats,
    presence: Presence,
    dispatcher: Dispatcher,
    snapshot: SharedSnapshot,
    mailbox: mpsc::WeakUnboundedSender<Input>,
    /// Bumped whenever the current transport is abandoned.
    epoch: u64,
    /// Bumped whenever a pending reconnect is scheduled or cancelled.
    reconnect_generation: u64,
    connect_timeout: Option<JoinHandle<()>>,
    reconnect_timer: Option<JoinHandle<()>>,
    reidentify_timer: Option<JoinHandle<()>>,
    address: Option<String>,
}

impl<T: Transport> Actor<T> {
    pub(crate) fn new(
        config: GatewayConfig,
        transport: T,
        dispatcher: Dispatcher,
        mailbox: mpsc::WeakUnboundedSender<Input>,
    ) -> Self {
        let session = Session::new(config.token.clone(), config.intents);
        let limiter = RateLimiter::new(&config.rate_limits);
        let presence = config.presence.clone().unwrap_or_default();
        let stats = ConnectionStats::default();
        let snapshot = state::shared(ClientSnapshot {
            state: ConnectionState::Disconnected,
            session: session.info(),
            stats: stats.clone(),
            rate_limits: limiter.clone(),
        });
        Self {
            config,
            transport,
            session,
            state: ConnectionState::Disconnected,
            heartbeat: HeartbeatMonitor::new(),
            limiter,
            stats,
            presence,
            dispatcher,
            snapshot,
            mailbox,
            epoch: 0,
            reconnect_generation: 0,
            connect_timeout: None,
            reconnect_timer: None,
            reidentify_timer: None,
            address: None,
        }
    }

    pub(crate) fn shared_snapshot(&self) -> SharedSnapshot {
        self.snapshot.clone()
    }

    fn publish(&self) {
        self.snapshot.store(Arc::new(self.snapshot()));
    }

    fn snapshot(&self) -> ClientSnapshot {
        ClientSnapshot {
            state: self.state,
            session: self.session.info(),
            stats: self.stats.clone(),
            rate_limits: self.limiter.clone(),
        }
    }

    pub(crate) async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<Input>) {
        while let Some(input) = inbox.recv().await {
            let keep_running = self.handle(input);
            self.publish();
            if !keep_running {
                break;
            }
        }
        self.teardown();
        self.publish();
        tracing::debug!("gateway client stopped");
    }

    fn handle(&mut self, input: Input) -> bool {
        match input {
            Input::Command(command) => return self.on_command(command),
            Input::Transport { epoch, event } => {
                if epoch != self.epoch {
                    tracing::trace!("dropping event from superseded transport: {event:?}");
                    return true;
                }
                match event {
                    TransportEvent::Open => self.on_open(),
                    TransportEvent::Message(text) => self.on_message(&text),
                    TransportEvent::Close { code, reason } => self.on_close(code, &reason),
                    TransportEvent::Error(err) => self.on_transport_error(err),
                }
            }
            Input::ConnectTimeout { epoch } => {
                if epoch == self.epoch && self.state == ConnectionState::Connecting {
                    self.connect_timeout = None;
                    self.on_connect_timeout();
                }
            }
            Input::HeartbeatTick { epoch } => {
                if epoch == self.epoch && self.state == ConnectionState::Connected {
                    let tick = self.heartbeat.tick();
                    let _ = self.apply_heartbeat(tick);
                }
            }
            Input::Reidentify { epoch } => {
                if epoch == self.epoch && self.state == ConnectionState::Connected {
                    self.reidentify_timer = None;
                    self.identify_or_resume();
                }
            }
            Input::ReconnectDue { generation } => {
                if generation == self.reconnect_generation
                    && self.state == ConnectionState::Reconnecting
                {
                    self.reconnect_timer = None;
                    self.on_reconnect_due();
                }
            }
        }
        true
    }

    /// Commands reply only after the snapshot is republished, so a caller
    /// never reads state older than its own request.
    fn on_command(&mut self, command: Command) -> bool {
        let (reply, result, keep_running) = match command {
            Command::Connect(reply) => (reply, self.connect(), true),
            Command::Disconnect(reply) => {
                self.disconnect();
                (reply, Ok(()), true)
            }
            Command::Reconnect(reply) => {
                self.manual_reconnect();
                (reply, Ok(()), true)
            }
            Command::Presence(change, reply) => (reply, self.update_presence(change), true),
            Command::RequestMembers(data, reply) => (reply, self.request_members(data), true),
            Command::Send { op, data, reply } => (reply, self.send_command(op, data), true),
            Command::ResetStats(reply) => {
                self.stats.reset();
                (reply, Ok(()), true)
            }
            Command::ResetRateLimits(reply) => {
                self.limiter.reset();
                (reply, Ok(()), true)
            }
            Command::Shutdown(reply) => {
                self.teardown();
                (reply, Ok(()), false)
            }
            #[cfg(test)]
            Command::Flush(reply) => (reply, Ok(()), true),
        };
        self.publish();
        let _ = reply.send(result);
        keep_running
    }

    // -- lifecycle ---------------------------------------------------------

    fn connect(&mut self) -> Result<(), GatewayError> {
        match self.state {
            ConnectionState::Disconnected | ConnectionState::Failed => {}
            state => {
                tracing::debug!("connect() ignored while {state}");
                return Ok(());
            }
        }
        self.config.validate()?;
        self.session.reconnect_attempts = 0;
        let address = self.next_address();
        self.open_transport(address);
        Ok(())
    }

    fn disconnect(&mut self) {
        self.cancel_timers();
        self.reconnect_generation += 1;
        let was = self.state;
        if matches!(
            was,
            ConnectionState::Connecting | ConnectionState::Connected
        ) {
            self.epoch += 1;
            self.transport
                .close(close_code::NORMAL, "client disconnect");
        }
        self.stats.record_disconnect();
        self.set_state(ConnectionState::Disconnected);
        if was != ConnectionState::Disconnected && was != ConnectionState::Failed {
            tracing::info!("disconnected by client");
            self.emit(GatewayEvent::Disconnected {
                code: close_code::NORMAL,
                reason: "client disconnect".to_string(),
                message: close::classify(close_code::NORMAL).message.to_string(),
            });
        }
    }

    fn manual_reconnect(&mut self) {
        if matches!(
            self.state,
            ConnectionState::Connecting | ConnectionState::Connected
        ) {
            self.abandon_transport(close_code::RECONNECT_REQUESTED, "client requested reconnect");
        } else {
            self.cancel_timers();
        }
        self.reconnect_generation += 1;
        self.session.reconnect_attempts = 0;
        self.stats.record_reconnect();
        self.set_state(ConnectionState::Reconnecting);
        self.emit(GatewayEvent::Reconnecting {
            attempt: 0,
            delay: Duration::ZERO,
        });
        let address = self.next_address();
        self.open_transport(address);
    }

    fn teardown(&mut self) {
        if self.state != ConnectionState::Disconnected {
            self.disconnect();
        }
        self.cancel_timers();
        self.limiter.reset();
    }

    fn open_transport(&mut self, address: String) {
        self.cancel_timers();
        self.epoch += 1;
        self.set_state(ConnectionState::Connecting);
        tracing::info!("connecting to {address}");
        let sink = self.sink();
        self.transport.open(&address, sink);
        self.address = Some(address);
        let epoch = self.epoch;
        self.connect_timeout = Some(self.schedule(
            self.config.connect_timeout,
            Input::ConnectTimeout { epoch },
        ));
    }

    fn on_open(&mut self) {
        if self.state != ConnectionState::Connecting {
            return;
        }
        cancel(&mut self.connect_timeout);
        self.stats.record_connect();
        self.set_state(ConnectionState::Connected);
        self.emit(GatewayEvent::Connected);
    }

    fn on_connect_timeout(&mut self) {
        let timeout = self.config.connect_timeout;
        tracing::warn!("connection attempt timed out after {timeout:?}");
        self.transport
            .close(close_code::CONNECT_TIMEOUT, "connect timeout");
        self.set_state(ConnectionState::Failed);
        self.report(GatewayError::Timeout(format!(
            "no connection within {}ms",
            timeout.as_millis()
        )));
        self.on_close(close_code::CONNECT_TIMEOUT, "connect timeout");
    }

    fn on_transport_error(&mut self, err: String) {
        self.set_state(ConnectionState::Failed);
        self.report(GatewayError::Connection(err.clone()));
        self.on_close(close_code::ABNORMAL, &err);
    }

    /// The transport is gone: classify why and decide what comes next.
    fn on_close(&mut self, code: u16, reason: &str) {
        self.heartbeat.stop();
        cancel(&mut self.connect_timeout);
        cancel(&mut self.reidentify_timer);
        self.epoch += 1;
        self.stats.record_disconnect();

        let classification = close::classify(code);
        tracing::info!("connection closed ({code}): {}", classification.message);
        self.set_state(ConnectionState::Disconnected);
        self.emit(GatewayEvent::Disconnected {
            code,
            reason: reason.to_string(),
            message: classification.message.to_string(),
        });

        match classification.kind {
            CloseKind::Fatal => {
                tracing::error!("fatal close code {code}, not reconnecting");
                self.fail(GatewayError::Authentication {
                    code,
                    message: classification.message.to_string(),
                });
            }
            CloseKind::RateLimited => {
                let cooldown = self.config.rate_limit_cooldown;
                tracing::warn!("gateway rate limited us, waiting {cooldown:?}");
                self.schedule_reconnect(Some(cooldown));
            }
            _ if classification.clears_session() => {
                tracing::info!("session can no longer be resumed");
                self.session.clear();
                self.schedule_reconnect(None);
            }
            _ => self.schedule_reconnect(None),
        }
    }

    /// Close the current transport ourselves and go straight to a
    /// reconnect, keeping the session.
    fn reconnect_locally(&mut self, code: u16, reason: &str) {
        self.abandon_transport(code, reason);
        self.schedule_reconnect(None);
    }

    fn abandon_transport(&mut self, code: u16, reason: &str) {
        self.cancel_timers();
        self.epoch += 1;
        self.transport.close(code, reason);
        self.stats.record_disconnect();
        self.emit(GatewayEvent::Disconnected {
            code,
            reason: reason.to_string(),
            message: close::classify(code).message.to_string(),
        });
    }

    fn schedule_reconnect(&mut self, fixed_delay: Option<Duration>) {
        cancel(&mut self.reconnect_timer);
        self.reconnect_generation += 1;

        let attempts = self.session.reconnect_attempts;
        if attempts >= self.config.max_reconnects {
            tracing::error!("giving up after {attempts} reconnect attempts");
            self.fail(GatewayError::ReconnectsExhausted { attempts });
            return;
        }

        self.session.reconnect_attempts += 1;
        let attempt = self.session.reconnect_attempts;
        let delay = fixed_delay.unwrap_or_else(|| self.config.backoff.delay(attempt));
        self.stats.record_reconnect();
        self.set_state(ConnectionState::Reconnecting);
        tracing::info!(
            "reconnecting in {delay:?} (attempt {attempt}/{})",
            self.config.max_reconnects
        );
        self.emit(GatewayEvent::Reconnecting { attempt, delay });

        let generation = self.reconnect_generation;
        self.reconnect_timer = Some(self.schedule(delay, Input::ReconnectDue { generation }));
    }

    fn on_reconnect_due(&mut self) {
        let address = self.next_address();
        self.open_transport(address);
    }

    fn fail(&mut self, error: GatewayError) {
        self.cancel_timers();
        self.set_state(ConnectionState::Failed);
        self.report(error);
    }

    /// Resume address while the session is resumable, otherwise the
    /// configured gateway.
    fn next_address(&self) -> String {
        match (&self.session.resume_address, self.session.can_resume()) {
            (Some(address), true) => address.clone(),
            _ => self.config.address.clone(),
        }
    }

    // -- inbound -----------------------------------------------------------

    fn on_message(&mut self, text: &str) {
        let msg = match GatewayMessage::decode(text) {
            Ok(msg) => msg,
            Err(e) => {
                self.report(e);
                return;
            }
        };
        tracing::trace!("<- op {} seq {:?} type {:?}", msg.op, msg.seq, msg.event_type);

        if let Some(seq) = msg.seq {
            if !self.session.observe_sequence(seq) {
                tracing::warn!(
                    "ignoring sequence {seq} below current {:?}",
                    self.session.sequence
                );
            }
        }

        match msg.op {
            opcode::HELLO => self.on_hello(&msg),
            opcode::EVENT => self.on_dispatch(msg),
            opcode::HEARTBEAT => {
                let tick = self.heartbeat.request();
                let _ = self.apply_heartbeat(tick);
            }
            opcode::HEARTBEAT_ACK => {
                if let Some(latency) = self.heartbeat.ack() {
                    self.stats.record_latency(latency);
                }
            }
            opcode::RECONNECT => {
                tracing::info!("gateway asked us to reconnect");
                self.reconnect_locally(close_code::RECONNECT_REQUESTED, "server requested reconnect");
            }
            opcode::INVALID_SESSION => self.on_invalid_session(&msg),
            op => self.report(GatewayError::Protocol(format!("unknown opcode {op}"))),
        }
    }

    fn on_hello(&mut self, msg: &GatewayMessage) {
        let hello: HelloData = match msg.payload() {
            Ok(hello) => hello,
            Err(e) => {
                self.report(e);
                return;
            }
        };
        if hello.heartbeat_interval == 0 {
            self.report(GatewayError::Protocol(
                "HELLO with zero heartbeat interval".to_string(),
            ));
            return;
        }

        let interval = Duration::from_millis(hello.heartbeat_interval);
        tracing::debug!("HELLO, heartbeating every {interval:?}");
        let mailbox = self.mailbox.clone();
        let epoch = self.epoch;
        let first = self.heartbeat.start(interval, move || match mailbox.upgrade() {
            Some(tx) => tx.send(Input::HeartbeatTick { epoch }).is_ok(),
            None => false,
        });
        if self.apply_heartbeat(first).is_ok() {
            self.identify_or_resume();
        }
    }

    fn on_dispatch(&mut self, msg: GatewayMessage) {
        let Some(event_type) = msg.event_type.clone() else {
            self.report(GatewayError::Protocol("dispatch without a type".to_string()));
            return;
        };

        match msg.normalized_type().as_deref() {
            Some(events::READY) => {
                let ready: ReadyData = match msg.payload() {
                    Ok(ready) => ready,
                    Err(e) => {
                        self.report(e);
                        return;
                    }
                };
                // Servers that do not advertise a resume address resume where
                // we are connected now.
                let resume_address = ready
                    .resume_gateway_url
                    .or_else(|| self.address.clone())
                    .unwrap_or_else(|| self.config.address.clone());
                tracing::info!("session {} ready", ready.session_id);
                self.session.establish(ready.session_id, resume_address);
                self.emit(GatewayEvent::Ready {
                    payload: msg.data.unwrap_or(serde_json::Value::Null),
                });
            }
            Some(events::RESUMED) => {
                tracing::info!("session resumed at sequence {:?}", self.session.sequence);
                self.session.reconnect_attempts = 0;
                self.emit(GatewayEvent::Resumed);
            }
            Some(normalized) => {
                if let Some(required) = intent_for_event(normalized) {
                    let subscribed = Intents::named(required)
                        .map(|i| self.session.intents.contains(i))
                        .unwrap_or(true);
                    if !subscribed {
                        tracing::debug!("received {event_type} without the {required} intent");
                    }
                }
                self.emit(GatewayEvent::Dispatch {
                    event_type,
                    message: msg,
                });
            }
            None => {}
        }
    }

    fn on_invalid_session(&mut self, msg: &GatewayMessage) {
        let resumable = invalid_session_resumable(msg);
        self.report(GatewayError::Session(format!(
            "invalidated by the gateway (resumable: {resumable})"
        )));
        if !resumable {
            self.session.clear();
        }

        let lo = self.config.reidentify_jitter.start().as_millis() as u64;
        let hi = self.config.reidentify_jitter.end().as_millis() as u64;
        let jitter = Duration::from_millis(rand::thread_rng().gen_range(lo..=hi.max(lo)));
        // Never wake up inside the identify window only to be refused.
        let delay = jitter.max(self.limiter.retry_after(RateLimitClass::Identify));
        tracing::debug!("identifying again in {delay:?}");
        self.schedule_reidentify(delay);
    }

    fn schedule_reidentify(&mut self, delay: Duration) {
        cancel(&mut self.reidentify_timer);
        let epoch = self.epoch;
        self.reidentify_timer = Some(self.schedule(delay, Input::Reidentify { epoch }));
    }

    // -- outbound ----------------------------------------------------------

    fn apply_heartbeat(&mut self, tick: HeartbeatTick) -> Result<(), GatewayError> {
        match tick {
            HeartbeatTick::Probe => {
                let msg = GatewayMessage::new(opcode::HEARTBEAT, self.session.sequence)?;
                self.transmit(&msg)
            }
            HeartbeatTick::TimedOut => {
                tracing::warn!(
                    "heartbeat not acknowledged within {:?}, reconnecting",
                    self.heartbeat.interval()
                );
                self.emit(GatewayEvent::HeartbeatTimeout);
                self.report(GatewayError::Timeout(
                    "heartbeat acknowledgement".to_string(),
                ));
                self.reconnect_locally(close_code::HEARTBEAT_TIMEOUT, "heartbeat timeout");
                Err(GatewayError::Timeout("heartbeat acknowledgement".to_string()))
            }
            HeartbeatTick::Idle => Ok(()),
        }
    }

    fn identify_or_resume(&mut self) {
        if self.state != ConnectionState::Connected {
            return;
        }
        if let Err(e) = self.limiter.check(RateLimitClass::Identify) {
            // This attempt is dropped; the next one waits for the window.
            let retry_after = self.limiter.retry_after(RateLimitClass::Identify);
            tracing::warn!("handshake deferred by {retry_after:?}: {e}");
            self.report(e);
            self.schedule_reidentify(retry_after);
            return;
        }

        let resumable = self
            .session
            .session_id
            .clone()
            .filter(|_| self.session.can_resume());
        let msg = match resumable {
            Some(session_id) => {
                tracing::info!("resuming session {session_id}");
                self.emit(GatewayEvent::Resuming);
                GatewayMessage::new(
                    opcode::RESUME,
                    ResumeData {
                        token: self.session.token().to_string(),
                        session_id,
                        seq: self.session.sequence,
                    },
                )
            }
            None => {
                // A fresh session numbers its events from scratch.
                self.session.clear();
                tracing::info!("identifying with intents [{}]", self.session.intents);
                self.emit(GatewayEvent::Identifying);
                GatewayMessage::new(
                    opcode::IDENTIFY,
                    IdentifyData {
                        token: self.session.token().to_string(),
                        intents: self.session.intents.names(),
                        properties: self.config.properties.clone(),
                        presence: self.config.presence.clone(),
                    },
                )
            }
        };

        match msg.and_then(|msg| self.transmit(&msg)) {
            Ok(()) => self.limiter.record_send(RateLimitClass::Identify),
            Err(e) => tracing::debug!("handshake not sent: {e}"),
        }
    }

    fn update_presence(&mut self, change: PresenceChange) -> Result<(), GatewayError> {
        self.ensure_connected()?;
        self.limiter.check(RateLimitClass::PresenceUpdate)?;

        let mut presence = self.presence.clone();
        match change {
            PresenceChange::Status(status) => presence.status = status,
            PresenceChange::Activity(activity) => presence.activity = activity,
            PresenceChange::Replace(next) => presence = next,
        }

        let msg = GatewayMessage::new(opcode::PRESENCE_UPDATE, &presence)?;
        self.transmit(&msg)?;
        self.limiter.record_send(RateLimitClass::PresenceUpdate);
        self.presence = presence;
        Ok(())
    }

    fn request_members(&mut self, data: RequestMembersData) -> Result<(), GatewayError> {
        self.ensure_connected()?;
        self.limiter.check(RateLimitClass::RequestMembers)?;
        let msg = GatewayMessage::new(opcode::REQUEST_MEMBERS, data)?;
        self.transmit(&msg)?;
        self.limiter.record_send(RateLimitClass::RequestMembers);
        Ok(())
    }

    fn send_command(&mut self, op: u8, data: serde_json::Value) -> Result<(), GatewayError> {
        if matches!(
            op,
            opcode::EVENT
                | opcode::HEARTBEAT
                | opcode::IDENTIFY
                | opcode::RESUME
                | opcode::HEARTBEAT_ACK
                | opcode::HELLO
                | opcode::RECONNECT
                | opcode::INVALID_SESSION
                | opcode::PRESENCE_UPDATE
                | opcode::REQUEST_MEMBERS
        ) {
            return Err(GatewayError::Protocol(format!(
                "opcode {op} cannot be sent directly"
            )));
        }
        self.ensure_connected()?;
        self.limiter.check(RateLimitClass::Other)?;
        let msg = GatewayMessage::new(op, data)?;
        self.transmit(&msg)?;
        self.limiter.record_send(RateLimitClass::Other);
        Ok(())
    }

    fn ensure_connected(&self) -> Result<(), GatewayError> {
        if self.state != ConnectionState::Connected {
            return Err(GatewayError::InvalidState { state: self.state });
        }
        Ok(())
    }

    /// Write one frame. A failed write means the connection is lost and
    /// goes through the same path as a close.
    fn transmit(&mut self, msg: &GatewayMessage) -> Result<(), GatewayError> {
        let text = msg.encode()?;
        tracing::trace!("-> op {}", msg.op);
        if let Err(e) = self.transport.send(text) {
            self.report(e.clone());
            self.on_close(close_code::ABNORMAL, "send failed");
            return Err(e);
        }
        Ok(())
    }

    // -- plumbing ----------------------------------------------------------

    fn set_state(&mut self, state: ConnectionState) {
        if self.state == state {
            return;
        }
        tracing::debug!("state {} -> {}", self.state, state);
        self.state = state;
        self.emit(GatewayEvent::StateChange { state });
    }

    fn report(&mut self, error: GatewayError) {
        if error.is_fatal() {
            tracing::error!("{error}");
        } else {
            tracing::warn!("{error}");
        }
        self.stats.record_error();
        self.emit(GatewayEvent::Error { error });
    }

    fn emit(&self, event: GatewayEvent) {
        self.dispatcher.emit(event);
    }

    fn sink(&self) -> TransportSink {
        let mailbox = self.mailbox.clone();
        let epoch = self.epoch;
        TransportSink::new(move |event| match mailbox.upgrade() {
            Some(tx) => tx.send(Input::Transport { epoch, event }).is_ok(),
            None => false,
        })
    }

    fn schedule(&self, delay: Duration, input: Input) -> JoinHandle<()> {
        let mailbox = self.mailbox.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(tx) = mailbox.upgrade() {
                let _ = tx.send(input);
            }
        })
    }

    fn cancel_timers(&mut self) {
        self.heartbeat.stop();
        cancel(&mut self.connect_timeout);
        cancel(&mut self.reconnect_timer);
        cancel(&mut self.reidentify_timer);
    }
}

fn cancel(timer: &mut Option<JoinHandle<()>>) {
    if let Some(timer) = timer.take() {
        timer.abort();
    }
}
