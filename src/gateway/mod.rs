pub mod close;
pub mod dispatcher;
pub mod events;
pub mod heartbeat;
pub mod intents;
pub mod session;
pub mod transport;

mod actor;

use tokio::sync::{broadcast, mpsc, oneshot};

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::models::presence::{Activity, ActivityKind, Presence, Status};
use crate::rate_limit::RateLimitStatus;
use crate::state::{ConnectionState, SharedSnapshot};
use crate::stats::{check_health, HealthReport, StatsSnapshot};
use actor::{Actor, Command, Input, PresenceChange, Reply};
use dispatcher::Dispatcher;
pub use dispatcher::GatewayEvent;
use events::RequestMembersData;
use session::SessionInfo;
use transport::{Transport, WsTransport};

/// Handle to a gateway connection.
///
/// Cheap to clone. The connection itself lives on a background task that
/// stops once every handle is dropped or [`shutdown`](Self::shutdown) is
/// called. Must be created inside a tokio runtime.
#[derive(Clone)]
pub struct GatewayClient {
    mailbox: mpsc::UnboundedSender<Input>,
    snapshot: SharedSnapshot,
    dispatcher: Dispatcher,
    config: GatewayConfig,
}

impl GatewayClient {
    /// Client over a WebSocket transport.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        Self::with_transport(config, WsTransport::new())
    }

    pub fn with_transport<T: Transport>(
        config: GatewayConfig,
        transport: T,
    ) -> Result<Self, GatewayError> {
        config.validate()?;

        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new();
        let actor = Actor::new(config.clone(), transport, dispatcher.clone(), tx.downgrade());
        let snapshot = actor.shared_snapshot();
        tokio::spawn(actor.run(rx));

        Ok(Self {
            mailbox: tx,
            snapshot,
            dispatcher,
            config,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.dispatcher.subscribe()
    }

    /// Open the connection. Configuration problems are reported here,
    /// before anything touches the network; everything after that arrives
    /// as events. Does nothing if a connection is already under way.
    pub async fn connect(&self) -> Result<(), GatewayError> {
        self.config.validate()?;
        self.request(Command::Connect).await
    }

    /// Close the connection and cancel any pending reconnect. The session
    /// is kept, so a later [`connect`](Self::connect) may resume it.
    pub async fn disconnect(&self) -> Result<(), GatewayError> {
        self.request(Command::Disconnect).await
    }

    /// Drop the current connection and open a new one immediately,
    /// resuming if possible. Resets the reconnect attempt counter.
    pub async fn reconnect(&self) -> Result<(), GatewayError> {
        self.config.validate()?;
        self.request(Command::Reconnect).await
    }

    pub async fn set_status(&self, status: Status) -> Result<(), GatewayError> {
        self.request(|reply| Command::Presence(PresenceChange::Status(status), reply))
            .await
    }

    pub async fn set_activity(
        &self,
        name: &str,
        kind: ActivityKind,
        url: Option<&str>,
    ) -> Result<(), GatewayError> {
        let mut activity = Activity::new(name, kind);
        if let Some(url) = url {
            activity = activity.with_url(url);
        }
        self.request(|reply| Command::Presence(PresenceChange::Activity(Some(activity)), reply))
            .await
    }

    pub async fn clear_activity(&self) -> Result<(), GatewayError> {
        self.request(|reply| Command::Presence(PresenceChange::Activity(None), reply))
            .await
    }

    /// Replace the whole presence in one update.
    pub async fn update_presence(&self, presence: Presence) -> Result<(), GatewayError> {
        self.request(|reply| Command::Presence(PresenceChange::Replace(presence), reply))
            .await
    }

    /// Ask for the member list of a space. Members arrive as dispatches.
    pub async fn request_members(
        &self,
        space_id: &str,
        query: &str,
        limit: u32,
    ) -> Result<(), GatewayError> {
        let data = RequestMembersData {
            space_id: space_id.to_string(),
            query: query.to_string(),
            limit,
        };
        self.request(|reply| Command::RequestMembers(data, reply))
            .await
    }

    /// Send an arbitrary client opcode. Opcodes the client manages itself
    /// are refused.
    pub async fn send_command(
        &self,
        op: u8,
        data: serde_json::Value,
    ) -> Result<(), GatewayError> {
        self.request(|reply| Command::Send { op, data, reply }).await
    }

    pub async fn reset_connection_stats(&self) -> Result<(), GatewayError> {
        self.request(Command::ResetStats).await
    }

    pub async fn reset_rate_limits(&self) -> Result<(), GatewayError> {
        self.request(Command::ResetRateLimits).await
    }

    /// Disconnect and stop the background task. Every handle fails with
    /// [`GatewayError::Closed`] afterwards.
    pub async fn shutdown(&self) -> Result<(), GatewayError> {
        self.request(Command::Shutdown).await
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.snapshot.load().state
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state() == ConnectionState::Connected
    }

    pub fn session_info(&self) -> SessionInfo {
        self.snapshot.load().session.clone()
    }

    pub fn connection_stats(&self) -> StatsSnapshot {
        self.snapshot.load().stats.snapshot()
    }

    pub fn connection_health(&self) -> HealthReport {
        let snapshot = self.snapshot.load();
        check_health(&snapshot.stats.snapshot(), snapshot.state)
    }

    pub fn rate_limit_status(&self) -> Vec<RateLimitStatus> {
        self.snapshot.load().rate_limits.status()
    }

    /// Wait until everything queued before this call has been handled.
    #[cfg(test)]
    pub(crate) async fn flush(&self) {
        let _ = self.request(Command::Flush).await;
    }

    async fn request(&self, command: impl FnOnce(Reply) -> Command) -> Result<(), GatewayError> {
        let (tx, rx) = oneshot::channel();
        self.mailbox
            .send(Input::Command(command(tx)))
            .map_err(|_| GatewayError::Closed)?;
        rx.await.map_err(|_| GatewayError::Closed)?
    }
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("address", &self.config.address)
            .field("state", &self.connection_state())
            .finish_non_exhaustive()
    }
}
