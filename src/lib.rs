pub mod backoff;
pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod rate_limit;
pub mod state;
pub mod stats;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use gateway::dispatcher::GatewayEvent;
pub use gateway::intents::Intents;
pub use gateway::transport::{Transport, TransportEvent, TransportSink, WsTransport};
pub use gateway::GatewayClient;
pub use state::ConnectionState;
