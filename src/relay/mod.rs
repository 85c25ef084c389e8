//! Relay WebSocket: connection lifecycle, reconnect delays, and the process-wide feed.

pub mod backoff;
pub mod feed;
pub mod machine;
pub mod ws;

pub use backoff::ReconnectBackoff;
pub use feed::LiveFeed;
pub use machine::{ConnectionMachine, ReconnectPlan};
pub use ws::{RelayConnection, RelayConnector, RelayWsClient, TungsteniteConnector};
