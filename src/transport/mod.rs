//! Session transport: endpoint resolution, the per-session connection
//! channel, and the reconnect state machine.
//!
//! This module provides:
//! - `endpoint` - origin routing and session URL building
//! - `channel` - `ConnectionChannel`, one websocket per visible session
//! - `reconnect` - `ReconnectPolicy`, the timeout/backoff/retry machine

pub mod channel;
pub mod endpoint;
pub mod reconnect;

#[cfg(test)]
pub(crate) mod testing;

pub use channel::{
    ChannelConfig, ChannelStatus, ConnectionChannel, Connector, Transport, TransportEvent,
    WireMessage, SESSION_DEAD_CLOSE_CODE,
};
pub use reconnect::{Effect, FailureKind, PolicyState, ReconnectPolicy};
