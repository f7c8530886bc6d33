//! Transport-layer error types.
//!
//! These stay inside the transport seam: connection failures reach the rest
//! of the client as channel status, never as errors.

use thiserror::Error;

/// Failure sending through a transport handle.
///
/// Socket-level failures are not represented here: the socket thread reports
/// them as `TransportEvent::Failed` and they become channel status.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport's worker is gone; the message was not delivered.
    #[error("transport closed")]
    Closed,
}
