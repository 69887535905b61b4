//! Observer-facing connection events.

use std::net::SocketAddr;

use crate::core::TransportError;

/// Events published by a [`Connection`](crate::Connection) to its
/// subscribers.
///
/// Delivery is in-order per subscriber and synchronous with the state change
/// that produced the event: an observer that queries the connection while
/// handling an event sees the post-transition state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The underlying transport became ready for transmission.
    Bound,

    /// The security configuration was replaced.
    SecurityConfigurationChanged,

    /// A transport-level error occurred. Queued frames are retained.
    Error(TransportError),

    /// The transport received a datagram. The payload is passed through
    /// uninterpreted for the protocol layer to decode.
    DataReceived {
        /// Raw received bytes.
        payload: Vec<u8>,
        /// Address the datagram arrived from.
        sender: SocketAddr,
    },
}
