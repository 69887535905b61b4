//! Transport capability interface and concrete datagram transports.
//!
//! A [`Connection`](crate::Connection) holds exactly one [`Transport`],
//! selected at construction from the security mode. The trait is the seam
//! between the connection state machine and actual network I/O:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         Protocol layer (caller)         │
//! ├─────────────────────────────────────────┤
//! │      Connection (state + queue)         │
//! ├─────────────────────────────────────────┤
//! │      Transport (this interface)         │  ← prepare / transmit
//! ├─────────────────────────────────────────┤
//! │        UDP (plain or secured)           │
//! └─────────────────────────────────────────┘
//! ```
//!
//! Transports never return failures synchronously. Every outcome
//! (readiness, errors, received datagrams) travels back through the
//! [`TransportHandle`] given to the transport at construction, and the
//! connection applies it when its owner task processes events.

use std::net::SocketAddr;

use tokio::sync::mpsc;

use crate::connection::SecurityConfiguration;
use crate::core::TransportError;

#[cfg(feature = "secure")]
mod secure;
#[cfg(feature = "transport")]
mod udp;

#[cfg(feature = "secure")]
#[cfg_attr(docsrs, doc(cfg(feature = "secure")))]
pub use secure::SecureUdpTransport;
#[cfg(feature = "transport")]
#[cfg_attr(docsrs, doc(cfg(feature = "transport")))]
pub use udp::UdpTransport;

/// Notifications a transport delivers back to its connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The transport completed preparation and is ready to transmit.
    Bound,
    /// Preparation or transmission failed.
    Error(TransportError),
    /// A datagram arrived from the network.
    Received {
        /// Raw received bytes (decrypted, for secured transports).
        payload: Vec<u8>,
        /// Address the datagram arrived from.
        sender: SocketAddr,
    },
}

/// Sending side of a transport's event channel.
///
/// Handed to the transport when the connection is constructed; cheap to
/// clone into spawned I/O tasks. Sends are infallible from the transport's
/// point of view; if the connection is gone, events are silently dropped.
#[derive(Debug, Clone)]
pub struct TransportHandle {
    tx: mpsc::UnboundedSender<TransportEvent>,
}

impl TransportHandle {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Report that the transport is ready for data transmission.
    pub fn bound(&self) {
        let _ = self.tx.send(TransportEvent::Bound);
    }

    /// Report a transport-level error.
    pub fn error(&self, error: TransportError) {
        let _ = self.tx.send(TransportEvent::Error(error));
    }

    /// Deliver a received datagram.
    pub fn received(&self, payload: Vec<u8>, sender: SocketAddr) {
        let _ = self.tx.send(TransportEvent::Received { payload, sender });
    }
}

/// Capability interface implemented by concrete transports.
///
/// Implementations must not block in any method: `prepare` starts whatever
/// asynchronous work readiness requires and signals
/// [`TransportHandle::bound`] exactly once when it completes, and `transmit`
/// hands a single frame to the wire. Failures are reported via
/// [`TransportHandle::error`], never as return values.
pub trait Transport: Send {
    /// Begin preparing the transport for transmission to `host:port`.
    ///
    /// Called once per binding attempt; calling it again while a previous
    /// preparation is still in flight must be a no-op.
    fn prepare(&mut self, host: &str, port: u16);

    /// Hand one frame to the wire.
    ///
    /// Only called after the transport has signaled readiness.
    fn transmit(&mut self, payload: &[u8], host: &str, port: u16);

    /// Tear down the transport, releasing its socket.
    ///
    /// A closed transport may be prepared again later.
    fn close(&mut self);

    /// Receive the connection's current security configuration.
    ///
    /// Called on every configuration update; transports that perform a
    /// handshake snapshot the material when `prepare` runs. The default
    /// implementation ignores the update.
    fn configure_security(&mut self, _configuration: &SecurityConfiguration) {}
}
