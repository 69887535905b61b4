//! Connection state machine and outbound frame queue.
//!
//! [`Connection`] isolates protocol code from the transport in use: callers
//! submit encoded request frames, and the connection decides when to trigger
//! transport preparation and when to hand frames to the wire.
//!
//! # State machine
//!
//! ```text
//!            send() while Unbound              transport ready
//! ┌─────────┐ ──────────────────> ┌─────────┐ ───────────────> ┌───────┐
//! │ Unbound │                     │ Binding │                  │ Bound │
//! └─────────┘ <────────────────── └─────────┘                  └───────┘
//!      ▲        preparation error                                  │
//!      └───────────────────────────── disconnect() ────────────────┘
//! ```
//!
//! Frames submitted before the transport is ready accumulate in a FIFO
//! queue; the transition to `Bound` drains the whole queue in submission
//! order. Exactly one preparation request is in flight per binding attempt,
//! however many sends race before it completes.

mod event;
mod frame;
mod security;

pub use event::ConnectionEvent;
pub use frame::Frame;
pub use security::{SecurityConfiguration, SecurityMode};

use std::collections::VecDeque;

use tokio::sync::mpsc;
use tracing::{debug, warn};

#[cfg(feature = "transport")]
use crate::core::ConnectionError;
use crate::transport::{Transport, TransportEvent, TransportHandle};

/// Readiness of the underlying transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport preparation has been requested.
    Unbound,
    /// Preparation is in flight; frames queue until it completes.
    Binding,
    /// The transport is ready; frames are handed to the wire immediately.
    Bound,
}

/// A transport-agnostic client connection.
///
/// Owns the connection state, the outbound frame queue, the security
/// configuration slot, and the transport itself. A single logical task
/// drives the connection: transports report completion through an event
/// channel, and those events take effect only inside
/// [`process_events`](Connection::process_events) or
/// [`process_next_event`](Connection::process_next_event).
pub struct Connection {
    security_mode: SecurityMode,
    security_configuration: SecurityConfiguration,
    state: ConnectionState,
    frames_to_send: VecDeque<Frame>,
    transport: Box<dyn Transport>,
    transport_events: mpsc::UnboundedReceiver<TransportEvent>,
    subscribers: Vec<mpsc::UnboundedSender<ConnectionEvent>>,
}

impl Connection {
    /// Create a connection with the built-in transport for `security_mode`.
    ///
    /// [`SecurityMode::NoSecurity`] selects the plain datagram transport and
    /// [`SecurityMode::PreSharedKey`] the secured one. The remaining modes
    /// have no built-in transport; use [`Connection::from_transport`].
    ///
    /// Must be called within a tokio runtime (the transports spawn their
    /// I/O tasks on it).
    #[cfg(feature = "transport")]
    pub fn new(security_mode: SecurityMode) -> Result<Self, ConnectionError> {
        match security_mode {
            SecurityMode::NoSecurity => Ok(Self::from_transport(
                security_mode,
                crate::transport::UdpTransport::new,
            )),
            #[cfg(feature = "secure")]
            SecurityMode::PreSharedKey => Ok(Self::from_transport(
                security_mode,
                crate::transport::SecureUdpTransport::new,
            )),
            mode => Err(ConnectionError::UnsupportedSecurityMode(mode)),
        }
    }

    /// Create a connection over a caller-provided transport.
    ///
    /// `make_transport` receives the [`TransportHandle`] the transport must
    /// use to report readiness, errors, and received data.
    pub fn from_transport<T, F>(security_mode: SecurityMode, make_transport: F) -> Self
    where
        T: Transport + 'static,
        F: FnOnce(TransportHandle) -> T,
    {
        let (handle, transport_events) = TransportHandle::channel();
        Self {
            security_mode,
            security_configuration: SecurityConfiguration::default(),
            state: ConnectionState::Unbound,
            frames_to_send: VecDeque::new(),
            transport: Box::new(make_transport(handle)),
            transport_events,
            subscribers: Vec::new(),
        }
    }

    /// Returns `true` if security is used.
    pub fn is_secure(&self) -> bool {
        self.security_mode.is_secure()
    }

    /// Get the security mode.
    pub fn security_mode(&self) -> SecurityMode {
        self.security_mode
    }

    /// Get the connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Get the number of frames waiting for the transport.
    pub fn pending_frames(&self) -> usize {
        self.frames_to_send.len()
    }

    /// Get the security configuration (default if never set).
    pub fn security_configuration(&self) -> &SecurityConfiguration {
        &self.security_configuration
    }

    /// Replace the security configuration.
    ///
    /// On a secured connection the new configuration is stored, forwarded to
    /// the transport, and a [`ConnectionEvent::SecurityConfigurationChanged`]
    /// is published. On an unsecured connection the update is meaningless
    /// and is ignored with a warning.
    ///
    /// Must be called before the handshake starts to take effect.
    pub fn set_security_configuration(&mut self, configuration: SecurityConfiguration) {
        if !self.is_secure() {
            warn!("security is disabled, security configuration will be ignored");
            return;
        }

        self.security_configuration = configuration;
        self.transport
            .configure_security(&self.security_configuration);
        self.publish(ConnectionEvent::SecurityConfigurationChanged);
    }

    /// Subscribe to connection events.
    ///
    /// Every subscriber receives every subsequent event in order. Dropped
    /// receivers are pruned on the next publication.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ConnectionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    /// Queue `payload` for transmission to `host:port`.
    ///
    /// The first send on an unbound connection triggers transport
    /// preparation; sends made while preparation is in flight only enqueue.
    /// On a bound connection the head of the queue is handed to the
    /// transport immediately. Never blocks; transport failures surface later
    /// as [`ConnectionEvent::Error`].
    pub fn send(&mut self, payload: impl Into<Vec<u8>>, host: impl Into<String>, port: u16) {
        let frame = Frame::new(payload, host, port);
        let (host, port) = (frame.host().to_owned(), frame.port());
        self.frames_to_send.push_back(frame);

        match self.state {
            ConnectionState::Unbound => {
                debug!(%host, port, "preparing transport");
                self.state = ConnectionState::Binding;
                self.transport.prepare(&host, port);
            }
            ConnectionState::Binding => {
                debug!(queued = self.frames_to_send.len(), "preparation in flight, frame queued");
            }
            ConnectionState::Bound => self.deliver_next(),
        }
    }

    /// Tear down the transport and return to [`ConnectionState::Unbound`].
    ///
    /// Frames still queued are retained; the next [`send`](Connection::send)
    /// triggers a fresh preparation and drains them once it completes.
    pub fn disconnect(&mut self) {
        debug!("closing transport");
        self.transport.close();
        self.state = ConnectionState::Unbound;
    }

    /// Apply all pending transport events without blocking.
    pub fn process_events(&mut self) {
        while let Ok(event) = self.transport_events.try_recv() {
            self.apply_transport_event(event);
        }
    }

    /// Await one transport event and apply it.
    ///
    /// This is the connection's sole suspension point; the readiness
    /// notification that completes a binding attempt arrives here.
    pub async fn process_next_event(&mut self) {
        if let Some(event) = self.transport_events.recv().await {
            self.apply_transport_event(event);
        }
    }

    fn apply_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Bound => match self.state {
                ConnectionState::Binding => {
                    debug!(queued = self.frames_to_send.len(), "transport bound");
                    self.state = ConnectionState::Bound;
                    self.publish(ConnectionEvent::Bound);
                    while !self.frames_to_send.is_empty() {
                        self.deliver_next();
                    }
                }
                // Late or duplicate readiness notification.
                state => debug!(?state, "ignoring bound notification"),
            },
            TransportEvent::Error(error) => {
                if self.state == ConnectionState::Binding {
                    // Preparation failed; frames stay queued and the next
                    // send starts over.
                    self.state = ConnectionState::Unbound;
                }
                warn!(%error, "transport error");
                self.publish(ConnectionEvent::Error(error));
            }
            TransportEvent::Received { payload, sender } => {
                self.publish(ConnectionEvent::DataReceived { payload, sender });
            }
        }
    }

    /// Hand the head of the queue to the transport.
    ///
    /// Invoking this on an empty queue is a state-machine bug, not a
    /// runtime condition.
    fn deliver_next(&mut self) {
        debug_assert!(
            !self.frames_to_send.is_empty(),
            "deliver_next invoked with an empty outbound queue"
        );
        let Some(frame) = self.frames_to_send.pop_front() else {
            return;
        };
        let (payload, host, port) = frame.into_parts();
        self.transport.transmit(&payload, &host, port);
    }

    fn publish(&mut self, event: ConnectionEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
