//! # coap-conduit
//!
//! Transport-agnostic connection layer for CoAP clients.
//!
//! `coap-conduit` isolates protocol code from the transport that actually
//! moves bytes, so the same client logic runs over a plain datagram socket
//! or a secured one. It provides:
//!
//! - **Connection state machine**: unbound → binding → bound readiness
//!   tracking with deferred, FIFO frame delivery
//! - **Transport capability interface**: `prepare` + `transmit`, with all
//!   outcomes reported asynchronously as typed events
//! - **Security configuration**: a mode-gated slot for handshake material,
//!   zeroized on drop
//! - **Built-in transports**: plain UDP and a pre-shared-key secured
//!   variant
//!
//! ## Feature Flags
//!
//! - `transport` (default): plain datagram transport (tokio UDP)
//! - `secure` (default): secured datagram transport (pre-shared-key
//!   handshake)
//!
//! ## Modules
//!
//! - [`core`]: Constants and error types (always included)
//! - [`connection`]: Connection state machine, frames, events, security
//!   configuration
//! - [`transport`]: Transport capability interface and concrete transports
//!
//! ## Example Usage
//!
//! ```no_run
//! use coap_conduit::{Connection, ConnectionEvent, SecurityMode, DEFAULT_PORT};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut connection = Connection::new(SecurityMode::NoSecurity)?;
//!     let mut events = connection.subscribe();
//!
//!     // Encoded request bytes come from the protocol layer above.
//!     connection.send(b"request".as_slice(), "coap.example", DEFAULT_PORT);
//!
//!     loop {
//!         connection.process_next_event().await;
//!         while let Ok(event) = events.try_recv() {
//!             if let ConnectionEvent::DataReceived { payload, sender } = event {
//!                 println!("{} bytes from {sender}", payload.len());
//!                 return Ok(());
//!             }
//!         }
//!     }
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

// Connection state machine (always included)
pub mod connection;

// Transport interface; concrete transports are feature-gated internally
pub mod transport;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::connection::{
        Connection, ConnectionEvent, ConnectionState, Frame, SecurityConfiguration, SecurityMode,
    };
    pub use crate::core::{
        ConnectionError, DEFAULT_PORT, DEFAULT_SECURE_PORT, TransportError,
    };
    pub use crate::transport::{Transport, TransportEvent, TransportHandle};

    #[cfg(feature = "secure")]
    pub use crate::transport::SecureUdpTransport;
    #[cfg(feature = "transport")]
    pub use crate::transport::UdpTransport;
}

// Re-export commonly used items at crate root
pub use crate::connection::{
    Connection, ConnectionEvent, ConnectionState, Frame, SecurityConfiguration, SecurityMode,
};
pub use crate::core::{ConnectionError, DEFAULT_PORT, DEFAULT_SECURE_PORT, TransportError};
pub use crate::transport::{Transport, TransportEvent, TransportHandle};

#[cfg(feature = "secure")]
pub use crate::transport::SecureUdpTransport;
#[cfg(feature = "transport")]
pub use crate::transport::UdpTransport;
