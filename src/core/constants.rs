//! Protocol constants.
//!
//! Port numbers are fixed by RFC 7252; the remaining values are
//! implementation defaults.

use std::time::Duration;

// =============================================================================
// ADDRESSING (RFC 7252 §6.1)
// =============================================================================

/// Default CoAP port for unsecured transports.
pub const DEFAULT_PORT: u16 = 5683;

/// Default CoAP port for secured transports (coaps).
pub const DEFAULT_SECURE_PORT: u16 = 5684;

// =============================================================================
// TRANSPORT DEFAULTS
// =============================================================================

/// Receive buffer size for datagram sockets (maximum UDP payload).
pub const RECV_BUFFER_SIZE: usize = 65535;

/// Pre-shared key length accepted by the built-in secured transport.
pub const PRE_SHARED_KEY_SIZE: usize = 32;

/// Give up on a secure handshake after this long without a response.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
