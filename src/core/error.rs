//! Error types for the connection layer.

use std::io;

use thiserror::Error;

use crate::connection::SecurityMode;

/// Errors raised when constructing a [`Connection`](crate::Connection).
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// No built-in transport supports the requested security mode.
    ///
    /// The stock transports cover [`SecurityMode::NoSecurity`] and
    /// [`SecurityMode::PreSharedKey`]; other modes need a caller-provided
    /// transport via [`Connection::from_transport`](crate::Connection::from_transport).
    #[error("no built-in transport for security mode {0:?}")]
    UnsupportedSecurityMode(SecurityMode),
}

/// Transport-level failures.
///
/// These are never returned synchronously: transports report them through
/// their event channel, and the connection republishes them as
/// [`ConnectionEvent::Error`](crate::ConnectionEvent::Error). The frames
/// involved stay queued; recovery is the caller's decision.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The destination host could not be resolved.
    #[error("host not found: {0}")]
    HostNotFound(String),

    /// The local address is already in use.
    #[error("address in use: {0}")]
    AddressInUse(String),

    /// Transport preparation timed out.
    #[error("transport preparation timed out")]
    Timeout,

    /// The secure handshake failed.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// An established secure session failed to protect or recover a
    /// datagram (for example after datagram loss).
    #[error("secure session error: {0}")]
    Session(String),

    /// An I/O error occurred on the socket.
    #[error("i/o error: {0}")]
    Io(String),

    /// A frame was handed to a transport that has not been prepared.
    #[error("transport is not ready")]
    NotReady,
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::AddrInUse => Self::AddressInUse(err.to_string()),
            io::ErrorKind::TimedOut => Self::Timeout,
            _ => Self::Io(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_mapping() {
        let err: TransportError = io::Error::new(io::ErrorKind::AddrInUse, "port taken").into();
        assert!(matches!(err, TransportError::AddressInUse(_)));

        let err: TransportError = io::Error::new(io::ErrorKind::TimedOut, "slow").into();
        assert_eq!(err, TransportError::Timeout);

        let err: TransportError = io::Error::other("boom").into();
        assert!(matches!(err, TransportError::Io(_)));
    }

    #[test]
    fn test_error_display() {
        let err = TransportError::HostNotFound("coap.example".into());
        assert_eq!(err.to_string(), "host not found: coap.example");
    }
}
