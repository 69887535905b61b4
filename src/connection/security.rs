//! Security mode and configuration for secured transports.
//!
//! The connection stores the configuration but never interprets it; the
//! fields are opaque material handed to whichever secured transport performs
//! the handshake.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Whether, and how, traffic is protected by a secure handshake.
///
/// Fixed when the connection is constructed; immutable thereafter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SecurityMode {
    /// Plain datagrams, no handshake.
    #[default]
    NoSecurity,
    /// Handshake authenticated by a pre-shared key.
    PreSharedKey,
    /// Handshake authenticated by a raw public key.
    RawPublicKey,
    /// Handshake authenticated by an X.509 certificate.
    Certificate,
}

impl SecurityMode {
    /// Returns `true` for every mode except [`SecurityMode::NoSecurity`].
    pub fn is_secure(self) -> bool {
        self != Self::NoSecurity
    }
}

/// Credentials and trust material for a secured transport.
///
/// A single-slot value object with replace semantics: setting a new
/// configuration on a connection overwrites the previous one wholesale.
/// Empty fields mean "not provided". Key material is zeroized on drop.
#[derive(Clone, Default, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecurityConfiguration {
    pre_shared_key: Vec<u8>,
    psk_identity: Vec<u8>,
    local_certificate_chain: Vec<Vec<u8>>,
    private_key: Vec<u8>,
    trust_anchors: Vec<Vec<u8>>,
}

impl SecurityConfiguration {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pre-shared key.
    pub fn set_pre_shared_key(&mut self, key: impl Into<Vec<u8>>) {
        self.pre_shared_key.zeroize();
        self.pre_shared_key = key.into();
    }

    /// Get the pre-shared key (empty if not provided).
    pub fn pre_shared_key(&self) -> &[u8] {
        &self.pre_shared_key
    }

    /// Set the identity hint sent alongside the pre-shared key.
    pub fn set_psk_identity(&mut self, identity: impl Into<Vec<u8>>) {
        self.psk_identity = identity.into();
    }

    /// Get the pre-shared key identity hint.
    pub fn psk_identity(&self) -> &[u8] {
        &self.psk_identity
    }

    /// Set the local certificate chain (opaque DER blobs).
    pub fn set_local_certificate_chain(&mut self, chain: Vec<Vec<u8>>) {
        self.local_certificate_chain = chain;
    }

    /// Get the local certificate chain.
    pub fn local_certificate_chain(&self) -> &[Vec<u8>] {
        &self.local_certificate_chain
    }

    /// Set the private key matching the local certificate chain.
    pub fn set_private_key(&mut self, key: impl Into<Vec<u8>>) {
        self.private_key.zeroize();
        self.private_key = key.into();
    }

    /// Get the private key (empty if not provided).
    pub fn private_key(&self) -> &[u8] {
        &self.private_key
    }

    /// Set the trust anchors used to validate the peer (opaque DER blobs).
    pub fn set_trust_anchors(&mut self, anchors: Vec<Vec<u8>>) {
        self.trust_anchors = anchors;
    }

    /// Get the trust anchors.
    pub fn trust_anchors(&self) -> &[Vec<u8>] {
        &self.trust_anchors
    }
}

// Key material must not leak through logs.
impl fmt::Debug for SecurityConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityConfiguration")
            .field("pre_shared_key", &format_args!("[{} bytes]", self.pre_shared_key.len()))
            .field("psk_identity", &self.psk_identity)
            .field("local_certificate_chain", &self.local_certificate_chain.len())
            .field("private_key", &format_args!("[{} bytes]", self.private_key.len()))
            .field("trust_anchors", &self.trust_anchors.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_secure_query() {
        assert!(!SecurityMode::NoSecurity.is_secure());
        assert!(SecurityMode::PreSharedKey.is_secure());
        assert!(SecurityMode::RawPublicKey.is_secure());
        assert!(SecurityMode::Certificate.is_secure());
    }

    #[test]
    fn test_configuration_defaults_empty() {
        let config = SecurityConfiguration::new();
        assert!(config.pre_shared_key().is_empty());
        assert!(config.psk_identity().is_empty());
        assert!(config.local_certificate_chain().is_empty());
        assert!(config.private_key().is_empty());
        assert!(config.trust_anchors().is_empty());
    }

    #[test]
    fn test_configuration_replace() {
        let mut config = SecurityConfiguration::new();
        config.set_pre_shared_key(b"secret".as_slice());
        config.set_psk_identity(b"client-1".as_slice());
        assert_eq!(config.pre_shared_key(), b"secret");

        config.set_pre_shared_key(b"rotated".as_slice());
        assert_eq!(config.pre_shared_key(), b"rotated");
        assert_eq!(config.psk_identity(), b"client-1");
    }

    #[test]
    fn test_debug_redacts_key_material() {
        let mut config = SecurityConfiguration::new();
        config.set_pre_shared_key(hex::decode("deadbeef").unwrap());
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("222, 173"));
        assert!(rendered.contains("[4 bytes]"));
    }
}
