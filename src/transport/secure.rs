//! Secured datagram transport.
//!
//! Performs a pre-shared-key Noise handshake over UDP before signaling
//! readiness; after that every outbound frame is protected by the session
//! and every inbound datagram is recovered before being published.
//!
//! The session is bound to the peer the handshake was performed with.
//! Datagram loss or reordering within an established session surfaces as a
//! [`TransportError::Session`] event; re-establishment is left to the
//! caller (disconnect, then send again).

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::net::{UdpSocket, lookup_host};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::debug;
use zeroize::Zeroizing;

use super::{Transport, TransportHandle};
use crate::connection::SecurityConfiguration;
use crate::core::{HANDSHAKE_TIMEOUT, PRE_SHARED_KEY_SIZE, RECV_BUFFER_SIZE, TransportError};

/// Noise pattern for the pre-shared-key handshake.
const NOISE_PATTERN: &str = "Noise_NNpsk0_25519_ChaChaPoly_BLAKE2s";

/// Poly1305 tag appended to every protected datagram.
const AEAD_TAG_SIZE: usize = 16;

/// One outbound frame queued for the I/O task.
struct Outbound {
    payload: Vec<u8>,
    host: String,
    port: u16,
}

/// Secured datagram transport.
///
/// `prepare` snapshots the pre-shared key from the most recent
/// [`SecurityConfiguration`] and spawns an I/O task that binds a socket,
/// completes the handshake (with a timeout), and only then signals
/// readiness. A missing or mis-sized key fails the preparation.
pub struct SecureUdpTransport {
    events: TransportHandle,
    configuration: SecurityConfiguration,
    outbound: Option<mpsc::UnboundedSender<Outbound>>,
    local_addr: SocketAddr,
    handshake_timeout: Duration,
}

impl SecureUdpTransport {
    /// Create a transport reporting through `events`.
    pub fn new(events: TransportHandle) -> Self {
        Self {
            events,
            configuration: SecurityConfiguration::default(),
            outbound: None,
            local_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
            handshake_timeout: HANDSHAKE_TIMEOUT,
        }
    }

    /// Override the local bind address (default `0.0.0.0:0`).
    pub fn set_local_addr(&mut self, addr: SocketAddr) {
        self.local_addr = addr;
    }

    /// Override the handshake timeout (default
    /// [`HANDSHAKE_TIMEOUT`](crate::core::HANDSHAKE_TIMEOUT)).
    pub fn set_handshake_timeout(&mut self, timeout: Duration) {
        self.handshake_timeout = timeout;
    }
}

impl Transport for SecureUdpTransport {
    fn prepare(&mut self, host: &str, port: u16) {
        if self.outbound.is_some() {
            // Preparation already in flight or complete.
            return;
        }

        let psk = Zeroizing::new(self.configuration.pre_shared_key().to_vec());
        if psk.is_empty() {
            self.events
                .error(TransportError::Handshake("no pre-shared key configured".into()));
            return;
        }
        if psk.len() != PRE_SHARED_KEY_SIZE {
            self.events.error(TransportError::Handshake(format!(
                "pre-shared key must be {PRE_SHARED_KEY_SIZE} bytes, got {}",
                psk.len()
            )));
            return;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        self.outbound = Some(tx);
        tokio::spawn(io_task(
            self.events.clone(),
            rx,
            self.local_addr,
            host.to_owned(),
            port,
            psk,
            self.handshake_timeout,
        ));
    }

    fn transmit(&mut self, payload: &[u8], host: &str, port: u16) {
        let Some(tx) = &self.outbound else {
            self.events.error(TransportError::NotReady);
            return;
        };
        let frame = Outbound {
            payload: payload.to_vec(),
            host: host.to_owned(),
            port,
        };
        if tx.send(frame).is_err() {
            self.events.error(TransportError::NotReady);
        }
    }

    fn close(&mut self) {
        // Dropping the sender stops the I/O task; the session dies with it.
        self.outbound = None;
    }

    fn configure_security(&mut self, configuration: &SecurityConfiguration) {
        self.configuration = configuration.clone();
    }
}

async fn io_task(
    events: TransportHandle,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    local_addr: SocketAddr,
    host: String,
    port: u16,
    psk: Zeroizing<Vec<u8>>,
    handshake_timeout: Duration,
) {
    let (socket, mut session) =
        match establish(local_addr, &host, port, &psk, handshake_timeout).await {
            Ok(established) => established,
            Err(err) => {
                events.error(err);
                return;
            }
        };
    debug!(%host, port, "secure session established");
    events.bound();

    let peer = match socket.peer_addr() {
        Ok(addr) => addr,
        Err(err) => {
            events.error(err.into());
            return;
        }
    };

    let mut wire = vec![0u8; RECV_BUFFER_SIZE];
    let mut clear = vec![0u8; RECV_BUFFER_SIZE];
    loop {
        tokio::select! {
            frame = outbound.recv() => match frame {
                Some(Outbound { payload, host, port }) => {
                    // The session only reaches the handshake peer; the
                    // frame's destination is informational here.
                    if port != peer.port() {
                        debug!(%host, port, "frame carried over established session");
                    }
                    let mut sealed = vec![0u8; payload.len() + AEAD_TAG_SIZE];
                    match session.write_message(&payload, &mut sealed) {
                        Ok(len) => {
                            if let Err(err) = socket.send(&sealed[..len]).await {
                                events.error(err.into());
                            }
                        }
                        Err(err) => events.error(TransportError::Session(err.to_string())),
                    }
                }
                // Transport closed.
                None => break,
            },
            received = socket.recv(&mut wire) => match received {
                Ok(len) => match session.read_message(&wire[..len], &mut clear) {
                    Ok(len) => events.received(clear[..len].to_vec(), peer),
                    Err(err) => events.error(TransportError::Session(err.to_string())),
                },
                Err(err) => events.error(err.into()),
            },
        }
    }
    debug!("secure session closed");
}

/// Resolve, bind, connect, and run the handshake to completion.
async fn establish(
    local_addr: SocketAddr,
    host: &str,
    port: u16,
    psk: &[u8],
    handshake_timeout: Duration,
) -> Result<(UdpSocket, snow::TransportState), TransportError> {
    let peer = lookup_host((host, port))
        .await
        .map_err(|_| TransportError::HostNotFound(host.to_owned()))?
        .next()
        .ok_or_else(|| TransportError::HostNotFound(host.to_owned()))?;

    let socket = UdpSocket::bind(local_addr).await?;
    socket.connect(peer).await?;

    // Length validated before preparation was spawned.
    let mut key = Zeroizing::new([0u8; PRE_SHARED_KEY_SIZE]);
    key.copy_from_slice(psk);

    let mut handshake = snow::Builder::new(NOISE_PATTERN.parse().unwrap())
        .psk(0, &*key)
        .build_initiator()
        .map_err(|e| TransportError::Handshake(e.to_string()))?;

    let mut buf = vec![0u8; RECV_BUFFER_SIZE];
    let len = handshake
        .write_message(&[], &mut buf)
        .map_err(|e| TransportError::Handshake(e.to_string()))?;
    socket.send(&buf[..len]).await?;

    let len = timeout(handshake_timeout, socket.recv(&mut buf))
        .await
        .map_err(|_| TransportError::Timeout)??;
    let mut payload = vec![0u8; RECV_BUFFER_SIZE];
    handshake
        .read_message(&buf[..len], &mut payload)
        .map_err(|e| TransportError::Handshake(e.to_string()))?;

    let session = handshake
        .into_transport_mode()
        .map_err(|e| TransportError::Handshake(e.to_string()))?;
    Ok((socket, session))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportEvent;
    use rand::RngCore;
    use rand::rngs::OsRng;

    const RECV_TIMEOUT: Duration = Duration::from_secs(5);

    fn test_psk() -> [u8; PRE_SHARED_KEY_SIZE] {
        let mut psk = [0u8; PRE_SHARED_KEY_SIZE];
        OsRng.fill_bytes(&mut psk);
        psk
    }

    fn psk_configuration(psk: &[u8]) -> SecurityConfiguration {
        let mut config = SecurityConfiguration::new();
        config.set_pre_shared_key(psk);
        config
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<TransportEvent>) -> TransportEvent {
        timeout(RECV_TIMEOUT, rx.recv())
            .await
            .expect("timed out waiting for transport event")
            .expect("event channel closed")
    }

    /// Responder that answers the handshake, then echoes one decrypted
    /// payload back (reversed) through the session.
    async fn run_responder(socket: UdpSocket, psk: [u8; PRE_SHARED_KEY_SIZE]) {
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
        let mut clear = vec![0u8; RECV_BUFFER_SIZE];

        let mut handshake = snow::Builder::new(NOISE_PATTERN.parse().unwrap())
            .psk(0, &psk)
            .build_responder()
            .unwrap();

        let (len, initiator) = socket.recv_from(&mut buf).await.unwrap();
        handshake.read_message(&buf[..len], &mut clear).unwrap();
        let len = handshake.write_message(&[], &mut buf).unwrap();
        socket.send_to(&buf[..len], initiator).await.unwrap();
        let mut session = handshake.into_transport_mode().unwrap();

        let (len, _) = socket.recv_from(&mut buf).await.unwrap();
        let len = session.read_message(&buf[..len], &mut clear).unwrap();
        let mut reply = clear[..len].to_vec();
        reply.reverse();
        let len = session.write_message(&reply, &mut buf).unwrap();
        socket.send_to(&buf[..len], initiator).await.unwrap();
    }

    #[tokio::test]
    async fn test_handshake_and_roundtrip() {
        let psk = test_psk();
        let responder_socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let responder_addr = responder_socket.local_addr().unwrap();
        let responder = tokio::spawn(run_responder(responder_socket, psk));

        let (handle, mut rx) = TransportHandle::channel();
        let mut transport = SecureUdpTransport::new(handle);
        transport.configure_security(&psk_configuration(&psk));
        transport.prepare("127.0.0.1", responder_addr.port());
        assert_eq!(next_event(&mut rx).await, TransportEvent::Bound);

        transport.transmit(b"abc", "127.0.0.1", responder_addr.port());
        match next_event(&mut rx).await {
            TransportEvent::Received { payload, sender } => {
                assert_eq!(payload, b"cba");
                assert_eq!(sender, responder_addr);
            }
            other => panic!("expected Received, got {other:?}"),
        }

        responder.await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_psk_fails_preparation() {
        let (handle, mut rx) = TransportHandle::channel();
        let mut transport = SecureUdpTransport::new(handle);

        transport.prepare("127.0.0.1", 5684);
        match next_event(&mut rx).await {
            TransportEvent::Error(TransportError::Handshake(message)) => {
                assert!(message.contains("no pre-shared key"));
            }
            other => panic!("expected Handshake error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_short_psk_fails_preparation() {
        let (handle, mut rx) = TransportHandle::channel();
        let mut transport = SecureUdpTransport::new(handle);
        transport.configure_security(&psk_configuration(b"too-short"));

        transport.prepare("127.0.0.1", 5684);
        match next_event(&mut rx).await {
            TransportEvent::Error(TransportError::Handshake(message)) => {
                assert!(message.contains("32 bytes"));
            }
            other => panic!("expected Handshake error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_wrong_psk_times_out() {
        // The responder cannot read the initiation, so no response ever
        // comes back and preparation times out.
        let responder_socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let responder_addr = responder_socket.local_addr().unwrap();
        let responder = tokio::spawn(async move {
            let mut buf = vec![0u8; RECV_BUFFER_SIZE];
            let mut clear = vec![0u8; RECV_BUFFER_SIZE];
            let mut handshake = snow::Builder::new(NOISE_PATTERN.parse().unwrap())
                .psk(0, &test_psk())
                .build_responder()
                .unwrap();
            let (len, _) = responder_socket.recv_from(&mut buf).await.unwrap();
            assert!(handshake.read_message(&buf[..len], &mut clear).is_err());
        });

        let (handle, mut rx) = TransportHandle::channel();
        let mut transport = SecureUdpTransport::new(handle);
        transport.configure_security(&psk_configuration(&test_psk()));
        transport.set_handshake_timeout(Duration::from_millis(200));

        transport.prepare("127.0.0.1", responder_addr.port());
        assert_eq!(
            next_event(&mut rx).await,
            TransportEvent::Error(TransportError::Timeout)
        );

        responder.await.unwrap();
    }
}
