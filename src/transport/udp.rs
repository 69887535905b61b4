//! Plain datagram transport over tokio UDP.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::debug;

use super::{Transport, TransportHandle};
use crate::core::{RECV_BUFFER_SIZE, TransportError};

/// One outbound datagram queued for the I/O task.
struct Outbound {
    payload: Vec<u8>,
    host: String,
    port: u16,
}

/// Plain datagram transport.
///
/// `prepare` spawns an I/O task that binds a UDP socket and signals
/// readiness; from then on the task forwards outbound frames (resolving the
/// destination per frame) and publishes every received datagram, until the
/// transport is closed.
pub struct UdpTransport {
    events: TransportHandle,
    outbound: Option<mpsc::UnboundedSender<Outbound>>,
    local_addr: SocketAddr,
}

impl UdpTransport {
    /// Create a transport reporting through `events`.
    pub fn new(events: TransportHandle) -> Self {
        Self {
            events,
            outbound: None,
            local_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
        }
    }

    /// Override the local bind address (default `0.0.0.0:0`).
    pub fn set_local_addr(&mut self, addr: SocketAddr) {
        self.local_addr = addr;
    }
}

impl Transport for UdpTransport {
    fn prepare(&mut self, host: &str, port: u16) {
        if self.outbound.is_some() {
            // Preparation already in flight or complete.
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
        // Dropping the sender stops the I/O task and releases the socket.
        self.outbound = None;
    }
}

async fn io_task(
    events: TransportHandle,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    local_addr: SocketAddr,
    host: String,
    port: u16,
) {
    let socket = match UdpSocket::bind(local_addr).await {
        Ok(socket) => socket,
        Err(err) => {
            events.error(err.into());
            return;
        }
    };
    debug!(%host, port, "datagram socket bound");
    events.bound();

    let mut buf = vec![0u8; RECV_BUFFER_SIZE];
    loop {
        tokio::select! {
            frame = outbound.recv() => match frame {
                Some(Outbound { payload, host, port }) => {
                    if let Err(err) = socket.send_to(&payload, (host.as_str(), port)).await {
                        events.error(err.into());
                    }
                }
                // Transport closed.
                None => break,
            },
            received = socket.recv_from(&mut buf) => match received {
                Ok((len, sender)) => events.received(buf[..len].to_vec(), sender),
                Err(err) => events.error(err.into()),
            },
        }
    }
    debug!("datagram socket closed");
}
