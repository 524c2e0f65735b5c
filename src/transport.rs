//! Datagram transport to the device under test.
//!
//! A single UDP socket bound to an ephemeral local port. Receives block until a
//! datagram arrives or the transport is closed; internally the socket wakes up every
//! poll interval to check the closed flag, the same way a serial read with a short
//! timeout is polled.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::info;

use crate::error::{HarnessError, Result};

#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    remote: SocketAddr,
    closed: AtomicBool,
}

impl UdpTransport {
    /// Opens a socket on an ephemeral port of the unspecified address matching the
    /// remote's family.
    pub fn open(remote: SocketAddr, poll_interval: Duration) -> Result<Self> {
        let unspecified = match remote {
            SocketAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            SocketAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        };
        Self::open_on(SocketAddr::new(unspecified, 0), remote, poll_interval)
    }

    /// Opens a socket bound to `local`.
    pub fn open_on(local: SocketAddr, remote: SocketAddr, poll_interval: Duration) -> Result<Self> {
        let open_err = |source| HarnessError::Open {
            addr: local,
            source,
        };
        let socket = UdpSocket::bind(local).map_err(open_err)?;
        // A zero timeout is rejected by the OS.
        let poll = poll_interval.max(Duration::from_millis(1));
        socket.set_read_timeout(Some(poll)).map_err(open_err)?;

        let transport = Self {
            socket,
            remote,
            closed: AtomicBool::new(false),
        };
        let bound = transport.socket.local_addr().unwrap_or(local);
        info!(local = %bound, remote = %remote, "datagram transport open");
        Ok(transport)
    }

    pub fn remote(&self) -> SocketAddr {
        self.remote
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr().map_err(HarnessError::Receive)
    }

    /// Sends one datagram to the remote endpoint. No delivery guarantee.
    pub fn send(&self, payload: &[u8]) -> Result<usize> {
        if self.is_closed() {
            return Err(HarnessError::Closed);
        }
        self.socket
            .send_to(payload, self.remote)
            .map_err(HarnessError::Send)
    }

    /// Blocks until a datagram of at most `max_size` bytes arrives, returning the
    /// payload and its sender. Returns [`HarnessError::Closed`] once [`close`] has
    /// been called.
    ///
    /// [`close`]: UdpTransport::close
    pub fn receive(&self, max_size: usize) -> Result<(Vec<u8>, SocketAddr)> {
        let mut buf = vec![0u8; max_size.max(1)];
        loop {
            if self.is_closed() {
                return Err(HarnessError::Closed);
            }
            match self.socket.recv_from(&mut buf) {
                Ok((n, peer)) => {
                    buf.truncate(n);
                    return Ok((buf, peer));
                }
                Err(ref e)
                    if e.kind() == io::ErrorKind::WouldBlock
                        || e.kind() == io::ErrorKind::TimedOut => {}
                Err(e) => {
                    if self.is_closed() {
                        return Err(HarnessError::Closed);
                    }
                    return Err(HarnessError::Receive(e));
                }
            }
        }
    }

    /// Marks the transport closed. A pending [`receive`](UdpTransport::receive)
    /// returns within one poll interval.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!(remote = %self.remote, "datagram transport closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
