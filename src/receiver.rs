//! Background receiver: waits on the transport and appends every reply to the session.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use crate::error::{HarnessError, Result};
use crate::session::SharedSession;
use crate::transport::UdpTransport;

/// Handles one inbound payload. Decode failures are returned to the caller to skip.
pub fn handle_datagram(
    session: &SharedSession,
    payload: &[u8],
    peer: std::net::SocketAddr,
) -> Result<usize> {
    let text = std::str::from_utf8(payload)?;
    debug!(bytes = payload.len(), %peer, "RX message: {}", text);
    let samples = session.append_received(text, peer);
    debug!(samples, "samples derived");
    Ok(samples)
}

/// Runs the receive loop until the transport is closed.
pub fn run(transport: &UdpTransport, session: &SharedSession, max_datagram: usize) {
    info!(remote = %transport.remote(), "receiver started");
    loop {
        let result = transport
            .receive(max_datagram)
            .and_then(|(payload, peer)| handle_datagram(session, &payload, peer));
        match result {
            Ok(_) => {}
            Err(e) if e.is_terminal_for_receiver() => break,
            Err(e) => warn!("skipping datagram: {}", e),
        }
    }
    info!("receiver stopped");
}

/// Spawns the receive loop on its own named thread.
pub fn spawn(
    transport: Arc<UdpTransport>,
    session: SharedSession,
    max_datagram: usize,
) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("udp-receiver".into())
        .spawn(move || run(&transport, &session, max_datagram))
        .map_err(HarnessError::Spawn)
}
