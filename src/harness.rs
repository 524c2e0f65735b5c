//! The running harness: one transport, one session, one receiver thread.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::command::Command;
use crate::config::Config;
use crate::dispatch::{Dispatcher, RefreshSchedule};
use crate::error::Result;
use crate::receiver;
use crate::session::{SharedSession, Snapshot};
use crate::transport::UdpTransport;

/// Something that draws the session. Called once per due refresh with a consistent snapshot.
pub trait Presenter {
    fn refresh(&mut self, snapshot: &Snapshot);
}

pub struct Harness {
    transport: Arc<UdpTransport>,
    session: SharedSession,
    dispatcher: Dispatcher,
    receiver: Option<JoinHandle<()>>,
}

impl Harness {
    /// Opens the transport and starts the receiver. A transport failure here is fatal.
    pub fn start(config: &Config) -> Result<Self> {
        let remote = config.endpoint()?;
        let transport = Arc::new(UdpTransport::open(remote, config.poll_interval)?);
        Self::with_transport(transport, config)
    }

    /// Starts the receiver over an already opened transport.
    pub fn with_transport(transport: Arc<UdpTransport>, config: &Config) -> Result<Self> {
        let session = SharedSession::new();
        let refresh = Arc::new(RefreshSchedule::new(config.refresh_delay));
        let receiver = receiver::spawn(Arc::clone(&transport), session.clone(), config.max_datagram)?;
        let dispatcher = Dispatcher::new(Arc::clone(&transport), session.clone(), refresh);
        info!(remote = %transport.remote(), "harness started");
        Ok(Self {
            transport,
            session,
            dispatcher,
            receiver: Some(receiver),
        })
    }

    pub fn remote(&self) -> std::net::SocketAddr {
        self.transport.remote()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn send(&self, command: Command) -> Result<()> {
        self.dispatcher.send(command)
    }

    pub fn send_shortcut(&self) -> Result<()> {
        self.dispatcher.send_shortcut()
    }

    pub fn current_text(&self) -> String {
        self.session.current_text()
    }

    pub fn current_samples(&self) -> Vec<f64> {
        self.session.current_samples()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.session.snapshot()
    }

    /// Time until the next scheduled refresh, or `None` when nothing is pending.
    pub fn time_until_refresh(&self) -> Option<Duration> {
        self.dispatcher.refresh().time_until_due(Instant::now())
    }

    /// Hands a snapshot to `presenter` if the scheduled refresh is due. Returns whether it ran.
    pub fn poll_refresh<P: Presenter + ?Sized>(&self, presenter: &mut P) -> bool {
        if !self.dispatcher.refresh().take_due(Instant::now()) {
            return false;
        }
        presenter.refresh(&self.session.snapshot());
        true
    }

    /// Closes the transport and waits for the receiver to exit.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.transport.close();
        if let Some(handle) = self.receiver.take() {
            if handle.join().is_err() {
                warn!("receiver thread panicked");
            }
            info!("harness stopped");
        }
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.stop();
    }
}
