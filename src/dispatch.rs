//! Command dispatch and the single delayed refresh that follows each send.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::info;

use crate::command::Command;
use crate::error::Result;
use crate::session::SharedSession;
use crate::transport::UdpTransport;

/// Pending redraws, one per send, each due a fixed delay after its send.
#[derive(Debug)]
pub struct RefreshSchedule {
    delay: Duration,
    // Deadlines in send order; the delay is fixed so they are also sorted.
    due: Mutex<VecDeque<Instant>>,
}

impl RefreshSchedule {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            due: Mutex::new(VecDeque::new()),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn schedule(&self, now: Instant) {
        self.due
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(now + self.delay);
    }

    pub fn pending(&self) -> usize {
        self.due.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Time left until the earliest pending refresh, if any.
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        let due = self.due.lock().unwrap_or_else(PoisonError::into_inner);
        due.front().map(|at| at.saturating_duration_since(now))
    }

    /// Consumes one due refresh. Returns `true` once for every scheduled send.
    pub fn take_due(&self, now: Instant) -> bool {
        let mut due = self.due.lock().unwrap_or_else(PoisonError::into_inner);
        match due.front() {
            Some(&at) if at <= now => {
                due.pop_front();
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    transport: Arc<UdpTransport>,
    session: SharedSession,
    refresh: Arc<RefreshSchedule>,
}

impl Dispatcher {
    pub fn new(
        transport: Arc<UdpTransport>,
        session: SharedSession,
        refresh: Arc<RefreshSchedule>,
    ) -> Self {
        Self {
            transport,
            session,
            refresh,
        }
    }

    /// Sends `command` and schedules one refresh. Does not wait for a reply.
    ///
    /// The session is cleared before the datagram leaves so that a fast reply is
    /// never wiped; a late reply to the previous command can still slip in. The
    /// command is recorded as outstanding only once the datagram is out.
    pub fn send(&self, command: Command) -> Result<()> {
        let message = command.outbound();
        info!("TX message: {:?}", message);
        self.session.reset();
        self.transport.send(message.as_bytes())?;
        self.session.record_sent(command);
        self.refresh.schedule(Instant::now());
        Ok(())
    }

    /// The keyboard shortcut, equivalent to sending `history`.
    pub fn send_shortcut(&self) -> Result<()> {
        self.send(Command::SHORTCUT)
    }

    /// Builds the bound send action for every command, in on-screen order.
    pub fn actions(&self) -> Vec<(Command, impl Fn() -> Result<()>)> {
        Command::ALL
            .into_iter()
            .map(|command| {
                let dispatcher = self.clone();
                (command, move || dispatcher.send(command))
            })
            .collect()
    }

    pub fn refresh(&self) -> &RefreshSchedule {
        &self.refresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::UdpSocket;

    fn rig() -> (UdpSocket, Dispatcher, SharedSession) {
        let device = UdpSocket::bind("127.0.0.1:0").unwrap();
        device
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let transport = Arc::new(
            UdpTransport::open(device.local_addr().unwrap(), Duration::from_millis(5)).unwrap(),
        );
        let session = SharedSession::new();
        let refresh = Arc::new(RefreshSchedule::new(Duration::from_millis(100)));
        let dispatcher = Dispatcher::new(transport, session.clone(), refresh);
        (device, dispatcher, session)
    }

    fn recv_text(device: &UdpSocket) -> String {
        let mut buf = [0u8; 128];
        let (n, _) = device.recv_from(&mut buf).unwrap();
        String::from_utf8_lossy(&buf[..n]).into_owned()
    }

    #[test]
    fn refresh_fires_once_after_delay() {
        let refresh = RefreshSchedule::new(Duration::from_millis(100));
        let t0 = Instant::now();
        assert!(!refresh.take_due(t0));
        refresh.schedule(t0);
        assert!(!refresh.take_due(t0 + Duration::from_millis(50)));
        assert_eq!(
            refresh.time_until_due(t0 + Duration::from_millis(40)),
            Some(Duration::from_millis(60))
        );
        assert!(refresh.take_due(t0 + Duration::from_millis(100)));
        assert!(!refresh.take_due(t0 + Duration::from_millis(200)));
        assert_eq!(refresh.time_until_due(t0), None);
    }

    #[test]
    fn each_send_gets_its_own_refresh() {
        let refresh = RefreshSchedule::new(Duration::from_millis(100));
        let t0 = Instant::now();
        refresh.schedule(t0);
        refresh.schedule(t0 + Duration::from_millis(80));
        assert_eq!(refresh.pending(), 2);

        let fired = (0..=40)
            .map(|i| t0 + Duration::from_millis(i * 10))
            .filter(|&now| refresh.take_due(now))
            .count();
        assert_eq!(fired, 2);
        assert_eq!(refresh.pending(), 0);
    }

    #[test]
    fn refreshes_fire_in_send_order() {
        let refresh = RefreshSchedule::new(Duration::from_millis(100));
        let t0 = Instant::now();
        refresh.schedule(t0);
        refresh.schedule(t0 + Duration::from_millis(80));
        assert!(refresh.take_due(t0 + Duration::from_millis(100)));
        assert!(!refresh.take_due(t0 + Duration::from_millis(110)));
        assert_eq!(
            refresh.time_until_due(t0 + Duration::from_millis(110)),
            Some(Duration::from_millis(70))
        );
        assert!(refresh.take_due(t0 + Duration::from_millis(180)));
        assert!(!refresh.take_due(t0 + Duration::from_millis(300)));
    }

    #[test]
    fn stop_sends_terminated_payload_and_clears_session() {
        let (device, dispatcher, session) = rig();
        session.append_received("1 2 3", device.local_addr().unwrap());

        dispatcher.send(Command::Stop).unwrap();

        assert_eq!(recv_text(&device), "stop\n");
        assert!(session.current_samples().is_empty());
        assert_eq!(session.snapshot().last_command, Some(Command::Stop));
        assert!(dispatcher.refresh().time_until_due(Instant::now()).is_some());
    }

    #[test]
    fn failed_send_leaves_no_outstanding_command() {
        let (_device, dispatcher, session) = rig();
        dispatcher.transport.close();

        assert!(dispatcher.send(Command::Count).is_err());

        let snap = session.snapshot();
        assert_eq!(snap.last_command, None);
        assert!(snap.samples.is_empty());
        assert_eq!(dispatcher.refresh().pending(), 0);
    }

    #[test]
    fn shortcut_sends_history() {
        let (device, dispatcher, _) = rig();
        dispatcher.send_shortcut().unwrap();
        assert_eq!(recv_text(&device), "history\n");
    }

    #[test]
    fn every_action_sends_its_literal() {
        let (device, dispatcher, _) = rig();
        for (command, action) in dispatcher.actions() {
            action().unwrap();
            assert_eq!(recv_text(&device), command.outbound());
        }
    }
}
