//! Session state: the text received since the last send and the samples derived from it.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::command::Command;
use crate::parser::parse_samples;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Session {
    text: String,
    samples: Vec<f64>,
    // Datagrams appended since the last reset.
    received: usize,
    // Bumped by every reset so readers can tell a new reply from a longer one.
    generation: u64,
    last_command: Option<Command>,
    last_peer: Option<SocketAddr>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the buffer and samples. Called on every send.
    pub fn reset(&mut self) {
        self.text.clear();
        self.samples.clear();
        self.received = 0;
        self.generation += 1;
    }

    /// Records which command the current buffer is answering.
    pub fn set_last_command(&mut self, command: Command) {
        self.last_command = Some(command);
    }

    /// Appends a decoded datagram on its own line, trims the whole buffer and
    /// re-derives the samples from scratch.
    pub fn append_received(&mut self, text: &str) {
        let joined = format!("{}\n{}", self.text, text);
        self.text = joined.trim().to_string();
        self.samples = parse_samples(&self.text);
        self.received += 1;
    }

    pub fn note_peer(&mut self, peer: SocketAddr) {
        self.last_peer = Some(peer);
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn received(&self) -> usize {
        self.received
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            text: self.text.clone(),
            samples: self.samples.clone(),
            received: self.received,
            generation: self.generation,
            last_command: self.last_command,
            last_peer: self.last_peer,
        }
    }
}

/// A consistent copy of the session taken under a single lock.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Snapshot {
    pub text: String,
    pub samples: Vec<f64>,
    pub received: usize,
    pub generation: u64,
    pub last_command: Option<Command>,
    pub last_peer: Option<SocketAddr>,
}

/// Session shared between the receiver thread and the main flow.
#[derive(Debug, Clone, Default)]
pub struct SharedSession {
    inner: Arc<Mutex<Session>>,
}

impl SharedSession {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic in one writer must not take the display down with it; the data is
    // plain text and stays usable.
    fn lock(&self) -> MutexGuard<'_, Session> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn reset(&self) {
        self.lock().reset();
    }

    /// Marks `command` as the one the buffer is now answering.
    pub fn record_sent(&self, command: Command) {
        self.lock().set_last_command(command);
    }

    pub fn append_received(&self, text: &str, peer: SocketAddr) -> usize {
        let mut session = self.lock();
        session.append_received(text);
        session.note_peer(peer);
        session.samples().len()
    }

    pub fn current_text(&self) -> String {
        self.lock().text().to_string()
    }

    pub fn current_samples(&self) -> Vec<f64> {
        self.lock().samples().to_vec()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.lock().snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn peer() -> SocketAddr {
        "192.168.7.2:12345".parse().unwrap()
    }

    #[test]
    fn back_to_back_receives_join_with_newline() {
        let mut session = Session::new();
        session.append_received("1 2");
        session.append_received("3 4");
        assert_eq!(session.text(), "1 2\n3 4");
        assert_eq!(session.samples(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(session.received(), 2);
    }

    #[test]
    fn first_receive_has_no_leading_newline() {
        let mut session = Session::new();
        session.append_received("  hello 0.5\r\n");
        assert_eq!(session.text(), "hello 0.5");
        assert_eq!(session.samples(), &[0.5]);
    }

    #[test]
    fn whitespace_only_payload_leaves_samples_empty() {
        let mut session = Session::new();
        session.append_received(" \n\t ");
        assert_eq!(session.text(), "");
        assert!(session.samples().is_empty());
    }

    #[test]
    fn reset_clears_samples_regardless_of_prior_state() {
        let shared = SharedSession::new();
        shared.append_received("0.1 0.2 0.3", peer());
        assert_eq!(shared.current_samples().len(), 3);
        shared.reset();
        assert!(shared.current_samples().is_empty());
        assert_eq!(shared.current_text(), "");
    }

    #[test]
    fn samples_follow_the_buffer_text() {
        let mut session = Session::new();
        for chunk in ["a 1", "2,b", "3\r\n4"] {
            session.append_received(chunk);
            assert_eq!(session.samples(), parse_samples(session.text()).as_slice());
        }
    }

    #[test]
    fn reset_then_record_sent_marks_command() {
        let shared = SharedSession::new();
        shared.append_received("9", peer());
        shared.reset();
        shared.record_sent(Command::Stop);
        let snap = shared.snapshot();
        assert_eq!(snap.last_command, Some(Command::Stop));
        assert!(snap.samples.is_empty());
        assert_eq!(snap.received, 0);
        assert_eq!(snap.generation, 1);
        // The peer of the previous reply is kept for display.
        assert_eq!(snap.last_peer, Some(peer()));
    }

    #[test]
    fn concurrent_appends_are_all_kept() {
        let shared = SharedSession::new();
        let writers: Vec<_> = (0..4)
            .map(|i| {
                let shared = shared.clone();
                thread::spawn(move || {
                    for _ in 0..25 {
                        shared.append_received(&format!("{i}"), peer());
                    }
                })
            })
            .collect();
        for w in writers {
            w.join().unwrap();
        }
        let snap = shared.snapshot();
        assert_eq!(snap.received, 100);
        assert_eq!(snap.samples.len(), 100);
        assert_eq!(snap.text.lines().count(), 100);
    }
}
