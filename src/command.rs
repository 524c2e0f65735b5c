//! The fixed command vocabulary understood by the device.

use std::fmt;
use std::str::FromStr;

use crate::error::HarnessError;

/// Appended to every outbound payload.
pub const LINE_TERMINATOR: &str = "\n";

// Represents every command the harness can send, in on-screen order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Help,
    // Sent as "?".
    Query,
    Count,
    Length,
    Dips,
    History,
    // The empty command: only the line terminator goes out.
    Blank,
    Stop,
}

impl Command {
    pub const ALL: [Command; 8] = [
        Command::Help,
        Command::Query,
        Command::Count,
        Command::Length,
        Command::Dips,
        Command::History,
        Command::Blank,
        Command::Stop,
    ];

    /// The command bound to the keyboard shortcut.
    pub const SHORTCUT: Command = Command::History;

    /// The literal text sent to the device, without terminator.
    pub fn payload(self) -> &'static str {
        match self {
            Command::Help => "help",
            Command::Query => "?",
            Command::Count => "count",
            Command::Length => "length",
            Command::Dips => "dips",
            Command::History => "history",
            Command::Blank => "",
            Command::Stop => "stop",
        }
    }

    /// Name shown to the user. Only differs from the payload for the blank command.
    pub fn label(self) -> &'static str {
        match self {
            Command::Blank => "<blank>",
            other => other.payload(),
        }
    }

    /// Builds the outbound message: payload plus line terminator.
    pub fn outbound(self) -> String {
        format!("{}{}", self.payload(), LINE_TERMINATOR)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Command {
    type Err = HarnessError;

    /// Accepts payloads and labels. Both `""` and `blank` name the blank command.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("blank") || s == Command::Blank.label() {
            return Ok(Command::Blank);
        }
        Command::ALL
            .into_iter()
            .find(|c| c.payload().eq_ignore_ascii_case(s))
            .ok_or_else(|| HarnessError::UnknownCommand(s.to_string()))
    }
}
