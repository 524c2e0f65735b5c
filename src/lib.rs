//! # Light Dip Detector Test Harness Library
//!
//! This library contains the core logic for manually exercising the light dip
//! detector board over UDP. It sends the board's short text commands, collects
//! whatever text comes back, and extracts the numeric samples from those replies
//! so they can be plotted.
//!
//! The pieces, leaves first:
//!
//! - [`transport`]: the single closable UDP socket.
//! - [`receiver`]: the background thread appending replies to the session.
//! - [`command`] and [`dispatch`]: the fixed command set and the send action.
//! - [`parser`]: text to samples.
//! - [`session`]: the shared, mutex-guarded reply buffer.
//! - [`harness`]: wires the above together for a front end.

pub mod command;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod harness;
pub mod parser;
pub mod paths;
pub mod receiver;
pub mod session;
pub mod transport;

pub use command::{Command, LINE_TERMINATOR};
pub use config::Config;
pub use error::{HarnessError, Result};
pub use harness::{Harness, Presenter};
pub use parser::{parse_samples, SampleStats};
pub use session::{SharedSession, Snapshot};
