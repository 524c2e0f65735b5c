//! Harness configuration.
//!
//! Defaults match the lab setup (device at `192.168.7.2:12345`). Each value can be
//! overridden from the environment:
//!
//! - `LDH_HOST`         device host name or IP address
//! - `LDH_PORT`         device UDP port
//! - `LDH_MAX_DATAGRAM` receive buffer size in bytes
//! - `LDH_REFRESH_MS`   delay between a send and the single scheduled redraw

use std::net::{SocketAddr, ToSocketAddrs};
use std::ops::RangeInclusive;
use std::time::Duration;

use crate::error::{HarnessError, Result};

pub const DEFAULT_HOST: &str = "192.168.7.2";
pub const DEFAULT_PORT: u16 = 12345;
pub const DEFAULT_MAX_DATAGRAM: usize = 4096;
pub const DEFAULT_REFRESH_DELAY: Duration = Duration::from_millis(100);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Largest inbound payload accepted; longer datagrams are truncated by the OS.
    pub max_datagram: usize,
    pub refresh_delay: Duration,
    /// How often a blocked receive wakes up to check whether the transport was closed.
    pub poll_interval: Duration,
    /// Fixed vertical range of the sample plot.
    pub plot_range: RangeInclusive<f64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_datagram: DEFAULT_MAX_DATAGRAM,
            refresh_delay: DEFAULT_REFRESH_DELAY,
            poll_interval: DEFAULT_POLL_INTERVAL,
            plot_range: 0.0..=1.9,
        }
    }
}

impl Config {
    /// Builds a configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup, starting from the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(v) = lookup("LDH_HOST") {
            let v = v.trim();
            if v.is_empty() {
                return Err(invalid("LDH_HOST", v));
            }
            cfg.host = v.to_string();
        }
        if let Some(v) = lookup("LDH_PORT") {
            cfg.port = v.trim().parse().map_err(|_| invalid("LDH_PORT", &v))?;
        }
        if let Some(v) = lookup("LDH_MAX_DATAGRAM") {
            let n: usize = v
                .trim()
                .parse()
                .map_err(|_| invalid("LDH_MAX_DATAGRAM", &v))?;
            if n == 0 {
                return Err(invalid("LDH_MAX_DATAGRAM", &v));
            }
            cfg.max_datagram = n;
        }
        if let Some(v) = lookup("LDH_REFRESH_MS") {
            let ms: u64 = v.trim().parse().map_err(|_| invalid("LDH_REFRESH_MS", &v))?;
            cfg.refresh_delay = Duration::from_millis(ms);
        }

        Ok(cfg)
    }

    /// Returns a copy pointed at a different device host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Resolves the device endpoint. The first resolved address wins.
    pub fn endpoint(&self) -> Result<SocketAddr> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| invalid("LDH_HOST", &self.host))
    }
}

fn invalid(key: &'static str, value: &str) -> HarnessError {
    HarnessError::InvalidConfig {
        key,
        value: value.to_string(),
    }
}
