//! Server configuration.

use clap::Parser;
use sketchsync_core::DEFAULT_PORT;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Runtime settings for the sketch server.
///
/// Every flag can also be set through the matching `SKETCHSYNC_*`
/// environment variable.
#[derive(Debug, Clone, Parser)]
#[command(name = "sketchsync-server", version, about = "Collaborative sketch server")]
pub struct ServerConfig {
    /// Address to listen on.
    #[arg(long, env = "SKETCHSYNC_BIND", default_value = "0.0.0.0:4242")]
    pub bind: SocketAddr,

    /// Snapshots that may queue for one client before it is dropped as stalled.
    #[arg(long, env = "SKETCHSYNC_OUTBOX_CAPACITY", default_value_t = 64)]
    pub outbox_capacity: usize,

    /// Seconds allowed for writing one snapshot to a client.
    #[arg(long, env = "SKETCHSYNC_WRITE_TIMEOUT_SECS", default_value_t = 5)]
    pub write_timeout_secs: u64,

    /// Disconnect clients that send nothing for this many seconds.
    #[arg(long, env = "SKETCHSYNC_IDLE_TIMEOUT_SECS")]
    pub idle_timeout_secs: Option<u64>,

    /// Longest accepted protocol line, in bytes.
    #[arg(long, env = "SKETCHSYNC_MAX_LINE_LENGTH", default_value_t = 64 * 1024)]
    pub max_line_length: usize,

    /// Close the connection on the first malformed command instead of skipping it.
    #[arg(long, env = "SKETCHSYNC_DISCONNECT_ON_MALFORMED")]
    pub disconnect_on_malformed: bool,
}

impl ServerConfig {
    /// Defaults bound to a specific address.
    pub fn with_bind(bind: SocketAddr) -> Self {
        Self {
            bind,
            ..Self::default()
        }
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs.map(Duration::from_secs)
    }

    /// Outbox capacity, never zero.
    pub fn outbox_capacity(&self) -> usize {
        self.outbox_capacity.max(1)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            outbox_capacity: 64,
            write_timeout_secs: 5,
            idle_timeout_secs: None,
            max_line_length: 64 * 1024,
            disconnect_on_malformed: false,
        }
    }
}
