//! SketchSync server library.
//!
//! Holds the canonical sketch, serializes every mutation through one state
//! task, and pushes the full sketch to each connected editor after every
//! command.

pub mod communicator;
pub mod config;
pub mod server;
pub mod state;

pub use communicator::ClientCommunicator;
pub use config::ServerConfig;
pub use server::{ServerError, ServerHandle, SketchServer};
pub use state::{Applied, ClientId, Outbox, ServerState, Snapshot};
