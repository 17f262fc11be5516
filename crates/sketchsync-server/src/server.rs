//! Sketch server: the mutation actor and the accept loop.
//!
//! All state changes go through one actor task that owns [`ServerState`].
//! Connection tasks talk to it through a cloneable [`ServerHandle`]. The
//! actor applies a command, then broadcasts the resulting sketch before it
//! looks at the next request, so every client observes the same total order
//! of states.

use crate::communicator::ClientCommunicator;
use crate::config::ServerConfig;
use crate::state::{Applied, ClientId, Outbox, ServerState};
use sketchsync_core::{Command, Sketch};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Pending requests the actor will queue before senders wait.
const REQUEST_CAPACITY: usize = 1024;

/// Pause after a failed accept, e.g. when out of file descriptors.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("sketch state task has stopped")]
    StateClosed,
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// A request to the state actor.
enum Request {
    Register {
        client: ClientId,
        outbox: Outbox,
        reply: oneshot::Sender<bool>,
    },
    Unregister {
        client: ClientId,
    },
    Apply {
        client: ClientId,
        command: Command,
        reply: oneshot::Sender<Applied>,
    },
    Sketch {
        reply: oneshot::Sender<Sketch>,
    },
    ClientCount {
        reply: oneshot::Sender<usize>,
    },
}

/// Cloneable handle to the state actor.
#[derive(Debug, Clone)]
pub struct ServerHandle {
    tx: mpsc::Sender<Request>,
}

impl ServerHandle {
    /// Spawn a state actor with an empty sketch.
    pub fn spawn() -> Self {
        Self::spawn_with(ServerState::new())
    }

    /// Spawn a state actor that takes ownership of `state`.
    pub fn spawn_with(state: ServerState) -> Self {
        let (tx, rx) = mpsc::channel(REQUEST_CAPACITY);
        tokio::spawn(run_state(state, rx));
        Self { tx }
    }

    /// Register a client. The current sketch is queued to it before any
    /// later broadcast. Returns false if the client could not be registered.
    pub async fn register(&self, client: ClientId, outbox: Outbox) -> Result<bool, ServerError> {
        let (reply, rx) = oneshot::channel();
        self.request(Request::Register {
            client,
            outbox,
            reply,
        })
        .await?;
        rx.await.map_err(|_| ServerError::StateClosed)
    }

    /// Unregister a client. Unknown clients are ignored.
    pub async fn unregister(&self, client: ClientId) -> Result<(), ServerError> {
        self.request(Request::Unregister { client }).await
    }

    /// Apply a command and broadcast the resulting sketch to every client.
    pub async fn apply(&self, client: ClientId, command: Command) -> Result<Applied, ServerError> {
        let (reply, rx) = oneshot::channel();
        self.request(Request::Apply {
            client,
            command,
            reply,
        })
        .await?;
        rx.await.map_err(|_| ServerError::StateClosed)
    }

    /// Copy of the canonical sketch.
    pub async fn sketch(&self) -> Result<Sketch, ServerError> {
        let (reply, rx) = oneshot::channel();
        self.request(Request::Sketch { reply }).await?;
        rx.await.map_err(|_| ServerError::StateClosed)
    }

    /// Number of registered clients.
    pub async fn client_count(&self) -> Result<usize, ServerError> {
        let (reply, rx) = oneshot::channel();
        self.request(Request::ClientCount { reply }).await?;
        rx.await.map_err(|_| ServerError::StateClosed)
    }

    async fn request(&self, request: Request) -> Result<(), ServerError> {
        self.tx
            .send(request)
            .await
            .map_err(|_| ServerError::StateClosed)
    }
}

/// The state actor. Ends once every handle is dropped.
async fn run_state(mut state: ServerState, mut rx: mpsc::Receiver<Request>) {
    while let Some(request) = rx.recv().await {
        match request {
            Request::Register {
                client,
                outbox,
                reply,
            } => {
                let _ = reply.send(state.register(client, outbox));
            }
            Request::Unregister { client } => {
                state.unregister(client);
            }
            Request::Apply {
                client,
                command,
                reply,
            } => {
                let verb = command.verb();
                let applied = state.apply(command);
                let snapshot = state.snapshot();
                let reached = state.broadcast(&snapshot);
                debug!(%client, %verb, ?applied, reached, "applied command");
                let _ = reply.send(applied);
            }
            Request::Sketch { reply } => {
                let _ = reply.send(state.sketch().clone());
            }
            Request::ClientCount { reply } => {
                let _ = reply.send(state.client_count());
            }
        }
    }
    debug!("sketch state task stopped");
}

/// A bound sketch server, ready to accept connections.
pub struct SketchServer {
    listener: TcpListener,
    handle: ServerHandle,
    config: Arc<ServerConfig>,
}

impl SketchServer {
    /// Bind the listening socket and start the state actor.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(config.bind)
            .await
            .map_err(|source| ServerError::Bind {
                addr: config.bind,
                source,
            })?;
        Ok(Self {
            listener,
            handle: ServerHandle::spawn(),
            config: Arc::new(config),
        })
    }

    /// Address actually bound (useful with port 0).
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn handle(&self) -> ServerHandle {
        self.handle.clone()
    }

    /// Accept connections forever, one communicator task per client.
    pub async fn run(self) -> Result<(), ServerError> {
        info!("server ready for connections on {}", self.local_addr()?);
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    let id = Uuid::new_v4();
                    info!(client = %id, %peer, "someone connected");
                    let communicator = ClientCommunicator::new(
                        id,
                        peer,
                        stream,
                        self.handle.clone(),
                        self.config.clone(),
                    );
                    tokio::spawn(communicator.run());
                }
                Err(e) if is_transient_accept_error(&e) => {
                    warn!("accept failed: {}", e);
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
                Err(e) => {
                    error!("listener failed: {}", e);
                    return Err(ServerError::Io(e));
                }
            }
        }
    }
}

/// Errors that concern a single pending connection rather than the listener.
fn is_transient_accept_error(e: &io::Error) -> bool {
    use io::ErrorKind::*;
    matches!(
        e.kind(),
        ConnectionAborted | ConnectionReset | ConnectionRefused | Interrupted | WouldBlock | TimedOut
    ) || e.raw_os_error().is_some_and(|code| code == 23 || code == 24)
}
