//! Per-connection communicator.
//!
//! Each accepted socket gets one `ClientCommunicator`. It reads two-line
//! commands from the client and forwards them to the state actor, and writes
//! whatever snapshots the actor queues in its outbox. Reading and writing run
//! side by side, so a slow reader never blocks the client's own commands.

use crate::config::ServerConfig;
use crate::server::ServerHandle;
use crate::state::{ClientId, Snapshot};
use futures_util::{SinkExt, StreamExt};
use sketchsync_core::{Command, ProtocolError, Verb};
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};
use tracing::{Instrument, debug, info, info_span, warn};

/// Why a connection ended.
#[derive(Debug)]
enum CloseReason {
    /// The client closed its end.
    PeerClosed,
    /// Nothing arrived within the idle timeout.
    Idle,
    /// A malformed command arrived while running strict.
    Malformed(ProtocolError),
    /// A line exceeded the configured maximum or reading failed.
    ReadFailed(LinesCodecError),
    WriteTimedOut,
    WriteFailed(LinesCodecError),
    /// The server stopped queueing snapshots for this client.
    Evicted,
    /// The state actor is gone.
    ServerClosed,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::PeerClosed => f.write_str("peer closed the connection"),
            CloseReason::Idle => f.write_str("idle timeout"),
            CloseReason::Malformed(e) => write!(f, "malformed command: {e}"),
            CloseReason::ReadFailed(e) => write!(f, "read failed: {e}"),
            CloseReason::WriteTimedOut => f.write_str("write timed out"),
            CloseReason::WriteFailed(e) => write!(f, "write failed: {e}"),
            CloseReason::Evicted => f.write_str("dropped by server"),
            CloseReason::ServerClosed => f.write_str("server shut down"),
        }
    }
}

/// Serves one client connection.
pub struct ClientCommunicator {
    id: ClientId,
    peer: SocketAddr,
    stream: TcpStream,
    server: ServerHandle,
    config: Arc<ServerConfig>,
}

impl ClientCommunicator {
    pub fn new(
        id: ClientId,
        peer: SocketAddr,
        stream: TcpStream,
        server: ServerHandle,
        config: Arc<ServerConfig>,
    ) -> Self {
        Self {
            id,
            peer,
            stream,
            server,
            config,
        }
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Serve the connection until either side ends it, then unregister.
    pub async fn run(self) {
        let span = info_span!("client", client = %self.id, peer = %self.peer);
        self.serve().instrument(span).await
    }

    async fn serve(self) {
        let Self {
            id,
            stream,
            server,
            config,
            ..
        } = self;

        if let Err(e) = stream.set_nodelay(true) {
            debug!("could not set TCP_NODELAY: {}", e);
        }
        let (reader, writer) = stream.into_split();
        let (outbox, snapshots) = mpsc::channel(config.outbox_capacity());

        match server.register(id, outbox).await {
            Ok(true) => {}
            Ok(false) => {
                warn!("registration refused");
                return;
            }
            Err(e) => {
                warn!("registration failed: {}", e);
                return;
            }
        }

        let reason = tokio::select! {
            reason = read_commands(id, reader, &server, &config) => reason,
            reason = write_snapshots(writer, snapshots, &config) => reason,
        };
        info!("connection closed: {}", reason);

        if let Err(e) = server.unregister(id).await {
            debug!("unregister failed: {}", e);
        }
    }
}

/// Read verb and payload lines and hand each decoded command to the server.
async fn read_commands(
    id: ClientId,
    reader: OwnedReadHalf,
    server: &ServerHandle,
    config: &ServerConfig,
) -> CloseReason {
    let mut lines = FramedRead::new(reader, LinesCodec::new_with_max_length(config.max_line_length));

    loop {
        let verb_line = match next_line(&mut lines, config).await {
            Ok(line) => line,
            Err(reason) => return reason,
        };
        if verb_line.trim().is_empty() {
            continue;
        }

        let verb = match Verb::parse(&verb_line) {
            Ok(verb) => verb,
            Err(e) => {
                if let Some(reason) = malformed(e, config) {
                    return reason;
                }
                continue;
            }
        };

        let payload = match next_line(&mut lines, config).await {
            Ok(line) => line,
            Err(reason) => return reason,
        };
        let command = match Command::decode(verb, &payload) {
            Ok(command) => command,
            Err(e) => {
                if let Some(reason) = malformed(e, config) {
                    return reason;
                }
                continue;
            }
        };

        debug!(%verb, "received command");
        if server.apply(id, command).await.is_err() {
            return CloseReason::ServerClosed;
        }
    }
}

async fn next_line(
    lines: &mut FramedRead<OwnedReadHalf, LinesCodec>,
    config: &ServerConfig,
) -> Result<String, CloseReason> {
    let next = match config.idle_timeout() {
        Some(limit) => tokio::time::timeout(limit, lines.next())
            .await
            .map_err(|_| CloseReason::Idle)?,
        None => lines.next().await,
    };
    match next {
        Some(Ok(line)) => Ok(line),
        Some(Err(e)) => Err(CloseReason::ReadFailed(e)),
        None => Err(CloseReason::PeerClosed),
    }
}

/// Log a malformed command. Returns a close reason when running strict.
fn malformed(error: ProtocolError, config: &ServerConfig) -> Option<CloseReason> {
    if config.disconnect_on_malformed {
        Some(CloseReason::Malformed(error))
    } else {
        warn!("dropping malformed command: {}", error);
        None
    }
}

/// Write queued snapshots until the outbox closes or a write stalls.
async fn write_snapshots(
    writer: OwnedWriteHalf,
    mut snapshots: mpsc::Receiver<Snapshot>,
    config: &ServerConfig,
) -> CloseReason {
    let mut sink = FramedWrite::new(writer, LinesCodec::new());
    let limit = config.write_timeout();

    while let Some(snapshot) = snapshots.recv().await {
        match tokio::time::timeout(limit, sink.send(snapshot)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return CloseReason::WriteFailed(e),
            Err(_) => return CloseReason::WriteTimedOut,
        }
    }
    CloseReason::Evicted
}
