//! Editor-side connection to the sketch server.
//!
//! The communicator owns the TCP connection. A reader thread rebuilds every
//! sketch the server broadcasts and hands it to the [`Editor`]; a writer
//! thread drains commands queued with [`EditorCommunicator::send`].

use crate::protocol::Command;
use crate::sketch::{Sketch, SketchAssembler};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use thiserror::Error;

/// The drawing surface that displays server state.
pub trait Editor: Send + 'static {
    /// Replace the local sketch wholesale.
    fn set_sketch(&mut self, sketch: Sketch);

    /// Redraw after the sketch changed.
    fn repaint(&mut self);
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

/// Errors from the editor communicator.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("couldn't connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("not connected")]
    NotConnected,
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Commands sent to the writer thread.
enum WriterCommand {
    Send(String),
    Close,
}

/// Handles communication to and from the server for one editor.
pub struct EditorCommunicator {
    peer: SocketAddr,
    state: Arc<Mutex<ConnectionState>>,
    stream: TcpStream,
    cmd_tx: Option<Sender<WriterCommand>>,
    _reader: Option<JoinHandle<()>>,
    _writer: Option<JoinHandle<()>>,
}

impl EditorCommunicator {
    /// Connect to a server and start listening for sketches.
    pub fn connect<A, E>(addr: A, editor: E) -> Result<Self, EditorError>
    where
        A: ToSocketAddrs + std::fmt::Debug,
        E: Editor,
    {
        let describe = format!("{:?}", addr);
        log::info!("connecting to {}...", describe);
        let stream = TcpStream::connect(&addr).map_err(|source| EditorError::Connect {
            addr: describe,
            source,
        })?;
        let peer = stream.peer_addr()?;
        log::info!("...connected to {}", peer);

        let state = Arc::new(Mutex::new(ConnectionState::Connected));
        let (cmd_tx, cmd_rx) = channel::<WriterCommand>();

        let read_half = stream.try_clone()?;
        let reader_state = state.clone();
        let reader = thread::Builder::new()
            .name("sketch-reader".to_string())
            .spawn(move || {
                read_loop(read_half, editor);
                set_state(&reader_state, ConnectionState::Disconnected);
                log::info!("server hung up");
            })?;

        let write_half = stream.try_clone()?;
        let writer_state = state.clone();
        let writer = thread::Builder::new()
            .name("sketch-writer".to_string())
            .spawn(move || {
                if let Err(e) = write_loop(write_half, cmd_rx) {
                    log::error!("send to server failed: {}", e);
                }
                set_state(&writer_state, ConnectionState::Disconnected);
            })?;

        Ok(Self {
            peer,
            state,
            stream,
            cmd_tx: Some(cmd_tx),
            _reader: Some(reader),
            _writer: Some(writer),
        })
    }

    /// Queue a command for the server. No acknowledgment is awaited.
    pub fn send(&self, command: &Command) -> Result<(), EditorError> {
        self.send_line(&command.encode())
    }

    /// Queue raw protocol text for the server.
    pub fn send_line(&self, msg: &str) -> Result<(), EditorError> {
        if !self.is_connected() {
            return Err(EditorError::NotConnected);
        }
        match self.cmd_tx {
            Some(ref tx) => tx
                .send(WriterCommand::Send(msg.to_string()))
                .map_err(|_| EditorError::NotConnected),
            None => Err(EditorError::NotConnected),
        }
    }

    /// Close the connection.
    pub fn disconnect(&mut self) {
        if let Some(tx) = self.cmd_tx.take() {
            let _ = tx.send(WriterCommand::Close);
        }
        // Unblocks the reader thread.
        let _ = self.stream.shutdown(Shutdown::Both);
        set_state(&self.state, ConnectionState::Disconnected);
    }

    /// Address of the server.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Get current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check if connected.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }
}

impl Drop for EditorCommunicator {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn set_state(state: &Mutex<ConnectionState>, value: ConnectionState) {
    *state.lock().unwrap_or_else(PoisonError::into_inner) = value;
}

/// Read broadcasts until the server hangs up.
fn read_loop<E: Editor>(stream: TcpStream, mut editor: E) {
    let mut assembler = SketchAssembler::new();
    for line in BufReader::new(stream).lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::warn!("read from server failed: {}", e);
                return;
            }
        };
        match assembler.push_line(&line) {
            Some(Ok(sketch)) => {
                log::debug!("received sketch with {} shapes", sketch.len());
                editor.set_sketch(sketch);
                editor.repaint();
            }
            Some(Err(e)) => log::warn!("discarding malformed sketch: {}", e),
            None => {}
        }
    }
}

/// Write queued commands until closed.
fn write_loop(stream: TcpStream, commands: Receiver<WriterCommand>) -> io::Result<()> {
    let mut out = BufWriter::new(stream);
    for command in commands {
        match command {
            WriterCommand::Send(msg) => {
                log::debug!("sending: {:?}", msg);
                writeln!(out, "{}", msg)?;
                out.flush()?;
            }
            WriterCommand::Close => break,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Segment, ShapeColor};
    use std::net::TcpListener;
    use std::sync::mpsc::Sender;
    use std::time::Duration;

    struct ChannelEditor {
        sketches: Sender<Sketch>,
        repaints: Sender<()>,
    }

    impl Editor for ChannelEditor {
        fn set_sketch(&mut self, sketch: Sketch) {
            let _ = self.sketches.send(sketch);
        }

        fn repaint(&mut self) {
            let _ = self.repaints.send(());
        }
    }

    #[test]
    fn test_receives_sketches_and_sends_commands() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut out = stream.try_clone().unwrap();
            writeln!(out, "Shapes are:\nend").unwrap();
            writeln!(out, "Shapes are:\n0\tsegment 0 0 10 10 -16776961\nend").unwrap();

            let mut lines = BufReader::new(stream).lines();
            let verb = lines.next().unwrap().unwrap();
            let payload = lines.next().unwrap().unwrap();
            (verb, payload)
        });

        let (tx, rx) = channel();
        let (repaint_tx, repaint_rx) = channel();
        let editor = ChannelEditor {
            sketches: tx,
            repaints: repaint_tx,
        };
        let mut comm = EditorCommunicator::connect(addr, editor).unwrap();
        assert!(comm.is_connected());
        assert_eq!(comm.peer_addr(), addr);

        let first = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(first.is_empty());
        let second = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(repaint_rx.iter().take(2).count(), 2);

        comm.send(&Command::Draw(
            Segment::new(1, 1, 2, 2, ShapeColor::blue()).into(),
        ))
        .unwrap();
        let (verb, payload) = server.join().unwrap();
        assert_eq!(verb, "DRAW");
        assert_eq!(payload, "segment 1 1 2 2 -16776961");

        comm.disconnect();
        assert_eq!(comm.state(), ConnectionState::Disconnected);
        assert!(matches!(
            comm.send_line("DELETE\n0"),
            Err(EditorError::NotConnected)
        ));
    }

    #[test]
    fn test_connect_failure() {
        // Bind then drop to get a port with no listener.
        let addr = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let (tx, _rx) = channel();
        let (repaint_tx, _repaint_rx) = channel();
        let editor = ChannelEditor {
            sketches: tx,
            repaints: repaint_tx,
        };
        assert!(matches!(
            EditorCommunicator::connect(addr, editor),
            Err(EditorError::Connect { .. })
        ));
    }
}
