//! Canonical server state: the sketch, the ID counter and the client registry.
//!
//! `ServerState` is plain data with no locking of its own. The mutation actor
//! in [`crate::server`] is its only owner, which is what makes each mutation
//! and the broadcast of its result one step.

use sketchsync_core::{Command, Shape, ShapeColor, ShapeId, Sketch};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Identifier of one client connection.
pub type ClientId = Uuid;

/// A serialized sketch, shared between every outbox it is queued in.
pub type Snapshot = Arc<str>;

/// Sending side of a client's bounded snapshot queue.
pub type Outbox = mpsc::Sender<Snapshot>;

/// Result of applying one command to the canonical sketch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Drawn(ShapeId),
    Moved(ShapeId),
    Recolored(ShapeId),
    Deleted(ShapeId),
    /// The command named an ID that does not exist.
    UnknownId(ShapeId),
}

/// Canonical state owned by the server.
#[derive(Debug, Default)]
pub struct ServerState {
    sketch: Sketch,
    next_id: ShapeId,
    clients: HashMap<ClientId, Outbox>,
}

impl ServerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The canonical sketch.
    pub fn sketch(&self) -> &Sketch {
        &self.sketch
    }

    /// Next unused shape ID. IDs are never reused.
    pub fn assign_id(&mut self) -> ShapeId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Add a new shape under a fresh ID.
    pub fn apply_draw(&mut self, shape: Shape) -> ShapeId {
        let id = self.assign_id();
        let mut staged = Sketch::new();
        staged.insert(id, shape);
        self.sketch.merge(staged);
        id
    }

    /// Replace the shape at `id`. Unknown IDs are ignored so a move racing
    /// a delete cannot resurrect the shape.
    pub fn apply_move(&mut self, id: ShapeId, shape: Shape) -> bool {
        match self.sketch.get_mut(id) {
            Some(existing) => {
                *existing = shape;
                true
            }
            None => {
                warn!(id, "MOVE for unknown shape ignored");
                false
            }
        }
    }

    /// Change only the color of the shape at `id`.
    pub fn apply_recolor(&mut self, id: ShapeId, color: ShapeColor) -> bool {
        match self.sketch.get_mut(id) {
            Some(shape) => {
                shape.set_color(color);
                true
            }
            None => {
                warn!(id, "RECOLOR for unknown shape ignored");
                false
            }
        }
    }

    /// Remove the shape at `id`; removing twice is harmless.
    pub fn apply_delete(&mut self, id: ShapeId) -> bool {
        if self.sketch.remove(id).is_some() {
            true
        } else {
            debug!(id, "DELETE for unknown shape ignored");
            false
        }
    }

    /// Apply a decoded client command.
    pub fn apply(&mut self, command: Command) -> Applied {
        match command {
            Command::Draw(shape) => Applied::Drawn(self.apply_draw(shape)),
            Command::Move { id, shape } => {
                if self.apply_move(id, shape) {
                    Applied::Moved(id)
                } else {
                    Applied::UnknownId(id)
                }
            }
            Command::Recolor { id, color } => {
                if self.apply_recolor(id, color) {
                    Applied::Recolored(id)
                } else {
                    Applied::UnknownId(id)
                }
            }
            Command::Delete { id } => {
                if self.apply_delete(id) {
                    Applied::Deleted(id)
                } else {
                    Applied::UnknownId(id)
                }
            }
        }
    }

    /// Serialize the canonical sketch for broadcasting.
    pub fn snapshot(&self) -> Snapshot {
        Arc::from(self.sketch.serialize())
    }

    /// Add a client, queueing the current sketch to it first.
    ///
    /// Returns false if the client could not take the snapshot, in which
    /// case it is not registered.
    pub fn register(&mut self, client: ClientId, outbox: Outbox) -> bool {
        if let Err(e) = outbox.try_send(self.snapshot()) {
            warn!(%client, "could not queue initial sketch: {}", e);
            return false;
        }
        self.clients.insert(client, outbox);
        info!(%client, clients = self.clients.len(), "client registered");
        true
    }

    /// Remove a client. Returns false if it was not registered.
    pub fn unregister(&mut self, client: ClientId) -> bool {
        let removed = self.clients.remove(&client).is_some();
        if removed {
            info!(%client, clients = self.clients.len(), "client unregistered");
        }
        removed
    }

    pub fn is_registered(&self, client: ClientId) -> bool {
        self.clients.contains_key(&client)
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Queue a snapshot for every registered client, the originator included.
    ///
    /// Never waits on a client. A client whose outbox is full is stalled and
    /// gets dropped, as does one whose connection already closed. Returns the
    /// number of clients the snapshot was queued for.
    pub fn broadcast(&mut self, snapshot: &Snapshot) -> usize {
        let mut dropped = Vec::new();
        for (client, outbox) in &self.clients {
            match outbox.try_send(snapshot.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!(%client, "client is not keeping up; dropping it");
                    dropped.push(*client);
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(%client, "client already closed");
                    dropped.push(*client);
                }
            }
        }
        for client in &dropped {
            self.clients.remove(client);
        }
        self.clients.len()
    }
}
