use std::{
    collections::HashMap,
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use crds_shared::server_message::ServerMessage;
use tokio::sync::{
    Mutex,
    mpsc::{self, error::TrySendError},
};

use crate::room_directory::RoomDirectory;

/// Room lines queued for one connection before new ones are dropped.
pub const OUTBOX_CAPACITY: usize = 32;

pub type Outbox = mpsc::Sender<ServerMessage>;
pub type OutboxReceiver = mpsc::Receiver<ServerMessage>;

pub fn outbox() -> (Outbox, OutboxReceiver) {
    mpsc::channel(OUTBOX_CAPACITY)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    NameTaken,
    NameRequired,
    RoomNotFound,
    UnknownConnection,
}

impl From<RegistryError> for ServerMessage {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NameTaken => ServerMessage::NameTaken,
            RegistryError::NameRequired => ServerMessage::NameRequired,
            RegistryError::RoomNotFound => ServerMessage::RoomNotFound,
            RegistryError::UnknownConnection => ServerMessage::InvalidCommand,
        }
    }
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::UnknownConnection => write!(f, "Connection is not registered"),
            other => write!(f, "{}", ServerMessage::from(*other)),
        }
    }
}

impl core::error::Error for RegistryError {}

struct ConnectionEntry {
    name: Option<String>,
    room: Option<String>,
    outbox: Outbox,
}

/// A room member as seen by the relay at the moment of the snapshot.
#[derive(Debug, Clone)]
pub struct RoomMember {
    pub id: ConnectionId,
    pub outbox: Outbox,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skipped {
    Full,
    Closed,
}

/// Outcome of queueing one message for a room.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomDelivery {
    pub delivered: usize,
    pub skipped: Vec<(ConnectionId, Skipped)>,
}

/// What a connection held when it was released.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Departure {
    pub name: Option<String>,
    pub room: Option<String>,
}

#[derive(Default)]
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<ConnectionId, ConnectionEntry>>,
    next_id: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, outbox: Outbox) -> ConnectionId {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));

        self.connections.lock().await.insert(
            id,
            ConnectionEntry {
                name: None,
                room: None,
                outbox,
            },
        );

        id
    }

    pub async fn len(&self) -> usize {
        self.connections.lock().await.len()
    }

    /// Assigns `name` unless another live connection holds it.
    pub async fn set_name(&self, id: ConnectionId, name: &str) -> Result<(), RegistryError> {
        let mut connections = self.connections.lock().await;

        let taken = connections
            .iter()
            .any(|(other, entry)| *other != id && entry.name.as_deref() == Some(name));

        if taken {
            return Err(RegistryError::NameTaken);
        }

        let entry = connections
            .get_mut(&id)
            .ok_or(RegistryError::UnknownConnection)?;
        entry.name = Some(name.to_string());

        Ok(())
    }

    pub async fn get_name(&self, id: ConnectionId) -> Option<String> {
        self.connections
            .lock()
            .await
            .get(&id)
            .and_then(|entry| entry.name.clone())
    }

    /// Puts the connection in `room`, returning the room it was in before.
    ///
    /// The directory is consulted as a snapshot before the registry lock is
    /// taken; a room deleted right after the check still gets its member.
    pub async fn join_room(
        &self,
        id: ConnectionId,
        room: &str,
        directory: &RoomDirectory,
    ) -> Result<Option<String>, RegistryError> {
        if !directory.contains(room).await {
            return Err(RegistryError::RoomNotFound);
        }

        let mut connections = self.connections.lock().await;
        let entry = connections
            .get_mut(&id)
            .ok_or(RegistryError::UnknownConnection)?;

        if entry.name.is_none() {
            return Err(RegistryError::NameRequired);
        }

        Ok(entry.room.replace(room.to_string()))
    }

    pub async fn leave_room(&self, id: ConnectionId) -> Option<String> {
        self.connections
            .lock()
            .await
            .get_mut(&id)
            .and_then(|entry| entry.room.take())
    }

    pub async fn members_of(&self, room: &str, exclude: ConnectionId) -> Vec<RoomMember> {
        self.connections
            .lock()
            .await
            .iter()
            .filter(|(id, entry)| **id != exclude && entry.room.as_deref() == Some(room))
            .map(|(id, entry)| RoomMember {
                id: *id,
                outbox: entry.outbox.clone(),
            })
            .collect()
    }

    /// Queues `message` for every member of `room` except `exclude` without
    /// letting go of the lock, so a member that has left cannot be reached.
    pub async fn send_to_room(
        &self,
        room: &str,
        exclude: ConnectionId,
        message: &ServerMessage,
    ) -> RoomDelivery {
        let connections = self.connections.lock().await;
        let mut delivery = RoomDelivery::default();

        let members = connections
            .iter()
            .filter(|(id, entry)| **id != exclude && entry.room.as_deref() == Some(room));

        for (id, entry) in members {
            match entry.outbox.try_send(message.clone()) {
                Ok(()) => delivery.delivered += 1,
                Err(TrySendError::Full(_)) => delivery.skipped.push((*id, Skipped::Full)),
                Err(TrySendError::Closed(_)) => delivery.skipped.push((*id, Skipped::Closed)),
            }
        }

        delivery
    }

    /// Drops every trace of the connection. Idempotent.
    pub async fn release(&self, id: ConnectionId) -> Option<Departure> {
        self.connections
            .lock()
            .await
            .remove(&id)
            .map(|entry| Departure {
                name: entry.name,
                room: entry.room,
            })
    }
}
