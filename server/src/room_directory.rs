use std::{collections::BTreeMap, fmt, net::SocketAddrV4};

use crds_shared::{parse_room_address, parse_room_port, server_message::ServerMessage};
use log::info;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryError {
    DuplicateName,
    DuplicateEndpoint,
    InvalidAddress,
    InvalidPort,
    NotFound,
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", ServerMessage::from(*self))
    }
}

impl core::error::Error for DirectoryError {}

impl From<DirectoryError> for ServerMessage {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::DuplicateName => ServerMessage::DuplicateRoomName,
            DirectoryError::DuplicateEndpoint => ServerMessage::DuplicateEndpoint,
            DirectoryError::InvalidAddress | DirectoryError::InvalidPort => {
                ServerMessage::InvalidEndpoint
            }
            DirectoryError::NotFound => ServerMessage::RoomNotFound,
        }
    }
}

/// Registry of chat rooms keyed by name. Every check-then-act runs under one
/// write guard, so concurrent `create` calls for a name resolve to one winner.
#[derive(Default)]
pub struct RoomDirectory {
    rooms: RwLock<BTreeMap<String, SocketAddrV4>>,
}

impl RoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn list(&self) -> Vec<(String, SocketAddrV4)> {
        self.rooms
            .read()
            .await
            .iter()
            .map(|(name, endpoint)| (name.clone(), *endpoint))
            .collect()
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.rooms.read().await.contains_key(name)
    }

    pub async fn create(
        &self,
        name: &str,
        address: &str,
        port: &str,
    ) -> Result<SocketAddrV4, DirectoryError> {
        let address = parse_room_address(address);
        let port = parse_room_port(port);

        let mut rooms = self.rooms.write().await;

        if rooms.contains_key(name) {
            return Err(DirectoryError::DuplicateName);
        }

        if let (Some(address), Some(port)) = (address, port) {
            let endpoint = SocketAddrV4::new(address, port);
            if rooms.values().any(|existing| *existing == endpoint) {
                return Err(DirectoryError::DuplicateEndpoint);
            }
        }

        let address = address.ok_or(DirectoryError::InvalidAddress)?;
        let port = port.ok_or(DirectoryError::InvalidPort)?;
        let endpoint = SocketAddrV4::new(address, port);

        rooms.insert(name.to_string(), endpoint);
        info!("Chat room '{}' created at {}", name, endpoint);

        Ok(endpoint)
    }

    pub async fn delete(&self, name: &str) -> Result<(), DirectoryError> {
        match self.rooms.write().await.remove(name) {
            Some(endpoint) => {
                info!("Chat room '{}' at {} deleted", name, endpoint);
                Ok(())
            }
            None => Err(DirectoryError::NotFound),
        }
    }
}
