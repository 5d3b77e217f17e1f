use crds_shared::server_message::ServerMessage;
use log::warn;

use crate::connection_registry::{ConnectionId, ConnectionRegistry, Skipped};

pub struct Relay;

impl Relay {
    /// Queues `message` for every member of `room` except `sender`, returning
    /// how many members accepted it. A member whose queue is full or closed
    /// is skipped.
    pub async fn broadcast(
        registry: &ConnectionRegistry,
        sender: ConnectionId,
        room: &str,
        message: ServerMessage,
    ) -> usize {
        let delivery = registry.send_to_room(room, sender, &message).await;

        for (id, skipped) in &delivery.skipped {
            match skipped {
                Skipped::Full => warn!("Dropped message for {} in '{}': outbox full", id, room),
                Skipped::Closed => {
                    warn!("Dropped message for {} in '{}': connection closing", id, room)
                }
            }
        }

        delivery.delivered
    }
}
