use std::sync::Arc;

use crds_shared::{command::Command, server_message::ServerMessage};
use log::debug;

use crate::{
    connection_registry::{ConnectionId, ConnectionRegistry},
    relay::Relay,
    room_directory::RoomDirectory,
};

/// Where a connection stands. Only its own handler moves it between states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Named { name: String },
    InRoom { name: String, room: String },
}

impl SessionState {
    pub fn name(&self) -> Option<&str> {
        match self {
            SessionState::Idle => None,
            SessionState::Named { name } | SessionState::InRoom { name, .. } => Some(name.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Close,
}

/// Result of one inbound line: at most one reply to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub reply: Option<ServerMessage>,
    pub flow: Flow,
}

impl Dispatch {
    fn reply(message: impl Into<ServerMessage>) -> Self {
        Self {
            reply: Some(message.into()),
            flow: Flow::Continue,
        }
    }

    fn silent() -> Self {
        Self {
            reply: None,
            flow: Flow::Continue,
        }
    }

    fn close(message: ServerMessage) -> Self {
        Self {
            reply: Some(message),
            flow: Flow::Close,
        }
    }
}

pub struct CommandHandler {
    id: ConnectionId,
    state: SessionState,
    directory: Arc<RoomDirectory>,
    registry: Arc<ConnectionRegistry>,
}

impl CommandHandler {
    pub fn new(
        id: ConnectionId,
        directory: Arc<RoomDirectory>,
        registry: Arc<ConnectionRegistry>,
    ) -> Self {
        Self {
            id,
            state: SessionState::Idle,
            directory,
            registry,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub async fn handle_line(&mut self, line: &str) -> Dispatch {
        let command = Command::parse(line);
        debug!("{} sent {:?}", self.id, command);

        match command {
            Command::GetDir => Dispatch::reply(ServerMessage::Directory(self.directory.list().await)),

            Command::MakeRoom {
                name,
                address,
                port,
            } => match self.directory.create(&name, &address, &port).await {
                Ok(_) => Dispatch::reply(ServerMessage::RoomCreated),
                Err(e) => Dispatch::reply(e),
            },

            Command::DeleteRoom { name } => match self.directory.delete(&name).await {
                Ok(()) => Dispatch::reply(ServerMessage::RoomDeleted),
                Err(e) => Dispatch::reply(e),
            },

            Command::Name { name } => self.set_name(name).await,

            Command::Chat { room } => self.enter_room(room).await,

            Command::ExitChat => self.exit_room().await,

            Command::Bye => Dispatch::close(ServerMessage::Bye),

            Command::Usage(keyword) => Dispatch::reply(ServerMessage::Usage(keyword)),

            Command::Text(text) => self.relay_text(text).await,
        }
    }

    async fn set_name(&mut self, name: String) -> Dispatch {
        if let Err(e) = self.registry.set_name(self.id, &name).await {
            return Dispatch::reply(e);
        }

        self.state = match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::InRoom { room, .. } => SessionState::InRoom {
                name: name.clone(),
                room,
            },
            SessionState::Idle | SessionState::Named { .. } => SessionState::Named {
                name: name.clone(),
            },
        };

        Dispatch::reply(ServerMessage::NameSet(name))
    }

    async fn enter_room(&mut self, room: String) -> Dispatch {
        let name = match self.state.name() {
            Some(name) => name.to_string(),
            None => return Dispatch::reply(ServerMessage::NameRequired),
        };

        let previous = match self.registry.join_room(self.id, &room, &self.directory).await {
            Ok(previous) => previous,
            Err(e) => return Dispatch::reply(e),
        };

        if let Some(previous) = previous.filter(|previous| *previous != room) {
            let notice = ServerMessage::ExitNotice {
                name: name.clone(),
                room: previous.clone(),
            };
            Relay::broadcast(&self.registry, self.id, &previous, notice).await;
        }

        self.state = SessionState::InRoom {
            name,
            room: room.clone(),
        };

        Dispatch::reply(ServerMessage::EnteringChat(room))
    }

    async fn exit_room(&mut self) -> Dispatch {
        let (name, room) = match &self.state {
            SessionState::InRoom { name, room } => (name.clone(), room.clone()),
            SessionState::Idle | SessionState::Named { .. } => {
                return Dispatch::reply(ServerMessage::InvalidCommand);
            }
        };

        self.registry.leave_room(self.id).await;

        let notice = ServerMessage::ExitNotice {
            name: name.clone(),
            room: room.clone(),
        };
        Relay::broadcast(&self.registry, self.id, &room, notice).await;

        self.state = SessionState::Named { name };

        Dispatch::reply(ServerMessage::ExitedChat)
    }

    async fn relay_text(&mut self, text: String) -> Dispatch {
        let (name, room) = match &self.state {
            SessionState::InRoom { name, room } => (name.clone(), room.clone()),
            SessionState::Idle | SessionState::Named { .. } => {
                return Dispatch::reply(ServerMessage::InvalidCommand);
            }
        };

        if text.is_empty() {
            return Dispatch::silent();
        }

        let message = ServerMessage::ChatLine { from: name, text };
        Relay::broadcast(&self.registry, self.id, &room, message).await;

        Dispatch::silent()
    }
}

#[cfg(test)]
mod tests {
    use crds_shared::command_keyword::CommandKeyword;
    use super::*;
    use crate::connection_registry::{OutboxReceiver, outbox};

    struct Harness {
        directory: Arc<RoomDirectory>,
        registry: Arc<ConnectionRegistry>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                directory: Arc::new(RoomDirectory::new()),
                registry: Arc::new(ConnectionRegistry::new()),
            }
        }

        async fn connect(&self) -> (CommandHandler, OutboxReceiver) {
            let (tx, rx) = outbox();
            let id = self.registry.register(tx).await;
            let handler = CommandHandler::new(id, self.directory.clone(), self.registry.clone());
            (handler, rx)
        }
    }

    fn reply(dispatch: Dispatch) -> String {
        dispatch.reply.map(|m| m.to_string()).unwrap_or_default()
    }

    #[tokio::test]
    async fn directory_commands_from_idle() {
        let harness = Harness::new();
        let (mut a, _) = harness.connect().await;
        let (mut b, _) = harness.connect().await;

        assert_eq!(
            reply(a.handle_line("makeroom lobby 239.1.1.1 5000").await),
            "Chat room created successfully"
        );
        assert_eq!(
            reply(b.handle_line("makeroom lobby 239.9.9.9 6000").await),
            "A chat room with the same name already exists."
        );
        assert_eq!(
            reply(b.handle_line("makeroom r 10.0.0.1 5000").await),
            "Invalid address/port"
        );
        assert_eq!(
            reply(b.handle_line("getdir").await),
            "{lobby: 239.1.1.1:5000}"
        );
        assert_eq!(
            reply(b.handle_line("deleteroom lobby").await),
            "Chat room deleted successfully"
        );
        assert_eq!(reply(a.handle_line("getdir").await), "{}");
        assert_eq!(
            reply(a.handle_line("deleteroom lobby").await),
            "Chat room does not exist"
        );
        assert_eq!(*a.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn usage_and_invalid_commands() {
        let harness = Harness::new();
        let (mut a, _) = harness.connect().await;

        assert_eq!(
            a.handle_line("makeroom lobby").await.reply,
            Some(ServerMessage::Usage(CommandKeyword::MakeRoom))
        );
        assert_eq!(reply(a.handle_line("hello").await), "Invalid command");
        assert_eq!(reply(a.handle_line("").await), "Invalid command");
        assert_eq!(reply(a.handle_line("^E").await), "Invalid command");
    }

    #[tokio::test]
    async fn chat_requires_a_name() {
        let harness = Harness::new();
        harness.directory.create("lobby", "239.1.1.1", "5000").await.unwrap();
        let (mut a, _) = harness.connect().await;

        assert_eq!(
            reply(a.handle_line("chat lobby").await),
            "Please set your name first using 'name <your name>'"
        );
        assert_eq!(*a.state(), SessionState::Idle);

        assert_eq!(
            reply(a.handle_line("name alice").await),
            "Your name is set to: alice"
        );
        assert_eq!(
            reply(a.handle_line("chat cellar").await),
            "Chat room does not exist"
        );
        assert_eq!(
            reply(a.handle_line("chat lobby").await),
            "Entering chat mode for chat room: lobby"
        );
        assert_eq!(
            *a.state(),
            SessionState::InRoom {
                name: "alice".to_string(),
                room: "lobby".to_string()
            }
        );
    }

    #[tokio::test]
    async fn duplicate_endpoint_is_compared_after_parsing() {
        let harness = Harness::new();
        let (mut a, _) = harness.connect().await;

        a.handle_line("makeroom lobby 239.1.1.1 5000").await;

        assert_eq!(
            reply(a.handle_line("makeroom annex 239.1.1.1 05000").await),
            "A chat room with the same address and port already exists."
        );
        assert_eq!(reply(a.handle_line("getdir").await), "{lobby: 239.1.1.1:5000}");
    }

    #[tokio::test]
    async fn holder_can_repeat_its_own_name() {
        let harness = Harness::new();
        let (mut a, _) = harness.connect().await;
        let (mut b, _) = harness.connect().await;

        assert_eq!(reply(a.handle_line("name alice").await), "Your name is set to: alice");
        assert_eq!(reply(a.handle_line("name alice").await), "Your name is set to: alice");
        assert_eq!(
            *a.state(),
            SessionState::Named {
                name: "alice".to_string()
            }
        );
        assert_eq!(
            reply(b.handle_line("name alice").await),
            "This name is already taken. Please choose a different name."
        );
    }

    #[tokio::test]
    async fn duplicate_name_leaves_state_untouched() {
        let harness = Harness::new();
        let (mut a, _) = harness.connect().await;
        let (mut b, _) = harness.connect().await;

        a.handle_line("name alice").await;

        assert_eq!(
            reply(b.handle_line("name alice").await),
            "This name is already taken. Please choose a different name."
        );
        assert_eq!(*b.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn room_messages_reach_others_but_not_sender() {
        let harness = Harness::new();
        harness.directory.create("lobby", "239.1.1.1", "5000").await.unwrap();
        let (mut a, mut a_rx) = harness.connect().await;
        let (mut b, mut b_rx) = harness.connect().await;
        let (mut c, mut c_rx) = harness.connect().await;

        for (handler, name) in [(&mut a, "alice"), (&mut b, "bob"), (&mut c, "carol")] {
            handler.handle_line(&format!("name {}", name)).await;
        }
        a.handle_line("chat lobby").await;
        b.handle_line("chat lobby").await;

        let dispatch = a.handle_line("hi").await;
        assert_eq!(dispatch.reply, None);

        assert_eq!(b_rx.try_recv().unwrap().to_string(), "alice: hi");
        assert!(a_rx.try_recv().is_err());
        assert!(c_rx.try_recv().is_err());

        // blank lines are not relayed
        assert_eq!(a.handle_line("   ").await.reply, None);
        assert!(b_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn exit_chat_notifies_remaining_members_once() {
        let harness = Harness::new();
        harness.directory.create("lobby", "239.1.1.1", "5000").await.unwrap();
        let (mut a, mut a_rx) = harness.connect().await;
        let (mut b, mut b_rx) = harness.connect().await;

        a.handle_line("name alice").await;
        b.handle_line("name bob").await;
        a.handle_line("chat lobby").await;
        b.handle_line("chat lobby").await;

        assert_eq!(reply(a.handle_line("^E").await), "You have exited the chat.");
        assert_eq!(
            *a.state(),
            SessionState::Named {
                name: "alice".to_string()
            }
        );

        assert_eq!(
            b_rx.try_recv().unwrap().to_string(),
            "alice has exited chat room lobby"
        );
        assert!(b_rx.try_recv().is_err());

        // alice is out of the room: bob's lines no longer reach her
        b.handle_line("anyone?").await;
        assert!(a_rx.try_recv().is_err());

        // and her free text is a command error again
        assert_eq!(reply(a.handle_line("hello").await), "Invalid command");
    }

    #[tokio::test]
    async fn switching_rooms_announces_exit_from_the_old_one() {
        let harness = Harness::new();
        harness.directory.create("lobby", "239.1.1.1", "5000").await.unwrap();
        harness.directory.create("attic", "239.1.1.2", "5000").await.unwrap();
        let (mut a, _) = harness.connect().await;
        let (mut b, mut b_rx) = harness.connect().await;

        a.handle_line("name alice").await;
        b.handle_line("name bob").await;
        a.handle_line("chat lobby").await;
        b.handle_line("chat lobby").await;

        assert_eq!(
            reply(a.handle_line("chat attic").await),
            "Entering chat mode for chat room: attic"
        );
        assert_eq!(
            b_rx.try_recv().unwrap().to_string(),
            "alice has exited chat room lobby"
        );

        a.handle_line("up here").await;
        assert!(b_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn renaming_in_a_room_changes_the_prefix() {
        let harness = Harness::new();
        harness.directory.create("lobby", "239.1.1.1", "5000").await.unwrap();
        let (mut a, _) = harness.connect().await;
        let (mut b, mut b_rx) = harness.connect().await;

        a.handle_line("name alice").await;
        b.handle_line("name bob").await;
        a.handle_line("chat lobby").await;
        b.handle_line("chat lobby").await;

        a.handle_line("name alicia").await;
        a.handle_line("hello").await;

        assert_eq!(b_rx.try_recv().unwrap().to_string(), "alicia: hello");
    }

    #[tokio::test]
    async fn deleted_room_keeps_its_members() {
        let harness = Harness::new();
        harness.directory.create("lobby", "239.1.1.1", "5000").await.unwrap();
        let (mut a, _) = harness.connect().await;
        let (mut b, mut b_rx) = harness.connect().await;

        a.handle_line("name alice").await;
        b.handle_line("name bob").await;
        a.handle_line("chat lobby").await;
        b.handle_line("chat lobby").await;

        assert_eq!(
            reply(a.handle_line("deleteroom lobby").await),
            "Chat room deleted successfully"
        );
        assert_eq!(reply(a.handle_line("getdir").await), "{}");

        a.handle_line("still here").await;
        assert_eq!(b_rx.try_recv().unwrap().to_string(), "alice: still here");
    }

    #[tokio::test]
    async fn bye_closes_from_any_state() {
        let harness = Harness::new();
        harness.directory.create("lobby", "239.1.1.1", "5000").await.unwrap();
        let (mut a, _) = harness.connect().await;

        a.handle_line("name alice").await;
        a.handle_line("chat lobby").await;

        let dispatch = a.handle_line("bye").await;
        assert_eq!(dispatch.flow, Flow::Close);
        assert_eq!(reply(dispatch), "Connection closed. Bye!");
    }
}
