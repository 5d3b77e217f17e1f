use core::error::Error;
use std::{fmt, net::SocketAddrV4};

use futures::SinkExt;
use tokio::io::AsyncWrite;
use tokio_util::codec::{FramedWrite, LinesCodec};

use crate::command_keyword::CommandKeyword;

pub const ENTERING_CHAT_PREFIX: &str = "Entering chat mode for chat room: ";
pub const EXITED_CHAT: &str = "You have exited the chat.";

pub type LineWriter<W> = FramedWrite<W, LinesCodec>;

pub fn line_writer<W: AsyncWrite>(writer: W) -> LineWriter<W> {
    FramedWrite::new(writer, LinesCodec::new())
}

/// Every line the server sends, either as a reply or pushed from a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    Directory(Vec<(String, SocketAddrV4)>),
    RoomCreated,
    RoomDeleted,
    RoomNotFound,
    DuplicateRoomName,
    DuplicateEndpoint,
    InvalidEndpoint,
    NameSet(String),
    NameTaken,
    NameRequired,
    EnteringChat(String),
    ExitedChat,
    ChatLine { from: String, text: String },
    ExitNotice { name: String, room: String },
    Usage(CommandKeyword),
    InvalidCommand,
    Bye,
    ServerFull,
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::Directory(rooms) => {
                write!(f, "{{")?;
                for (index, (name, endpoint)) in rooms.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, endpoint)?;
                }
                write!(f, "}}")
            }
            ServerMessage::RoomCreated => write!(f, "Chat room created successfully"),
            ServerMessage::RoomDeleted => write!(f, "Chat room deleted successfully"),
            ServerMessage::RoomNotFound => write!(f, "Chat room does not exist"),
            ServerMessage::DuplicateRoomName => {
                write!(f, "A chat room with the same name already exists.")
            }
            ServerMessage::DuplicateEndpoint => {
                write!(f, "A chat room with the same address and port already exists.")
            }
            ServerMessage::InvalidEndpoint => write!(f, "Invalid address/port"),
            ServerMessage::NameSet(name) => write!(f, "Your name is set to: {}", name),
            ServerMessage::NameTaken => {
                write!(f, "This name is already taken. Please choose a different name.")
            }
            ServerMessage::NameRequired => {
                write!(f, "Please set your name first using 'name <your name>'")
            }
            ServerMessage::EnteringChat(room) => write!(f, "{}{}", ENTERING_CHAT_PREFIX, room),
            ServerMessage::ExitedChat => write!(f, "{}", EXITED_CHAT),
            ServerMessage::ChatLine { from, text } => write!(f, "{}: {}", from, text),
            ServerMessage::ExitNotice { name, room } => {
                write!(f, "{} has exited chat room {}", name, room)
            }
            ServerMessage::Usage(keyword) => write!(f, "{}", keyword.usage()),
            ServerMessage::InvalidCommand => write!(f, "Invalid command"),
            ServerMessage::Bye => write!(f, "Connection closed. Bye!"),
            ServerMessage::ServerFull => write!(f, "Server is full. Try again later."),
        }
    }
}

impl ServerMessage {
    pub async fn write_to_stream<W>(
        &self,
        writer: &mut LineWriter<W>,
    ) -> Result<(), Box<dyn Error + Send + Sync>>
    where
        W: AsyncWrite + Unpin,
    {
        writer.send(self.to_string()).await?;

        Ok(())
    }
}
