use crds_shared::{
    command_keyword::CommandKeyword, received_line::ReceivedLine, server_message::EXITED_CHAT,
};
use futures::SinkExt;
use tokio::io::{AsyncBufRead, Lines};

use crate::client::{ServerReader, ServerWriter, read_line};

#[derive(Debug, PartialEq, Eq)]
pub enum ChatExit {
    Exited,
    Disconnected,
}

pub struct ChatMode;

impl ChatMode {
    /// Sends input lines as room messages while handing whatever the room
    /// pushes to `show`, until the server confirms `^E` or goes away.
    /// The confirmation itself is not shown.
    pub async fn run<I, F>(
        input: &mut Lines<I>,
        reader: &mut ServerReader,
        writer: &mut ServerWriter,
        mut show: F,
    ) -> anyhow::Result<ChatExit>
    where
        I: AsyncBufRead + Unpin,
        F: FnMut(&str),
    {
        let mut input_open = true;

        loop {
            tokio::select! {

                line = input.next_line(), if input_open => {
                    match line? {
                        Some(line) => writer.send(line.as_str()).await?,
                        None => {
                            input_open = false;
                            writer.send(CommandKeyword::ExitChat.as_ref()).await?;
                        }
                    }
                }

                received = read_line(reader) => {
                    match received? {
                        ReceivedLine::EOF => return Ok(ChatExit::Disconnected),
                        ReceivedLine::Line(line) if line == EXITED_CHAT => return Ok(ChatExit::Exited),
                        ReceivedLine::Line(line) => show(&line),
                    }
                }
            }
        }
    }
}
