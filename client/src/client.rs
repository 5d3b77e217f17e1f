use anyhow::{Context, anyhow};
use crds_shared::{
    MAX_SERVER_LINE_LENGTH,
    received_line::{LineReader, ReceivedLine, line_reader},
    server_message::{ENTERING_CHAT_PREFIX, LineWriter, ServerMessage, line_writer},
};
use futures::SinkExt;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, stdin},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
};

use crate::{
    chat_mode::{ChatExit, ChatMode},
    cli_display::CliDisplay,
};

pub type ServerReader = LineReader<OwnedReadHalf>;
pub type ServerWriter = LineWriter<OwnedWriteHalf>;

pub struct Client;

impl Client {
    pub async fn run(server_addr: &str, port: u16) -> anyhow::Result<()> {
        let server_tcp_addr = format!("{}:{}", server_addr, port);

        let tcp_stream = TcpStream::connect(&server_tcp_addr)
            .await
            .with_context(|| format!("Error connecting to CRDS at {}", server_tcp_addr))?;
        CliDisplay::print_connected_message(&server_tcp_addr);

        let (reader, writer) = tcp_stream.into_split();
        let mut reader = line_reader(reader, MAX_SERVER_LINE_LENGTH);
        let mut writer = line_writer(writer);
        let mut input = BufReader::new(stdin()).lines();

        Self::session(&mut input, &mut reader, &mut writer).await
    }

    /// Sends one command per input line and prints the single reply, switching
    /// to chat mode when the server confirms a room.
    pub async fn session<I>(
        input: &mut Lines<I>,
        reader: &mut ServerReader,
        writer: &mut ServerWriter,
    ) -> anyhow::Result<()>
    where
        I: AsyncBufRead + Unpin,
    {
        loop {
            CliDisplay::print_prompt();

            let command = match input.next_line().await? {
                Some(command) => command.trim().to_string(),
                None => return Ok(()),
            };

            if command.is_empty() {
                continue;
            }

            writer.send(command.as_str()).await?;

            let response = match read_line(reader).await? {
                ReceivedLine::EOF => {
                    CliDisplay::print_server_closed();
                    return Ok(());
                }
                ReceivedLine::Line(response) => response,
            };

            CliDisplay::print_server_line(&response);

            if response == ServerMessage::Bye.to_string() {
                return Ok(());
            }

            if response.starts_with(ENTERING_CHAT_PREFIX) {
                match ChatMode::run(input, reader, writer, CliDisplay::print_server_line).await? {
                    ChatExit::Exited => CliDisplay::print_exiting_chat_mode(),
                    ChatExit::Disconnected => {
                        CliDisplay::print_server_closed();
                        return Ok(());
                    }
                }
            }
        }
    }
}

pub async fn read_line(reader: &mut ServerReader) -> anyhow::Result<ReceivedLine> {
    ReceivedLine::read_from_stream(reader)
        .await
        .map_err(|e| anyhow!(e))
}
