use core::error::Error;
use std::sync::Arc;

use crds_shared::{
    MAX_COMMAND_LENGTH,
    received_line::{ReceivedLine, line_reader},
    server_message::{LineWriter, line_writer},
};
use log::debug;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::{
    command_handler::{CommandHandler, Flow},
    connection_registry::{ConnectionId, ConnectionRegistry, OutboxReceiver},
    room_directory::RoomDirectory,
};

pub struct ConnectionHandler;

impl ConnectionHandler {
    /// Runs one connection until `bye`, end of stream, or a transport error.
    /// Replies and room pushes share the writer, so lines never interleave.
    pub async fn handle_stream<S>(
        stream: S,
        id: ConnectionId,
        mut outbox_rx: OutboxReceiver,
        directory: Arc<RoomDirectory>,
        registry: Arc<ConnectionRegistry>,
    ) -> Result<(), Box<dyn Error + Send + Sync>>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let (reader, writer) = tokio::io::split(stream);
        let mut reader = line_reader(reader, MAX_COMMAND_LENGTH);
        let mut writer = line_writer(writer);

        let mut command_handler = CommandHandler::new(id, directory, registry);

        loop {
            tokio::select! {
                biased;

                Some(pushed) = outbox_rx.recv() => {
                    pushed.write_to_stream(&mut writer).await?;
                }

                result = ReceivedLine::read_from_stream(&mut reader) => {

                    let line = match result? {
                        ReceivedLine::EOF => return Ok(()),
                        ReceivedLine::Line(line) => line,
                    };

                    let dispatch = command_handler.handle_line(&line).await;

                    // room lines queued while the command ran go out ahead of its reply
                    Self::flush_outbox(&mut outbox_rx, &mut writer).await?;

                    if let Some(reply) = dispatch.reply {
                        reply.write_to_stream(&mut writer).await?;
                    }

                    if dispatch.flow == Flow::Close {
                        debug!("{} leaving while {:?}", id, command_handler.state());
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn flush_outbox<W>(
        outbox_rx: &mut OutboxReceiver,
        writer: &mut LineWriter<W>,
    ) -> Result<(), Box<dyn Error + Send + Sync>>
    where
        W: AsyncWrite + Unpin,
    {
        while let Ok(pushed) = outbox_rx.try_recv() {
            pushed.write_to_stream(writer).await?;
        }

        Ok(())
    }
}
