use core::error::Error;

use futures::StreamExt;
use tokio::io::AsyncRead;
use tokio_util::codec::{FramedRead, LinesCodec};

pub type LineReader<R> = FramedRead<R, LinesCodec>;

/// Servers read with [`crate::MAX_COMMAND_LENGTH`], clients with
/// [`crate::MAX_SERVER_LINE_LENGTH`].
pub fn line_reader<R: AsyncRead>(reader: R, max_length: usize) -> LineReader<R> {
    FramedRead::new(reader, LinesCodec::new_with_max_length(max_length))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceivedLine {
    EOF,
    Line(String),
}

impl ReceivedLine {
    /// Cancel safe, so it can sit in a `select!` arm.
    pub async fn read_from_stream<R>(
        reader: &mut LineReader<R>,
    ) -> Result<ReceivedLine, Box<dyn Error + Send + Sync>>
    where
        R: AsyncRead + Unpin,
    {
        match reader.next().await {
            None => Ok(ReceivedLine::EOF),
            Some(Ok(line)) => Ok(ReceivedLine::Line(line)),
            Some(Err(e)) => Err(e.into()),
        }
    }
}
