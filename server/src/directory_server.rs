use core::error::Error;
use std::{io, net::SocketAddr, sync::Arc, time::Duration};

use crds_shared::server_message::{ServerMessage, line_writer};
use log::{error, info, warn};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpListener,
    sync::Semaphore,
    time::timeout,
};

use crate::{
    connection_handler::ConnectionHandler,
    connection_registry::{ConnectionRegistry, outbox},
    room_directory::RoomDirectory,
};

const REJECT_TIMEOUT: Duration = Duration::from_millis(100);

pub struct DirectoryServer {
    tcp_listener: TcpListener,
    directory: Arc<RoomDirectory>,
    registry: Arc<ConnectionRegistry>,
    admission: Arc<Semaphore>,
}

impl DirectoryServer {
    pub async fn bind(tcp_addr: String, max_connections: usize) -> Result<Self, Box<dyn Error>> {
        Ok(Self {
            tcp_listener: TcpListener::bind(tcp_addr).await?,
            directory: Arc::new(RoomDirectory::new()),
            registry: Arc::new(ConnectionRegistry::new()),
            admission: Arc::new(Semaphore::new(max_connections)),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.tcp_listener.local_addr()
    }

    pub async fn listen(self) -> Result<(), Box<dyn Error + Send + Sync>> {
        loop {
            let (tcp_socket, peer) = match self.tcp_listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    continue;
                }
            };

            let permit = match self.admission.clone().try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => {
                    warn!("Rejecting {}: connection limit reached", peer);
                    Self::reject(tcp_socket).await;
                    continue;
                }
            };

            let directory = self.directory.clone();
            let registry = self.registry.clone();

            tokio::spawn(async move {
                Self::serve_connection(tcp_socket, peer, directory, registry).await;
                drop(permit);
            });
        }
    }

    /// Registers the connection, runs its handler, then releases whatever the
    /// connection held. The release runs once whether the handler returned,
    /// failed, or panicked.
    pub async fn serve_connection<S>(
        stream: S,
        peer: SocketAddr,
        directory: Arc<RoomDirectory>,
        registry: Arc<ConnectionRegistry>,
    ) where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (outbox, outbox_rx) = outbox();
        let id = registry.register(outbox).await;
        info!("Connection {} from {}", id, peer);

        let handler = tokio::spawn(ConnectionHandler::handle_stream(
            stream,
            id,
            outbox_rx,
            directory,
            registry.clone(),
        ));

        match handler.await {
            Ok(Ok(())) => (),
            Ok(Err(e)) => error!("Error handling connection {}: {}", id, e),
            Err(e) => error!("Handler for connection {} aborted: {}", id, e),
        }

        if let Some(departure) = registry.release(id).await {
            info!(
                "Connection {} from {} closed (name: {:?}, room: {:?}, {} still connected)",
                id,
                peer,
                departure.name,
                departure.room,
                registry.len().await
            );
        }
    }

    /// Tells an over-limit peer the server is full and closes it, waiting at
    /// most [`REJECT_TIMEOUT`] so a stalled peer cannot hold up the accept loop.
    async fn reject<S>(stream: S)
    where
        S: AsyncWrite + Unpin,
    {
        let mut writer = line_writer(stream);

        match timeout(REJECT_TIMEOUT, ServerMessage::ServerFull.write_to_stream(&mut writer)).await {
            Ok(Ok(())) => (),
            Ok(Err(e)) => warn!("Error rejecting connection: {}", e),
            Err(_) => warn!("Timed out rejecting connection"),
        }
    }
}
