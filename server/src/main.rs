mod command_handler;
mod connection_handler;
mod connection_registry;
mod directory_server;
mod relay;
mod room_directory;

use clap::Parser;
use crds_shared::DIRECTORY_PORT;
use log::{error, info};

use crate::directory_server::DirectoryServer;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(short, long, default_value_t = DIRECTORY_PORT)]
    port: u16,

    /// Connections served at once; extra ones are told the server is full.
    #[arg(short, long, default_value_t = 1024)]
    max_connections: usize,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let tcp_addr = format!("{}:{}", args.host, args.port);

    let server = match DirectoryServer::bind(tcp_addr.clone(), args.max_connections).await {
        Ok(server) => server,
        Err(e) => {
            error!("Error binding: {}", e);
            return;
        }
    };

    info!(
        "Chat Room Directory Server listening on {} (max {} connections)",
        tcp_addr, args.max_connections
    );

    if let Err(e) = server.listen().await {
        error!("{}", e);
    }
}
