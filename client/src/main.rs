mod chat_mode;
mod cli_display;
mod client;

use clap::Parser;
use crds_shared::DIRECTORY_PORT;

use crate::client::Client;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short, long, default_value = "127.0.0.1")]
    server_address: String,

    #[arg(short, long, default_value_t = DIRECTORY_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = Client::run(&args.server_address, args.port).await {
        eprintln!("{:#}", e);
    }
}
