pub mod command;
pub mod command_keyword;
pub mod received_line;
pub mod server_message;

use std::net::Ipv4Addr;

pub const DIRECTORY_PORT: u16 = 12345;

/// Longest line the server accepts from a client.
pub const MAX_COMMAND_LENGTH: usize = 1024;

/// Longest line a client accepts from the server. A `getdir` reply grows
/// with the directory, so this is far above [`MAX_COMMAND_LENGTH`].
pub const MAX_SERVER_LINE_LENGTH: usize = 1 << 20;

pub const MULTICAST_RANGE: (Ipv4Addr, Ipv4Addr) =
    (Ipv4Addr::new(239, 0, 0, 0), Ipv4Addr::new(239, 255, 255, 255));

/// Parses a dotted-quad address and accepts it only inside [`MULTICAST_RANGE`].
pub fn parse_room_address(address: &str) -> Option<Ipv4Addr> {
    let address: Ipv4Addr = address.parse().ok()?;

    if address < MULTICAST_RANGE.0 || address > MULTICAST_RANGE.1 {
        return None;
    }

    Some(address)
}

/// Parses a port in `1..=65535`.
pub fn parse_room_port(port: &str) -> Option<u16> {
    match port.parse::<u16>() {
        Ok(0) | Err(_) => None,
        Ok(port) => Some(port),
    }
}
