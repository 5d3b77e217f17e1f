use std::io::{Write, stdout};

pub const PROMPT_STR: &str = "Enter command: ";

pub struct CliDisplay;

impl CliDisplay {
    pub fn print_connected_message(server_addr: &str) {
        println!("Connected to CRDS at {}.", server_addr);
    }

    pub fn print_prompt() {
        let mut stdout = stdout();
        let _ = write!(stdout, "{}", PROMPT_STR);
        let _ = stdout.flush();
    }

    pub fn print_server_line(line: &str) {
        println!("{}", line);
    }

    pub fn print_exiting_chat_mode() {
        println!("Exiting chat mode...");
    }

    pub fn print_server_closed() {
        println!("Server closed the connection.");
    }
}
