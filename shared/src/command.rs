use crate::command_keyword::CommandKeyword;

/// One inbound line, classified without regard to the connection's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    GetDir,
    MakeRoom {
        name: String,
        address: String,
        port: String,
    },
    DeleteRoom {
        name: String,
    },
    Name {
        name: String,
    },
    Chat {
        room: String,
    },
    Bye,
    ExitChat,
    /// A known keyword with the wrong number of arguments.
    Usage(CommandKeyword),
    /// Anything that is not a command: chat payload in a room, invalid elsewhere.
    Text(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let parts: Vec<&str> = line.split_whitespace().collect();

        let keyword = match parts.first().and_then(|first| first.parse::<CommandKeyword>().ok()) {
            Some(keyword) => keyword,
            None => return Command::Text(line.to_string()),
        };

        let args = &parts[1..];

        if args.len() != keyword.arity() {
            // `bye everyone` or `^E ok` in a room is chat, not a malformed command
            if keyword.arity() == 0 {
                return Command::Text(line.to_string());
            }
            return Command::Usage(keyword);
        }

        match keyword {
            CommandKeyword::GetDir => Command::GetDir,
            CommandKeyword::MakeRoom => Command::MakeRoom {
                name: args[0].to_string(),
                address: args[1].to_string(),
                port: args[2].to_string(),
            },
            CommandKeyword::DeleteRoom => Command::DeleteRoom {
                name: args[0].to_string(),
            },
            CommandKeyword::Name => Command::Name {
                name: args[0].to_string(),
            },
            CommandKeyword::Chat => Command::Chat {
                room: args[0].to_string(),
            },
            CommandKeyword::Bye => Command::Bye,
            CommandKeyword::ExitChat => Command::ExitChat,
        }
    }
}
