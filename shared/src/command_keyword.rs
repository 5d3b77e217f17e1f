use strum_macros::{AsRefStr, Display, EnumString};

#[derive(Debug, PartialEq, Eq, Clone, Copy, EnumString, Display, AsRefStr)]
pub enum CommandKeyword {
    #[strum(serialize = "getdir")]
    GetDir,
    #[strum(serialize = "makeroom")]
    MakeRoom,
    #[strum(serialize = "deleteroom")]
    DeleteRoom,
    #[strum(serialize = "name")]
    Name,
    #[strum(serialize = "chat")]
    Chat,
    #[strum(serialize = "bye")]
    Bye,
    #[strum(serialize = "^E")]
    ExitChat,
}

impl CommandKeyword {
    /// Number of arguments following the keyword.
    pub fn arity(&self) -> usize {
        match &self {
            CommandKeyword::GetDir => 0,
            CommandKeyword::MakeRoom => 3,
            CommandKeyword::DeleteRoom => 1,
            CommandKeyword::Name => 1,
            CommandKeyword::Chat => 1,
            CommandKeyword::Bye => 0,
            CommandKeyword::ExitChat => 0,
        }
    }

    pub fn usage(&self) -> &'static str {
        match &self {
            CommandKeyword::GetDir => "Usage: getdir",
            CommandKeyword::MakeRoom => "Usage: makeroom <chat room name> <address> <port>",
            CommandKeyword::DeleteRoom => "Usage: deleteroom <chat room name>",
            CommandKeyword::Name => "Usage: name <your name>",
            CommandKeyword::Chat => "Usage: chat <chat room name>",
            CommandKeyword::Bye => "Usage: bye",
            CommandKeyword::ExitChat => "Usage: ^E",
        }
    }
}
