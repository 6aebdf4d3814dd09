//! Slash commands typed at the chat prompt.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Plain text to send to the agent.
    Say(String),
    /// `/new`: forget the session and start over.
    New,
    /// `/reconnect`
    Reconnect,
    /// `/provider <id>` selects, bare `/provider` goes back to the default.
    Provider(Option<String>),
    /// `/providers`
    Providers,
    /// `/status`
    Status,
    /// `/help`
    Help,
    /// `/quit` or `/exit`
    Quit,
    Unknown(String),
}

pub const HELP: &str = "\
Commands:
  /new               start a new chat (forgets the current session)
  /reconnect         reconnect to the gateway now
  /provider [id]     use a provider for new messages (no id: gateway default)
  /providers         list providers known to the gateway
  /status            show gateway status
  /help              show this help
  /quit              leave";

impl ChatCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Self::Say(line.to_string());
        };

        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or("");
        let arg = parts.next().map(String::from);

        match name {
            "new" | "clear" => Self::New,
            "reconnect" => Self::Reconnect,
            "provider" => Self::Provider(arg),
            "providers" => Self::Providers,
            "status" => Self::Status,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            _ => Self::Unknown(line.to_string()),
        }
    }
}
