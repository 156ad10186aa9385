//! Bot command parsing.

/// Commands recognized at the boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Help,
    /// Opt the chat in to scheduled quizzes.
    Activate,
    /// Opt the chat out.
    Deactivate,
    /// Ad-hoc quiz for this chat; the word is required.
    Quiz { word: Option<String> },
    /// Run a broadcast right now.
    Broadcast,
    Unknown(String),
}

/// A parsed `/name@target args` line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedCommand {
    pub name: String,
    /// Bot handle after `@`, if the command was addressed explicitly.
    pub target: Option<String>,
    pub args: String,
}

/// Telegram may send `/cmd@botname arg1 ...`.
pub fn parse_command(text: &str) -> ParsedCommand {
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let args = parts.next().unwrap_or("").trim().to_string();

    let mut head = first.trim_start_matches('/').splitn(2, '@');
    let name = head.next().unwrap_or("").to_lowercase();
    let target = head.next().filter(|t| !t.is_empty()).map(|t| t.to_string());

    ParsedCommand { name, target, args }
}

impl ParsedCommand {
    /// `false` when the command names a different bot.
    pub fn is_for(&self, handle: &str) -> bool {
        match &self.target {
            None => true,
            Some(t) => t.eq_ignore_ascii_case(handle),
        }
    }

    pub fn command(&self) -> BotCommand {
        match self.name.as_str() {
            "start" => BotCommand::Start,
            "help" => BotCommand::Help,
            "activate" => BotCommand::Activate,
            "deactivate" => BotCommand::Deactivate,
            "quiz" => BotCommand::Quiz {
                word: self.args.split_whitespace().next().map(|w| w.to_string()),
            },
            "broadcast" => BotCommand::Broadcast,
            other => BotCommand::Unknown(other.to_string()),
        }
    }
}
