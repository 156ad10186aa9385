/// Telegram user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

/// Chat or channel id; the unit a broadcast is addressed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a sent message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// Platform-issued poll id. Only known once a poll send succeeds.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PollId(pub String);

impl std::fmt::Display for PollId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who the bot is on the platform; needed to spot mentions and replies.
#[derive(Clone, Debug)]
pub struct BotIdentity {
    pub user_id: UserId,
    /// Handle without the leading `@`.
    pub username: String,
}
