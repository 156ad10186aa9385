use crate::domain::{ChatId, MessageId, MessageRef, PollId, UserId};

/// One inbound notification, acknowledged by its `update_id`.
#[derive(Clone, Debug)]
pub struct Update {
    pub update_id: i64,
    pub event: InboundEvent,
}

/// Cross-messenger incoming event model.
///
/// Telegram-specific fields live in the Telegram adapter.
#[derive(Clone, Debug)]
pub enum InboundEvent {
    Command(CommandMessage),
    /// Plain text; handled only when it mentions the bot or replies to it.
    Message(TextMessage),
    PollAnswer(PollAnswer),
    /// A kind the core does not act on (still acknowledged).
    Unsupported,
}

/// Where a message was posted. Channel posts only route commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    Chat,
    Channel,
}

#[derive(Clone, Debug)]
pub struct CommandMessage {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub origin: Origin,
    pub sender: Option<UserId>,
    /// Full text including the leading `/`.
    pub text: String,
}

#[derive(Clone, Debug)]
pub struct TextMessage {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub origin: Origin,
    pub sender: Option<UserId>,
    pub text: String,
    pub reply_to: Option<RepliedMessage>,
}

/// The message a [`TextMessage`] replies to.
#[derive(Clone, Debug)]
pub struct RepliedMessage {
    pub sender: Option<UserId>,
    pub text: Option<String>,
}

#[derive(Clone, Debug)]
pub struct PollAnswer {
    pub poll_id: PollId,
    pub voter: Option<UserId>,
    pub option_ids: Vec<usize>,
}

/// Update categories requested from the platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateKind {
    Message,
    ChannelPost,
    PollAnswer,
}

/// The categories the update loop asks for.
pub const ALLOWED_UPDATES: [UpdateKind; 3] = [
    UpdateKind::Message,
    UpdateKind::ChannelPost,
    UpdateKind::PollAnswer,
];

/// Result of a successful poll send.
#[derive(Clone, Debug)]
pub struct SentPoll {
    pub message: MessageRef,
    pub poll_id: PollId,
}

/// Capabilities / feature flags of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub supports_polls: bool,
    pub max_message_len: usize,
}
