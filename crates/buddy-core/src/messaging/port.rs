use std::time::Duration;

use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageId, MessageRef},
    messaging::types::{MessagingCapabilities, SentPoll, Update, UpdateKind},
    Result,
};

/// Outbound side of the messaging platform.
///
/// Telegram is the implementation today; fakes implement it in tests.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        reply_to: Option<MessageId>,
    ) -> Result<MessageRef>;

    /// Send a non-anonymous, single-answer poll.
    async fn send_poll(
        &self,
        chat_id: ChatId,
        question: &str,
        choices: &[String],
    ) -> Result<SentPoll>;
}

/// Inbound side: long-polled update retrieval.
#[async_trait]
pub trait UpdateSource: Send + Sync {
    /// Fetch updates with id >= `offset`, waiting up to `timeout` for one.
    ///
    /// A competing consumer must surface as [`crate::Error::Conflict`].
    async fn fetch_updates(
        &self,
        offset: i64,
        timeout: Duration,
        allowed: &[UpdateKind],
    ) -> Result<Vec<Update>>;

    /// Drop any push subscription (webhook) that competes with long polling.
    async fn clear_pending_subscription(&self) -> Result<()>;
}
