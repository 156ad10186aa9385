//! Telegram adapter (teloxide).
//!
//! Implements the `buddy-core` MessagingPort and UpdateSource over the Telegram
//! Bot API, and converts raw Telegram updates into core events.

use std::time::Duration;

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{AllowedUpdate, Message, UpdateKind as TgUpdateKind},
    ApiError, RequestError,
};

use tokio::time::sleep;

pub mod router;

use buddy_core::{
    domain::{ChatId, MessageId, MessageRef, PollId, UserId},
    errors::Error,
    messaging::{
        port::{MessagingPort, UpdateSource},
        types::{
            CommandMessage, InboundEvent, MessagingCapabilities, Origin, PollAnswer,
            RepliedMessage, SentPoll, TextMessage, Update, UpdateKind,
        },
    },
    Result,
};

/// A bot whose HTTP client lets a `getUpdates` long poll run its full course.
///
/// teloxide's default client gives up after 17s, well short of a 60s long
/// poll; `request_timeout` must cover the long-poll wait plus some grace.
pub fn long_polling_bot(token: impl Into<String>, request_timeout: Duration) -> Result<Bot> {
    let client = teloxide::net::default_reqwest_settings()
        .timeout(request_timeout)
        .build()
        .map_err(|e| Error::External(format!("telegram client build error: {e}")))?;
    Ok(Bot::with_client(token, client))
}

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    fn map_err(e: RequestError) -> Error {
        if is_conflict(&e) {
            return Error::Conflict(e.to_string());
        }
        Error::External(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

/// Another consumer is long-polling (or a webhook is set) for the same token.
fn is_conflict(e: &RequestError) -> bool {
    match e {
        RequestError::Api(ApiError::TerminatedByOtherGetUpdates) => true,
        other => other.to_string().contains("Conflict"),
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            supports_polls: true,
            max_message_len: 4096,
        }
    }

    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        reply_to: Option<MessageId>,
    ) -> Result<MessageRef> {
        let msg = self
            .with_retry(|| {
                let req = self.bot.send_message(Self::tg_chat(chat_id), text.to_string());
                match reply_to {
                    Some(id) => req.reply_to_message_id(Self::tg_msg_id(id)),
                    None => req,
                }
            })
            .await?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn send_poll(
        &self,
        chat_id: ChatId,
        question: &str,
        choices: &[String],
    ) -> Result<SentPoll> {
        let msg = self
            .with_retry(|| {
                self.bot
                    .send_poll(Self::tg_chat(chat_id), question.to_string(), choices.to_vec())
                    .is_anonymous(false)
                    .allows_multiple_answers(false)
            })
            .await?;

        let poll_id = msg
            .poll()
            .map(|p| PollId(p.id.clone()))
            .ok_or_else(|| Error::External("sendPoll returned a message without a poll".into()))?;

        Ok(SentPoll {
            message: MessageRef {
                chat_id,
                message_id: MessageId(msg.id.0),
            },
            poll_id,
        })
    }
}

#[async_trait]
impl UpdateSource for TelegramMessenger {
    async fn fetch_updates(
        &self,
        offset: i64,
        timeout: Duration,
        allowed: &[UpdateKind],
    ) -> Result<Vec<Update>> {
        let offset = i32::try_from(offset)
            .map_err(|_| Error::External(format!("update offset {offset} out of range")))?;
        let timeout_secs = u32::try_from(timeout.as_secs()).unwrap_or(u32::MAX);
        let allowed: Vec<AllowedUpdate> = allowed.iter().map(|k| tg_allowed(*k)).collect();

        // No RetryAfter loop here: the update loop owns retry policy.
        let updates = self
            .bot
            .get_updates()
            .offset(offset)
            .timeout(timeout_secs)
            .allowed_updates(allowed)
            .await
            .map_err(Self::map_err)?;

        Ok(updates.into_iter().map(convert_update).collect())
    }

    async fn clear_pending_subscription(&self) -> Result<()> {
        self.bot
            .delete_webhook()
            .drop_pending_updates(false)
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }
}

fn tg_allowed(kind: UpdateKind) -> AllowedUpdate {
    match kind {
        UpdateKind::Message => AllowedUpdate::Message,
        UpdateKind::ChannelPost => AllowedUpdate::ChannelPost,
        UpdateKind::PollAnswer => AllowedUpdate::PollAnswer,
    }
}

/// Map a raw Telegram update onto the core event model.
pub fn convert_update(update: teloxide::types::Update) -> Update {
    let update_id = i64::from(update.id);
    let event = match update.kind {
        TgUpdateKind::Message(msg) => convert_message(&msg, Origin::Chat),
        TgUpdateKind::ChannelPost(msg) => convert_message(&msg, Origin::Channel),
        TgUpdateKind::PollAnswer(answer) => InboundEvent::PollAnswer(PollAnswer {
            poll_id: PollId(answer.poll_id),
            voter: Some(UserId(answer.user.id.0 as i64)),
            option_ids: answer
                .option_ids
                .iter()
                .filter_map(|&i| usize::try_from(i).ok())
                .collect(),
        }),
        _ => InboundEvent::Unsupported,
    };
    Update { update_id, event }
}

fn convert_message(msg: &Message, origin: Origin) -> InboundEvent {
    let Some(text) = msg.text() else {
        return InboundEvent::Unsupported;
    };

    let chat_id = ChatId(msg.chat.id.0);
    let message_id = MessageId(msg.id.0);
    let sender = msg.from().map(|u| UserId(u.id.0 as i64));

    if text.starts_with('/') {
        return InboundEvent::Command(CommandMessage {
            chat_id,
            message_id,
            origin,
            sender,
            text: text.to_string(),
        });
    }

    let reply_to = msg.reply_to_message().map(|r| RepliedMessage {
        sender: r.from().map(|u| UserId(u.id.0 as i64)),
        text: r.text().or_else(|| r.caption()).map(str::to_string),
    });

    InboundEvent::Message(TextMessage {
        chat_id,
        message_id,
        origin,
        sender,
        text: text.to_string(),
        reply_to,
    })
}
