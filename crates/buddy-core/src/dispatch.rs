//! Per-event routing: poll answers, commands, mentions/replies.

use std::{sync::Arc, time::Duration};

use tracing::{debug, info, warn};

use crate::{
    broadcast::BroadcastScheduler,
    commands::{parse_command, BotCommand},
    config::Config,
    destinations::DestinationSet,
    domain::{BotIdentity, ChatId},
    errors::Error,
    generation::{generate_bounded, generate_quiz, TextGenerator},
    messaging::{
        chunking::send_chunked,
        port::MessagingPort,
        types::{CommandMessage, InboundEvent, Origin, PollAnswer, TextMessage},
    },
    polls::PollRegistry,
    prompts::{self, chat_prompt, help_text, word_quiz_prompt},
    utils::{bounded, mentions, strip_mention},
    Result,
};

#[derive(Clone, Debug)]
pub struct DispatchSettings {
    pub chat_timeout: Duration,
    pub quiz_timeout: Duration,
    pub send_timeout: Duration,
    pub message_limit: usize,
    pub bot_creator: Option<String>,
}

impl From<&Config> for DispatchSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            chat_timeout: cfg.chat_timeout,
            quiz_timeout: cfg.quiz_timeout,
            send_timeout: cfg.send_timeout,
            message_limit: cfg.telegram_message_limit,
            bot_creator: cfg.bot_creator.clone(),
        }
    }
}

pub struct Dispatcher {
    identity: BotIdentity,
    messenger: Arc<dyn MessagingPort>,
    generator: Arc<dyn TextGenerator>,
    polls: Arc<PollRegistry>,
    destinations: Arc<DestinationSet>,
    broadcaster: Arc<BroadcastScheduler>,
    settings: DispatchSettings,
}

impl Dispatcher {
    pub fn new(
        identity: BotIdentity,
        messenger: Arc<dyn MessagingPort>,
        generator: Arc<dyn TextGenerator>,
        polls: Arc<PollRegistry>,
        destinations: Arc<DestinationSet>,
        broadcaster: Arc<BroadcastScheduler>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            identity,
            messenger,
            generator,
            polls,
            destinations,
            broadcaster,
            settings,
        }
    }

    /// Handle one event. Failures are logged; nothing propagates to the loop.
    pub async fn dispatch(&self, event: InboundEvent) {
        let res = match event {
            InboundEvent::PollAnswer(answer) => self.handle_poll_answer(answer).await,
            InboundEvent::Command(cmd) => self.handle_command(cmd).await,
            InboundEvent::Message(msg) => self.handle_message(msg).await,
            InboundEvent::Unsupported => Ok(()),
        };
        if let Err(e) = res {
            warn!(error = %e, "event handling failed");
        }
    }

    async fn handle_poll_answer(&self, answer: PollAnswer) -> Result<()> {
        let Some(pending) = self.polls.take(&answer.poll_id).await else {
            debug!(poll_id = %answer.poll_id, "answer for unknown or already revealed poll");
            return Ok(());
        };

        info!(
            poll_id = %answer.poll_id,
            chat_id = pending.destination.0,
            voter = answer.voter.map(|u| u.0),
            "revealing quiz answer"
        );
        self.send(
            pending.destination,
            &pending.reveal_text(),
            Some(pending.anchor),
        )
        .await
    }

    async fn handle_command(&self, cmd: CommandMessage) -> Result<()> {
        let parsed = parse_command(&cmd.text);
        if !parsed.is_for(&self.identity.username) {
            debug!(command = %parsed.name, "command addressed to another bot");
            return Ok(());
        }

        let chat_id = cmd.chat_id;
        info!(
            chat_id = chat_id.0,
            sender = cmd.sender.map(|u| u.0),
            command = %parsed.name,
            "command"
        );

        match parsed.command() {
            BotCommand::Start => self.reply(chat_id, prompts::START_MSG).await,
            BotCommand::Help => {
                let text = help_text(
                    &self.identity.username,
                    self.settings.bot_creator.as_deref(),
                );
                self.reply(chat_id, &text).await
            }
            BotCommand::Activate => {
                let text = if self.destinations.enable(chat_id).await {
                    prompts::ACTIVATED_MSG
                } else {
                    prompts::ALREADY_ACTIVE_MSG
                };
                self.reply(chat_id, text).await
            }
            BotCommand::Deactivate => {
                let text = if self.destinations.disable(chat_id).await {
                    prompts::DEACTIVATED_MSG
                } else {
                    prompts::NOT_ACTIVE_MSG
                };
                self.reply(chat_id, text).await
            }
            BotCommand::Quiz { word: None } => self.reply(chat_id, prompts::QUIZ_USAGE_MSG).await,
            BotCommand::Quiz { word: Some(word) } => self.quiz_for_chat(chat_id, &word).await,
            BotCommand::Broadcast => self.broadcast_now(chat_id).await,
            BotCommand::Unknown(_) => self.reply(chat_id, prompts::UNKNOWN_COMMAND_MSG).await,
        }
    }

    async fn quiz_for_chat(&self, chat_id: ChatId, word: &str) -> Result<()> {
        let quiz = generate_quiz(
            self.generator.as_ref(),
            &word_quiz_prompt(word),
            self.settings.quiz_timeout,
        )
        .await;

        match quiz {
            Ok(quiz) => {
                if let Err(e) = self.broadcaster.send_quiz(chat_id, &quiz).await {
                    warn!(chat_id = chat_id.0, error = %e, "failed to send ad-hoc quiz");
                    return self.reply(chat_id, prompts::QUIZ_SEND_FAILED_MSG).await;
                }
                Ok(())
            }
            Err(e) => self.reply(chat_id, &failure_text(&e)).await,
        }
    }

    async fn broadcast_now(&self, chat_id: ChatId) -> Result<()> {
        let text = match self.broadcaster.tick().await {
            Ok(report) if report.attempted == 0 => {
                "No chats have quizzes activated.".to_string()
            }
            Ok(report) => format!(
                "📣 Quiz sent to {} of {} chats ({} failed).",
                report.delivered,
                report.attempted,
                report.failed.len()
            ),
            Err(e) => failure_text(&e),
        };
        self.reply(chat_id, &text).await
    }

    async fn handle_message(&self, msg: TextMessage) -> Result<()> {
        if msg.origin == Origin::Channel {
            return Ok(());
        }

        let handle = &self.identity.username;
        let replies_to_bot = msg
            .reply_to
            .as_ref()
            .and_then(|r| r.sender)
            .is_some_and(|s| s == self.identity.user_id);
        if !mentions(&msg.text, handle) && !replies_to_bot {
            return Ok(());
        }

        let mut parts = vec![strip_mention(&msg.text, handle)];
        if let Some(quoted) = msg.reply_to.as_ref().and_then(|r| r.text.as_deref()) {
            parts.push(quoted.trim().to_string());
        }
        let question = parts
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");
        if question.is_empty() {
            return Ok(());
        }

        let answer = match generate_bounded(
            self.generator.as_ref(),
            &chat_prompt(&question),
            self.settings.chat_timeout,
        )
        .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(chat_id = msg.chat_id.0, error = %e, "chat generation failed");
                prompts::GENERATION_ERROR_MSG.to_string()
            }
        };

        // The configured limit never exceeds what the platform accepts.
        let limit = self
            .settings
            .message_limit
            .min(self.messenger.capabilities().max_message_len);
        send_chunked(
            self.messenger.as_ref(),
            msg.chat_id,
            &answer,
            Some(msg.message_id),
            limit,
            self.settings.send_timeout,
        )
        .await?;
        Ok(())
    }

    async fn reply(&self, chat_id: ChatId, text: &str) -> Result<()> {
        self.send(chat_id, text, None).await
    }

    async fn send(
        &self,
        chat_id: ChatId,
        text: &str,
        reply_to: Option<crate::domain::MessageId>,
    ) -> Result<()> {
        bounded(
            self.settings.send_timeout,
            "sendMessage",
            self.messenger.send_text(chat_id, text, reply_to),
        )
        .await?;
        Ok(())
    }
}

/// User-facing text for a failed quiz request.
fn failure_text(err: &Error) -> String {
    match err {
        Error::Quiz(q) => format!("I couldn't build a quiz: {q}"),
        _ => prompts::GENERATION_ERROR_MSG.to_string(),
    }
}
