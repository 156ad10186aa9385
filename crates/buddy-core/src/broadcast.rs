//! Hourly quiz broadcast to every opted-in chat.
//!
//! - Fires at the top of every hour (UTC)
//! - Generates one quiz per tick and sends it to each destination on its own
//! - A failed send is logged and skipped; the rest of the fan-out continues
//! - Each successful send registers its own pending poll

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    config::Config,
    destinations::DestinationSet,
    domain::ChatId,
    generation::{generate_quiz, TextGenerator},
    messaging::{port::MessagingPort, types::SentPoll},
    polls::{PendingPoll, PollRegistry},
    prompts::VOCABULARY_QUIZ_PROMPT,
    quiz::Quiz,
    utils::bounded,
    Error, Result,
};

#[derive(Clone, Debug)]
pub struct BroadcastSettings {
    pub quiz_timeout: Duration,
    pub send_timeout: Duration,
    pub poll_ttl: Option<Duration>,
}

impl From<&Config> for BroadcastSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            quiz_timeout: cfg.quiz_timeout,
            send_timeout: cfg.send_timeout,
            poll_ttl: cfg.poll_ttl,
        }
    }
}

/// Outcome of one fan-out.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: Vec<ChatId>,
}

pub struct BroadcastScheduler {
    generator: Arc<dyn TextGenerator>,
    messenger: Arc<dyn MessagingPort>,
    polls: Arc<PollRegistry>,
    destinations: Arc<DestinationSet>,
    settings: BroadcastSettings,
}

impl BroadcastScheduler {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        messenger: Arc<dyn MessagingPort>,
        polls: Arc<PollRegistry>,
        destinations: Arc<DestinationSet>,
        settings: BroadcastSettings,
    ) -> Self {
        Self {
            generator,
            messenger,
            polls,
            destinations,
            settings,
        }
    }

    /// One broadcast: no-op for an empty destination set, otherwise one quiz
    /// fanned out to every destination. Generation/parse failures abort the tick.
    pub async fn tick(&self) -> Result<BroadcastReport> {
        self.evict_expired_polls().await;

        let targets = self.destinations.snapshot().await;
        if targets.is_empty() {
            debug!("no active destinations, skipping broadcast");
            return Ok(BroadcastReport::default());
        }

        let quiz = generate_quiz(
            self.generator.as_ref(),
            VOCABULARY_QUIZ_PROMPT,
            self.settings.quiz_timeout,
        )
        .await?;

        Ok(self.broadcast(&quiz, &targets).await)
    }

    /// Send `quiz` to every target; never stops early.
    pub async fn broadcast(&self, quiz: &Quiz, targets: &[ChatId]) -> BroadcastReport {
        let mut report = BroadcastReport {
            attempted: targets.len(),
            ..Default::default()
        };

        for &chat_id in targets {
            match self.send_quiz(chat_id, quiz).await {
                Ok(_) => report.delivered += 1,
                Err(e) => {
                    warn!(chat_id = chat_id.0, error = %e, "failed to send quiz poll");
                    report.failed.push(chat_id);
                }
            }
        }

        info!(
            attempted = report.attempted,
            delivered = report.delivered,
            failed = report.failed.len(),
            "quiz broadcast finished"
        );
        report
    }

    /// Send one quiz poll and register it under the poll id the platform returned.
    pub async fn send_quiz(&self, chat_id: ChatId, quiz: &Quiz) -> Result<SentPoll> {
        if !self.messenger.capabilities().supports_polls {
            return Err(Error::External("messenger cannot send polls".to_string()));
        }

        let sent = bounded(
            self.settings.send_timeout,
            "sendPoll",
            self.messenger
                .send_poll(chat_id, quiz.question(), quiz.choices()),
        )
        .await?;

        self.polls
            .insert(
                sent.poll_id.clone(),
                PendingPoll::new(chat_id, sent.message.message_id, quiz),
            )
            .await;
        debug!(chat_id = chat_id.0, poll_id = %sent.poll_id, "registered pending poll");
        Ok(sent)
    }

    /// Timer entry point: failures are logged, never surfaced to a chat.
    pub async fn run_scheduled_tick(&self) -> Option<BroadcastReport> {
        match self.tick().await {
            Ok(report) => Some(report),
            Err(e) => {
                error!(error = %e, "scheduled broadcast abandoned");
                None
            }
        }
    }

    /// Run a scheduled tick at the top of every hour until `cancel` fires.
    pub fn spawn_hourly(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                let now = Utc::now();
                let next = next_top_of_hour(now);
                let dur = (next - now).to_std().unwrap_or(Duration::ZERO);
                debug!(next = %next, "next broadcast scheduled");

                tokio::select! {
                  _ = cancel.cancelled() => break,
                  _ = sleep(dur) => {
                    scheduler.run_scheduled_tick().await;
                  }
                }
            }
            info!("broadcast scheduler stopped");
        })
    }

    async fn evict_expired_polls(&self) {
        let Some(ttl) = self.settings.poll_ttl else {
            return;
        };
        let evicted = self.polls.evict_expired(Instant::now(), ttl).await;
        if evicted > 0 {
            info!(evicted, "dropped unanswered polls past their ttl");
        }
    }
}

/// The first full hour strictly after `now`.
pub fn next_top_of_hour(now: DateTime<Utc>) -> DateTime<Utc> {
    let hour = now.timestamp().div_euclid(3600);
    DateTime::<Utc>::from_timestamp((hour + 1) * 3600, 0)
        .unwrap_or_else(|| now + chrono::Duration::hours(1))
}
