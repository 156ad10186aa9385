use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::{
    domain::{ChatId, MessageId, MessageRef},
    messaging::{
        port::MessagingPort,
        types::{MessagingCapabilities, SentPoll},
    },
    Result,
};

#[derive(Clone, Copy, Debug)]
pub struct ThrottleConfig {
    /// Minimum spacing between any two outbound calls.
    pub global_min_interval: Duration,
    /// Minimum spacing between calls to the same chat.
    pub per_chat_min_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            global_min_interval: Duration::from_millis(40), // ~25/sec
            per_chat_min_interval: Duration::from_millis(1050), // ~0.95/sec
        }
    }
}

/// Claim the next free slot after `*next_free`; returns how long to wait for it.
fn claim_slot(next_free: &mut Instant, interval: Duration, now: Instant) -> Duration {
    let slot = (*next_free).max(now);
    *next_free = slot + interval;
    slot - now
}

/// MessagingPort decorator that spaces outbound calls.
///
/// An hourly broadcast fans out to every opted-in chat at once; spacing the
/// sends keeps that burst under Telegram's flood limits. It does not guarantee
/// zero 429s (the adapter still retries those once).
///
/// Only chats with a slot still in the future are tracked, so the per-chat
/// table shrinks back once a fan-out has drained.
pub struct ThrottledMessenger {
    inner: Arc<dyn MessagingPort>,
    cfg: ThrottleConfig,
    global_next: Mutex<Instant>,
    chat_next: Mutex<HashMap<ChatId, Instant>>,
}

impl ThrottledMessenger {
    pub fn new(inner: Arc<dyn MessagingPort>, cfg: ThrottleConfig) -> Self {
        Self {
            inner,
            cfg,
            global_next: Mutex::new(Instant::now()),
            chat_next: Mutex::new(HashMap::new()),
        }
    }

    async fn wait_turn(&self, chat_id: ChatId) {
        let now = Instant::now();
        let global_wait = {
            let mut next = self.global_next.lock().await;
            claim_slot(&mut next, self.cfg.global_min_interval, now)
        };
        let chat_wait = {
            let mut table = self.chat_next.lock().await;
            table.retain(|_, next| *next > now);
            let next = table.entry(chat_id).or_insert(now);
            claim_slot(next, self.cfg.per_chat_min_interval, now)
        };

        let wait = global_wait.max(chat_wait);
        if !wait.is_zero() {
            sleep(wait).await;
        }
    }

    #[cfg(test)]
    async fn tracked_chats(&self) -> usize {
        self.chat_next.lock().await.len()
    }
}

#[async_trait::async_trait]
impl MessagingPort for ThrottledMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        self.inner.capabilities()
    }

    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        reply_to: Option<MessageId>,
    ) -> Result<MessageRef> {
        self.wait_turn(chat_id).await;
        self.inner.send_text(chat_id, text, reply_to).await
    }

    async fn send_poll(
        &self,
        chat_id: ChatId,
        question: &str,
        choices: &[String],
    ) -> Result<SentPoll> {
        self.wait_turn(chat_id).await;
        self.inner.send_poll(chat_id, question, choices).await
    }
}
