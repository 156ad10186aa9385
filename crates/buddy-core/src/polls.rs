//! In-flight quiz polls awaiting their first answer.

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use tokio::sync::Mutex;

use crate::{
    domain::{ChatId, MessageId, PollId},
    quiz::Quiz,
};

/// What is needed to reveal the answer of a poll once someone votes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingPoll {
    pub destination: ChatId,
    /// The poll message itself; the reveal is sent as a reply to it.
    pub anchor: MessageId,
    correct_index: usize,
    answer: String,
    created_at: Instant,
}

impl PendingPoll {
    /// Built from a validated quiz, so `correct_index` is always in bounds.
    pub fn new(destination: ChatId, anchor: MessageId, quiz: &Quiz) -> Self {
        Self::at(destination, anchor, quiz, Instant::now())
    }

    pub fn at(destination: ChatId, anchor: MessageId, quiz: &Quiz, created_at: Instant) -> Self {
        Self {
            destination,
            anchor,
            correct_index: quiz.correct_index(),
            answer: quiz.correct_choice().to_string(),
            created_at,
        }
    }

    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    /// Text of the correct choice.
    pub fn answer(&self) -> &str {
        &self.answer
    }

    /// "✅ The correct answer is option 2: foo"
    pub fn reveal_text(&self) -> String {
        format!(
            "✅ The correct answer is option {}: {}",
            self.correct_index + 1,
            self.answer
        )
    }
}

/// Poll id → pending poll, behind its own lock.
///
/// The lock is only held for map operations, never across a platform call.
#[derive(Default)]
pub struct PollRegistry {
    inner: Mutex<HashMap<PollId, PendingPoll>>,
}

impl PollRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, poll_id: PollId, poll: PendingPoll) {
        self.inner.lock().await.insert(poll_id, poll);
    }

    /// Remove and return the entry. A second call for the same id yields `None`,
    /// which is what makes a reveal happen at most once.
    pub async fn take(&self, poll_id: &PollId) -> Option<PendingPoll> {
        self.inner.lock().await.remove(poll_id)
    }

    pub async fn get(&self, poll_id: &PollId) -> Option<PendingPoll> {
        self.inner.lock().await.get(poll_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }

    /// Drop polls older than `ttl`. Returns how many were evicted.
    pub async fn evict_expired(&self, now: Instant, ttl: Duration) -> usize {
        let mut map = self.inner.lock().await;
        let before = map.len();
        map.retain(|_, p| now.saturating_duration_since(p.created_at) < ttl);
        before - map.len()
    }
}
