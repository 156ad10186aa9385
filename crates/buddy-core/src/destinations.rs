//! Chats that opted in to scheduled quiz broadcasts.

use std::collections::HashSet;

use tokio::sync::Mutex;

use crate::domain::ChatId;

/// Presence means enabled; there is no "present but disabled" state.
#[derive(Default)]
pub struct DestinationSet {
    inner: Mutex<HashSet<ChatId>>,
}

impl DestinationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the chat was not already enabled.
    pub async fn enable(&self, chat_id: ChatId) -> bool {
        self.inner.lock().await.insert(chat_id)
    }

    /// Returns `true` if the chat was enabled before.
    pub async fn disable(&self, chat_id: ChatId) -> bool {
        self.inner.lock().await.remove(&chat_id)
    }

    pub async fn contains(&self, chat_id: ChatId) -> bool {
        self.inner.lock().await.contains(&chat_id)
    }

    /// Copy of the current members, sorted for a stable fan-out order.
    pub async fn snapshot(&self) -> Vec<ChatId> {
        let mut out: Vec<ChatId> = self.inner.lock().await.iter().copied().collect();
        out.sort();
        out
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}
