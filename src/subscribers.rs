use std::collections::HashSet;

use teloxide::types::ChatId;
use tokio::sync::Mutex;

/// Chats that opted into recurring pushes. Kept in memory only, so the set
/// is empty again after a restart.
#[derive(Debug, Default)]
pub struct Subscribers {
    chats: Mutex<HashSet<ChatId>>,
}

impl Subscribers {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the chat was already subscribed.
    pub async fn subscribe(&self, chat_id: ChatId) -> bool {
        self.chats.lock().await.insert(chat_id)
    }

    /// Returns false if the chat was not subscribed.
    pub async fn unsubscribe(&self, chat_id: ChatId) -> bool {
        self.chats.lock().await.remove(&chat_id)
    }

    /// Snapshot sorted by id so deliveries happen in a stable order.
    pub async fn list(&self) -> Vec<ChatId> {
        let mut chats: Vec<ChatId> = self.chats.lock().await.iter().copied().collect();
        chats.sort_by_key(|c| c.0);
        chats
    }
}
