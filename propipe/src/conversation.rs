//! Conversation identity and an optional in-memory totals store.
//!
//! Hosts that already keep per-session state can thread
//! [`ConversationTotals`] themselves and ignore this module.

use std::collections::HashMap;

use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use crate::accounting::ConversationTotals;
use crate::message::{Message, MessageRole};

const KEY_CHARS: usize = 50;

/// Stable id for the conversation `messages` belong to.
///
/// Derived from the user id and the first user message only, so it does not
/// change as the conversation grows.
#[must_use]
pub fn conversation_id(messages: &[Message], user_id: Option<&str>) -> String {
    let user_id = user_id.unwrap_or("unknown");
    let first = messages
        .iter()
        .find(|m| m.role == MessageRole::User)
        .map(|m| m.content.plain_text())
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| "no_message".to_owned());
    let key: String = first.chars().take(KEY_CHARS).collect();

    let digest = Sha256::digest(format!("{user_id}_{key}").as_bytes());
    let hash = hex::encode(digest);
    format!("conv_{user_id}_{}", &hash[..16])
}

/// Totals per conversation id, held in memory for the life of the process.
#[derive(Debug, Default)]
pub struct ConversationStore {
    totals: RwLock<HashMap<String, ConversationTotals>>,
}

impl ConversationStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Totals for `id`, zero for an unseen conversation.
    pub async fn get(&self, id: &str) -> ConversationTotals {
        self.totals.read().await.get(id).copied().unwrap_or_default()
    }

    /// Replace the totals for `id`.
    pub async fn put(&self, id: impl Into<String>, totals: ConversationTotals) {
        self.totals.write().await.insert(id.into(), totals);
    }

    /// Forget a conversation.
    pub async fn end(&self, id: &str) -> Option<ConversationTotals> {
        self.totals.write().await.remove(id)
    }

    /// Number of tracked conversations.
    pub async fn len(&self) -> usize {
        self.totals.read().await.len()
    }

    /// Whether no conversation is tracked.
    pub async fn is_empty(&self) -> bool {
        self.totals.read().await.is_empty()
    }
}
