use std::collections::{hash_map::Entry, HashMap};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::conversation::{Conversation, ConversationMessage, ConversationRole};

#[derive(Debug, Clone, Copy)]
/// Bounds for per-channel conversation memory.
pub struct MemoryConfig {
    pub max_messages: usize,
    pub expiry_ms: i64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_messages: 15,
            expiry_ms: 30 * 60 * 1_000,
        }
    }
}

#[derive(Debug)]
/// In-memory map from channel id to its bounded conversation.
///
/// Single-owner state: the session runtime is the only mutator, so no
/// internal locking. Disk durability is the snapshot store's job.
pub struct ConversationStore {
    config: MemoryConfig,
    conversations: HashMap<String, Conversation>,
}

impl ConversationStore {
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            config,
            conversations: HashMap::new(),
        }
    }

    pub fn record_user_message(
        &mut self,
        channel_id: &str,
        author_id: &str,
        content: &str,
        now: DateTime<Utc>,
    ) {
        debug!(channel_id, author_id, "recording user message");
        self.push_message(channel_id, ConversationRole::User, content, now);
    }

    pub fn record_assistant_message(
        &mut self,
        channel_id: &str,
        content: &str,
        now: DateTime<Utc>,
    ) {
        self.push_message(channel_id, ConversationRole::Assistant, content, now);
    }

    /// Bounded history for a channel. Missing or expired conversations read
    /// as empty; reads never mutate the store.
    pub fn history(&self, channel_id: &str, now: DateTime<Utc>) -> Vec<ConversationMessage> {
        match self.conversations.get(channel_id) {
            Some(conversation) if !conversation.is_expired(now, self.config.expiry_ms) => {
                conversation.messages.clone()
            }
            _ => Vec::new(),
        }
    }

    /// History with one synthetic system turn prepended. The primer is never
    /// stored as part of the conversation.
    pub fn history_with_primer(
        &self,
        channel_id: &str,
        primer: &str,
        now: DateTime<Utc>,
    ) -> Vec<ConversationMessage> {
        let history = self.history(channel_id, now);
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ConversationMessage {
            role: ConversationRole::System,
            content: primer.to_string(),
            timestamp: now,
        });
        messages.extend(history);
        messages
    }

    /// Removes a channel's conversation entirely. The caller must follow a
    /// successful clear with an immediate snapshot write.
    pub fn clear(&mut self, channel_id: &str) -> bool {
        let removed = self.conversations.remove(channel_id).is_some();
        if removed {
            debug!(channel_id, "conversation cleared");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Read-only view for the snapshot layer.
    pub fn snapshot_view(&self) -> &HashMap<String, Conversation> {
        &self.conversations
    }

    /// Bulk hand-off from a loaded snapshot, replacing all live state.
    pub fn replace_all(&mut self, conversations: HashMap<String, Conversation>) {
        self.conversations = conversations;
    }

    fn push_message(
        &mut self,
        channel_id: &str,
        role: ConversationRole,
        content: &str,
        now: DateTime<Utc>,
    ) {
        let max_messages = self.config.max_messages;
        let conversation = self.get_or_create(channel_id, now);
        conversation.messages.push(ConversationMessage {
            role,
            content: content.to_string(),
            timestamp: now,
        });
        if conversation.messages.len() > max_messages {
            let overflow = conversation.messages.len() - max_messages;
            conversation.messages.drain(0..overflow);
        }
        conversation.last_updated = now;
    }

    /// Live unexpired conversation for the channel, or a fresh one installed
    /// in its place. Expiry is a hard cutoff: the predecessor's messages are
    /// discarded, never extended.
    fn get_or_create(&mut self, channel_id: &str, now: DateTime<Utc>) -> &mut Conversation {
        let expiry_ms = self.config.expiry_ms;
        match self.conversations.entry(channel_id.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired(now, expiry_ms) {
                    occupied.insert(Conversation::new(now));
                }
                occupied.into_mut()
            }
            Entry::Vacant(vacant) => vacant.insert(Conversation::new(now)),
        }
    }
}
