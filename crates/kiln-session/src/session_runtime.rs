use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use kiln_ai::{ChatRequest, LlmClient, Message, MessageRole};
use kiln_memory::{
    ConversationMessage, ConversationRole, ConversationSnapshotStore, ConversationStore,
};
use kiln_safety::{
    compose_final_reply, extract_directives, is_urgent_content, requires_response, sanitize_reply,
    ActivityTracker, EscalationConfig, GatingConfig,
};

use crate::session_commands::{parse_admin_command, AdminCommand};
use crate::session_render::render_history_dump;

/// Fixed cooldown notice for throttled senders.
pub const THROTTLE_NOTICE: &str =
    "You're sending messages too quickly. Please wait a moment before trying again.";

/// Fixed apology when the primary and fallback generation calls both fail.
pub const GENERATION_FAILURE_NOTICE: &str =
    "I'm having trouble processing your request right now. Please try again later.";

const CLEARED_NOTICE: &str = "Conversation history cleared.";
const NOTHING_TO_CLEAR_NOTICE: &str = "No conversation history to clear.";

#[derive(Debug, Clone)]
/// One inbound chat event as delivered by the transport.
pub struct InboundMessage {
    pub channel_id: String,
    pub author_id: String,
    pub author_is_bot: bool,
    pub content: String,
}

#[async_trait]
/// Outbound side of the chat platform. `send_typing` is best-effort; `reply`
/// failures propagate to the transport loop.
pub trait ChatTransport: Send + Sync {
    async fn send_typing(&self, channel_id: &str) -> Result<()>;
    async fn reply(&self, channel_id: &str, text: &str) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Terminal state of one handled inbound message.
pub enum TurnOutcome {
    IgnoredChannel,
    IgnoredBot,
    HistoryCleared,
    HistoryShown,
    Throttled,
    NoResponseNeeded,
    Suppressed,
    Replied { escalated: bool },
    GenerationFailed,
}

#[derive(Debug, Clone)]
/// Session-level settings consumed per inbound message.
pub struct SessionRuntimeConfig {
    pub watched_channel_id: String,
    pub support_role_id: String,
    pub primary_model: String,
    pub fallback_model: Option<String>,
    pub system_primer: String,
    pub clear_command: String,
    pub history_command: String,
    pub history_char_budget: usize,
    pub show_typing: bool,
    pub log_conversations: bool,
    pub gating: GatingConfig,
    pub escalation: EscalationConfig,
}

/// Owns the per-channel conversation state machine: admin commands, throttle,
/// transcript recording, gating, generation with one fallback, directive
/// handling, sanitization, escalation, and delivery — one inbound message at
/// a time.
pub struct SupportSessionRuntime {
    config: SessionRuntimeConfig,
    conversations: ConversationStore,
    activity: ActivityTracker,
    snapshot: ConversationSnapshotStore,
    client: Arc<dyn LlmClient>,
}

impl SupportSessionRuntime {
    pub fn new(
        config: SessionRuntimeConfig,
        conversations: ConversationStore,
        activity: ActivityTracker,
        snapshot: ConversationSnapshotStore,
        client: Arc<dyn LlmClient>,
    ) -> Self {
        Self {
            config,
            conversations,
            activity,
            snapshot,
            client,
        }
    }

    /// Loads the persisted snapshot into the conversation store, replacing
    /// live state. Returns the number of restored conversations.
    pub fn load_persisted(&mut self) -> Result<usize> {
        let conversations = self
            .snapshot
            .load()
            .context("failed to load conversation snapshot")?;
        let count = conversations.len();
        self.conversations.replace_all(conversations);
        Ok(count)
    }

    /// Writes the current conversation map to disk. Called by the periodic
    /// save task, on termination signals, and immediately after a clear.
    pub fn flush_snapshot(&self) -> Result<()> {
        self.snapshot.save(self.conversations.snapshot_view())
    }

    pub fn conversation_count(&self) -> usize {
        self.conversations.len()
    }

    /// Bounded transcript for a channel, as of now.
    pub fn channel_history(&self, channel_id: &str) -> Vec<ConversationMessage> {
        self.conversations.history(channel_id, Utc::now())
    }

    pub async fn handle_message(
        &mut self,
        event: &InboundMessage,
        transport: &dyn ChatTransport,
    ) -> Result<TurnOutcome> {
        if event.channel_id != self.config.watched_channel_id {
            return Ok(TurnOutcome::IgnoredChannel);
        }
        if event.author_is_bot {
            return Ok(TurnOutcome::IgnoredBot);
        }

        let now = Utc::now();

        if let Some(command) = parse_admin_command(
            &event.content,
            &self.config.clear_command,
            &self.config.history_command,
        ) {
            return self.handle_admin_command(command, event, now, transport).await;
        }

        // The limiter is consulted before this message's own timestamp lands,
        // and the timestamp is recorded in both branches: throttled traffic
        // still counts, but a sender only trips the limit once the window
        // already holds a full threshold of earlier messages.
        let now_ms = now.timestamp_millis().max(0) as u64;
        let throttled = self.activity.is_rate_limited(&event.author_id, now_ms);
        self.activity.record(&event.author_id, now_ms);
        if throttled {
            debug!(author_id = %event.author_id, "sender throttled");
            transport.reply(&event.channel_id, THROTTLE_NOTICE).await?;
            return Ok(TurnOutcome::Throttled);
        }

        // Unconditional: the transcript stays faithful whether or not a reply
        // is produced.
        self.conversations
            .record_user_message(&event.channel_id, &event.author_id, &event.content, now);
        if self.config.log_conversations {
            info!(author_id = %event.author_id, content = %event.content, "user message");
        }

        if !requires_response(&event.content, &self.config.gating) {
            return Ok(TurnOutcome::NoResponseNeeded);
        }

        if self.config.show_typing {
            if let Err(error) = transport.send_typing(&event.channel_id).await {
                debug!(%error, "typing indicator failed");
            }
        }

        let history =
            self.conversations
                .history_with_primer(&event.channel_id, &self.config.system_primer, now);
        let generated = match self.generate_reply(history).await {
            Ok(text) => text,
            Err(error) => {
                warn!(%error, channel_id = %event.channel_id, "generation failed");
                transport
                    .reply(&event.channel_id, GENERATION_FAILURE_NOTICE)
                    .await?;
                return Ok(TurnOutcome::GenerationFailed);
            }
        };

        let directives = extract_directives(&generated);
        if directives.suppress_response {
            // Suppress wins over ping: a suppressed turn is never delivered
            // and therefore never escalated.
            debug!(channel_id = %event.channel_id, "generator suppressed the reply");
            return Ok(TurnOutcome::Suppressed);
        }

        let sanitized = sanitize_reply(&directives.cleaned_text);
        self.conversations
            .record_assistant_message(&event.channel_id, &sanitized, Utc::now());
        if self.config.log_conversations {
            info!(content = %sanitized, "assistant message");
        }

        let burst = self.activity.is_escalation_burst(&event.author_id, now_ms);
        let urgent = is_urgent_content(&event.content, &self.config.escalation);
        let escalate = burst || urgent || directives.ping_support;
        if escalate {
            info!(
                burst,
                urgent,
                directive = directives.ping_support,
                author_id = %event.author_id,
                "reply escalated to support"
            );
        }

        let final_text = compose_final_reply(&sanitized, escalate, &self.config.support_role_id);
        transport.reply(&event.channel_id, &final_text).await?;
        Ok(TurnOutcome::Replied {
            escalated: escalate,
        })
    }

    async fn handle_admin_command(
        &mut self,
        command: AdminCommand,
        event: &InboundMessage,
        now: DateTime<Utc>,
        transport: &dyn ChatTransport,
    ) -> Result<TurnOutcome> {
        match command {
            AdminCommand::ClearHistory => {
                let removed = self.conversations.clear(&event.channel_id);
                // Clearing is strong user intent that must survive a crash:
                // flush now instead of waiting for the timer.
                if let Err(error) = self.flush_snapshot() {
                    warn!(%error, "post-clear snapshot write failed");
                }
                let notice = if removed {
                    CLEARED_NOTICE
                } else {
                    NOTHING_TO_CLEAR_NOTICE
                };
                transport.reply(&event.channel_id, notice).await?;
                Ok(TurnOutcome::HistoryCleared)
            }
            AdminCommand::ShowHistory => {
                let history = self.conversations.history(&event.channel_id, now);
                let dump = render_history_dump(&history, self.config.history_char_budget);
                transport.reply(&event.channel_id, &dump).await?;
                Ok(TurnOutcome::HistoryShown)
            }
        }
    }

    /// One call to the primary model, then at most one to the configured
    /// fallback. Raw provider errors never reach the chat surface.
    async fn generate_reply(&self, history: Vec<ConversationMessage>) -> Result<String> {
        let messages: Vec<Message> = history.iter().map(to_chat_message).collect();

        let primary_request = ChatRequest {
            model: self.config.primary_model.clone(),
            messages: messages.clone(),
            max_tokens: None,
            temperature: None,
        };
        let primary_error = match self.client.complete(primary_request).await {
            Ok(response) => return Ok(response.message.content),
            Err(error) => error,
        };

        let Some(fallback_model) = self
            .config
            .fallback_model
            .as_deref()
            .map(str::trim)
            .filter(|model| !model.is_empty())
        else {
            return Err(primary_error)
                .context("primary generation failed and no fallback model is configured");
        };

        warn!(
            error = %primary_error,
            fallback_model,
            "primary generation failed, attempting fallback model"
        );
        let fallback_request = ChatRequest {
            model: fallback_model.to_string(),
            messages,
            max_tokens: None,
            temperature: None,
        };
        let response = self
            .client
            .complete(fallback_request)
            .await
            .with_context(|| format!("fallback generation with {fallback_model} failed"))?;
        Ok(response.message.content)
    }
}

fn to_chat_message(message: &ConversationMessage) -> Message {
    let role = match message.role {
        ConversationRole::System => MessageRole::System,
        ConversationRole::User => MessageRole::User,
        ConversationRole::Assistant => MessageRole::Assistant,
    };
    Message {
        role,
        content: message.content.clone(),
    }
}
