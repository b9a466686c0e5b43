//! End-to-end flows through the session runtime with the default
//! configuration values, a scripted generation client, and a recording
//! transport standing in for Discord.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex as AsyncMutex;

use kiln_ai::{ChatRequest, ChatResponse, ChatUsage, KilnAiError, LlmClient, Message};
use kiln_memory::{ConversationSnapshotStore, ConversationStore, MemoryConfig};
use kiln_safety::{ActivityTracker, EscalationConfig, GatingConfig, RateLimitConfig};
use kiln_session::{
    ChatTransport, InboundMessage, SessionRuntimeConfig, SupportSessionRuntime, TurnOutcome,
    THROTTLE_NOTICE,
};

const CHANNEL: &str = "555000111";
const SUPPORT_ROLE: &str = "777000999";

struct ScriptedClient {
    responses: AsyncMutex<VecDeque<ChatResponse>>,
}

impl ScriptedClient {
    fn new(texts: &[&str]) -> Self {
        let responses = texts
            .iter()
            .map(|text| ChatResponse {
                message: Message::assistant(*text),
                finish_reason: Some("STOP".to_string()),
                usage: ChatUsage::default(),
            })
            .collect();
        Self {
            responses: AsyncMutex::new(responses),
        }
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn complete(&self, _request: ChatRequest) -> Result<ChatResponse, KilnAiError> {
        self.responses.lock().await.pop_front().ok_or_else(|| {
            KilnAiError::InvalidResponse("scripted response queue exhausted".to_string())
        })
    }
}

#[derive(Default)]
struct RecordingTransport {
    replies: AsyncMutex<Vec<String>>,
}

impl RecordingTransport {
    async fn replies(&self) -> Vec<String> {
        self.replies.lock().await.clone()
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_typing(&self, _channel_id: &str) -> Result<()> {
        Ok(())
    }

    async fn reply(&self, _channel_id: &str, text: &str) -> Result<()> {
        self.replies.lock().await.push(text.to_string());
        Ok(())
    }
}

fn default_runtime(snapshot_path: &Path, client: Arc<dyn LlmClient>) -> SupportSessionRuntime {
    let config = SessionRuntimeConfig {
        watched_channel_id: CHANNEL.to_string(),
        support_role_id: SUPPORT_ROLE.to_string(),
        primary_model: "gemini-2.0-flash-001".to_string(),
        fallback_model: Some("gemini-1.5-flash-001".to_string()),
        system_primer: "You are the hosting support assistant.".to_string(),
        clear_command: "!clear".to_string(),
        history_command: "!history".to_string(),
        history_char_budget: 100,
        show_typing: true,
        log_conversations: false,
        gating: GatingConfig::default(),
        escalation: EscalationConfig::default(),
    };
    SupportSessionRuntime::new(
        config,
        ConversationStore::new(MemoryConfig::default()),
        ActivityTracker::new(RateLimitConfig::default()),
        ConversationSnapshotStore::new(snapshot_path.to_path_buf()),
        client,
    )
}

fn chatter(author_id: &str, content: &str) -> InboundMessage {
    InboundMessage {
        channel_id: CHANNEL.to_string(),
        author_id: author_id.to_string(),
        author_is_bot: false,
        content: content.to_string(),
    }
}

#[tokio::test]
async fn the_sixteenth_rapid_message_is_the_first_one_throttled() {
    let tempdir = tempfile::tempdir().expect("tempdir");
    let mut runtime = default_runtime(
        &tempdir.path().join("conversations.json"),
        Arc::new(ScriptedClient::new(&[])),
    );
    let transport = RecordingTransport::default();

    for index in 0..15 {
        let outcome = runtime
            .handle_message(&chatter("user-7", &format!("spam {index}")), &transport)
            .await
            .expect("handle");
        assert_eq!(outcome, TurnOutcome::NoResponseNeeded, "message {index}");
    }

    let outcome = runtime
        .handle_message(&chatter("user-7", "spam 15"), &transport)
        .await
        .expect("handle");
    assert_eq!(outcome, TurnOutcome::Throttled);
    assert_eq!(transport.replies().await, vec![THROTTLE_NOTICE.to_string()]);
}

#[tokio::test]
async fn a_ten_message_burst_escalates_the_next_generated_reply() {
    let tempdir = tempfile::tempdir().expect("tempdir");
    let mut runtime = default_runtime(
        &tempdir.path().join("conversations.json"),
        Arc::new(ScriptedClient::new(&["Here is what I found."])),
    );
    let transport = RecordingTransport::default();

    // Nine rapid messages that need no reply, then a tenth that does: ten
    // timestamps inside the 30s burst window, still under the throttle limit.
    for index in 0..9 {
        let outcome = runtime
            .handle_message(&chatter("user-9", &format!("spam {index}")), &transport)
            .await
            .expect("handle");
        assert_eq!(outcome, TurnOutcome::NoResponseNeeded);
    }

    let outcome = runtime
        .handle_message(&chatter("user-9", "how do I fix this"), &transport)
        .await
        .expect("handle");

    assert_eq!(outcome, TurnOutcome::Replied { escalated: true });
    let replies = transport.replies().await;
    assert_eq!(
        replies[0],
        format!("<@&{SUPPORT_ROLE}> (escalated to human support)\n\nHere is what I found.")
    );
}

#[tokio::test]
async fn snapshots_round_trip_across_process_restarts() {
    let tempdir = tempfile::tempdir().expect("tempdir");
    let snapshot_path = tempdir.path().join("conversations.json");
    let transport = RecordingTransport::default();

    let mut runtime = default_runtime(
        &snapshot_path,
        Arc::new(ScriptedClient::new(&["Try restarting from the panel."])),
    );
    runtime
        .handle_message(&chatter("user-1", "how do I restart"), &transport)
        .await
        .expect("handle");
    runtime.flush_snapshot().expect("flush");
    let saved_history = runtime.channel_history(CHANNEL);
    assert_eq!(saved_history.len(), 2);

    let mut restored = default_runtime(&snapshot_path, Arc::new(ScriptedClient::new(&[])));
    let count = restored.load_persisted().expect("load");
    assert_eq!(count, 1);
    assert_eq!(restored.channel_history(CHANNEL), saved_history);
}
