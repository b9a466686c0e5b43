use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use kiln_core::write_text_atomic;

use crate::conversation::Conversation;

const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct ConversationSnapshot {
    schema_version: u32,
    #[serde(default)]
    conversations: BTreeMap<String, Conversation>,
}

#[derive(Debug, Clone)]
/// Durable snapshot of every conversation as one keyed JSON document.
///
/// Loaded once at startup and overwritten wholesale on each save; a missing
/// file reads as an empty document. Writes go through the atomic text
/// helper so readers never observe partial state.
pub struct ConversationSnapshotStore {
    path: PathBuf,
}

impl ConversationSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<HashMap<String, Conversation>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }

        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read snapshot file {}", self.path.display()))?;
        let snapshot = serde_json::from_str::<ConversationSnapshot>(&raw)
            .with_context(|| format!("failed to parse snapshot file {}", self.path.display()))?;

        if snapshot.schema_version != SNAPSHOT_SCHEMA_VERSION {
            bail!(
                "unsupported conversation snapshot schema: expected {}, found {}",
                SNAPSHOT_SCHEMA_VERSION,
                snapshot.schema_version
            );
        }

        Ok(snapshot.conversations.into_iter().collect())
    }

    pub fn save(&self, conversations: &HashMap<String, Conversation>) -> Result<()> {
        let snapshot = ConversationSnapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            conversations: conversations
                .iter()
                .map(|(channel_id, conversation)| (channel_id.clone(), conversation.clone()))
                .collect(),
        };

        let mut payload = serde_json::to_string_pretty(&snapshot)
            .context("failed to serialize conversation snapshot")?;
        payload.push('\n');
        write_text_atomic(&self.path, &payload)
            .with_context(|| format!("failed to write snapshot file {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, Utc};

    use crate::conversation::{ConversationMessage, ConversationRole};
    use crate::store::{ConversationStore, MemoryConfig};

    use super::*;

    fn base_time() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).expect("timestamp")
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let store = ConversationSnapshotStore::new(tempdir.path().join("conversations.json"));
        assert!(store.load().expect("load").is_empty());
    }

    #[test]
    fn save_then_load_round_trips_channels_messages_and_timestamps() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let snapshot_store =
            ConversationSnapshotStore::new(tempdir.path().join("conversations.json"));

        let mut store = ConversationStore::new(MemoryConfig::default());
        store.record_user_message("alpha", "user-1", "is my server down?", base_time());
        store.record_assistant_message(
            "alpha",
            "It looks healthy from here.",
            base_time() + Duration::seconds(2),
        );
        store.record_user_message("beta", "user-2", "how do I add a plugin", base_time());

        snapshot_store.save(store.snapshot_view()).expect("save");
        let loaded = snapshot_store.load().expect("load");

        assert_eq!(loaded.len(), 2);
        let alpha = loaded.get("alpha").expect("alpha conversation");
        assert_eq!(alpha.messages.len(), 2);
        assert_eq!(alpha.messages[0].role, ConversationRole::User);
        assert_eq!(alpha.messages[0].content, "is my server down?");
        assert_eq!(alpha.messages[0].timestamp, base_time());
        assert_eq!(alpha.last_updated, base_time() + Duration::seconds(2));
        assert_eq!(loaded.get("beta").expect("beta").messages.len(), 1);
    }

    #[test]
    fn schema_version_mismatch_is_rejected() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("conversations.json");
        std::fs::write(&path, r#"{"schema_version": 99, "conversations": {}}"#).expect("write");

        let store = ConversationSnapshotStore::new(path);
        let error = store.load().expect_err("schema mismatch");
        assert!(error.to_string().contains("unsupported"));
    }

    #[test]
    fn save_overwrites_the_previous_document() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let snapshot_store =
            ConversationSnapshotStore::new(tempdir.path().join("conversations.json"));

        let mut first = HashMap::new();
        first.insert(
            "stale".to_string(),
            Conversation {
                messages: vec![ConversationMessage {
                    role: ConversationRole::User,
                    content: "old".to_string(),
                    timestamp: base_time(),
                }],
                last_updated: base_time(),
            },
        );
        snapshot_store.save(&first).expect("first save");

        snapshot_store.save(&HashMap::new()).expect("second save");
        assert!(snapshot_store.load().expect("load").is_empty());
    }
}
