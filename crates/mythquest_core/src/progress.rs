//! crates/mythquest_core/src/progress.rs
//!
//! Per-user quest progress: how many levels of each character's quiz have
//! been completed. The ledger only ever moves up; the one way down is a full
//! reset, which wipes the user's whole state.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::ports::{PortError, PortResult, StateStore};

/// Storage key for the serialized ledger under a user's state.
pub const PROGRESS_KEY: &str = "progress";

/// Completed-level counts keyed by character id. Absent entries read as 0.
/// Serializes as a flat `{"character_id": levels}` object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgressLedger {
    completed: BTreeMap<String, u32>,
}

impl ProgressLedger {
    pub fn completed_levels(&self, character_id: &str) -> u32 {
        self.completed.get(character_id).copied().unwrap_or(0)
    }

    /// Merges a completed level, keeping the larger of old and new. Returns
    /// the value now stored. Values beyond a character's level count are
    /// kept as-is; they can only come from mis-authored content.
    pub fn record(&mut self, character_id: &str, level: u32) -> u32 {
        let entry = self.completed.entry(character_id.to_string()).or_insert(0);
        *entry = (*entry).max(level);
        *entry
    }

    pub fn is_empty(&self) -> bool {
        self.completed.is_empty()
    }
}

/// A `StateStore`-backed view of user ledgers. Reads never fail: store errors
/// and corrupt JSON both degrade to the empty ledger with a warning.
#[derive(Clone)]
pub struct ProgressStore {
    store: Arc<dyn StateStore>,
}

impl ProgressStore {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// The persisted ledger, or the default when nothing valid is stored.
    pub async fn load(&self, user_id: Uuid) -> ProgressLedger {
        let value = match self.store.read(user_id, PROGRESS_KEY).await {
            Ok(Some(value)) => value,
            Ok(None) => return ProgressLedger::default(),
            Err(e) => {
                warn!("failed to read progress for {user_id}: {e}; using defaults");
                return ProgressLedger::default();
            }
        };
        match serde_json::from_value(value) {
            Ok(ledger) => ledger,
            Err(e) => {
                warn!("corrupt progress ledger for {user_id}: {e}; discarding it");
                ProgressLedger::default()
            }
        }
    }

    pub async fn completed_levels(&self, user_id: Uuid, character_id: &str) -> u32 {
        self.load(user_id).await.completed_levels(character_id)
    }

    /// Records a level completion and writes the ledger through immediately.
    /// Returns the stored value, which may be a pre-existing larger one.
    pub async fn record_completion(
        &self,
        user_id: Uuid,
        character_id: &str,
        level: u32,
    ) -> PortResult<u32> {
        let mut ledger = self.load(user_id).await;
        let stored = ledger.record(character_id, level);
        let value = serde_json::to_value(&ledger)
            .map_err(|e| PortError::Unexpected(format!("serialize progress ledger: {e}")))?;
        self.store.write(user_id, PROGRESS_KEY, value).await?;
        Ok(stored)
    }

    /// Wipes all of the user's stored state: the ledger and every chat
    /// transcript. There is no partial reset.
    pub async fn reset(&self, user_id: Uuid) -> PortResult<()> {
        self.store.clear(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStateStore;
    use serde_json::json;

    fn progress_store() -> (ProgressStore, Arc<MemoryStateStore>) {
        let store = Arc::new(MemoryStateStore::new());
        (ProgressStore::new(store.clone()), store)
    }

    #[tokio::test]
    async fn progress_defaults_to_zero() {
        let (progress, _) = progress_store();
        let levels = progress.completed_levels(Uuid::new_v4(), "arjuna").await;
        assert_eq!(levels, 0);
    }

    #[tokio::test]
    async fn completions_only_move_up() {
        let (progress, _) = progress_store();
        let user = Uuid::new_v4();

        assert_eq!(progress.record_completion(user, "arjuna", 3).await.unwrap(), 3);
        assert_eq!(progress.record_completion(user, "arjuna", 1).await.unwrap(), 3);
        assert_eq!(progress.completed_levels(user, "arjuna").await, 3);
        assert_eq!(progress.record_completion(user, "arjuna", 5).await.unwrap(), 5);
        assert_eq!(progress.completed_levels(user, "arjuna").await, 5);
    }

    #[tokio::test]
    async fn completions_are_written_through() {
        let (progress, store) = progress_store();
        let user = Uuid::new_v4();

        progress.record_completion(user, "bhima", 2).await.unwrap();

        // A second view over the same store sees the persisted value.
        let reloaded = ProgressStore::new(store).completed_levels(user, "bhima").await;
        assert_eq!(reloaded, 2);
    }

    #[tokio::test]
    async fn characters_are_tracked_independently() {
        let (progress, _) = progress_store();
        let user = Uuid::new_v4();

        progress.record_completion(user, "arjuna", 4).await.unwrap();
        progress.record_completion(user, "karna", 1).await.unwrap();

        assert_eq!(progress.completed_levels(user, "arjuna").await, 4);
        assert_eq!(progress.completed_levels(user, "karna").await, 1);
        assert_eq!(progress.completed_levels(user, "draupadi").await, 0);
    }

    #[tokio::test]
    async fn corrupt_ledger_degrades_to_default() {
        let (progress, store) = progress_store();
        let user = Uuid::new_v4();

        store
            .write(user, PROGRESS_KEY, json!("not a ledger"))
            .await
            .unwrap();

        assert_eq!(progress.completed_levels(user, "arjuna").await, 0);

        // Recording over the corrupt value replaces it with a clean ledger.
        progress.record_completion(user, "arjuna", 1).await.unwrap();
        assert_eq!(progress.completed_levels(user, "arjuna").await, 1);
    }

    #[tokio::test]
    async fn reset_clears_progress_and_chat_state() {
        let (progress, store) = progress_store();
        let user = Uuid::new_v4();

        progress.record_completion(user, "arjuna", 8).await.unwrap();
        store
            .write(user, "chat:arjuna", json!({"messages": []}))
            .await
            .unwrap();

        progress.reset(user).await.unwrap();

        assert_eq!(progress.completed_levels(user, "arjuna").await, 0);
        assert_eq!(store.read(user, "chat:arjuna").await.unwrap(), None);
    }
}
