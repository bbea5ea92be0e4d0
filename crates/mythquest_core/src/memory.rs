//! crates/mythquest_core/src/memory.rs
//!
//! An in-memory `StateStore` used by the test suites and available for local
//! runs without a database. Same last-write-wins contract as the Postgres
//! store.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::ports::{PortError, PortResult, StateStore};

type Entries = HashMap<(Uuid, String), Value>;

#[derive(Debug, Default)]
pub struct MemoryStateStore {
    entries: Mutex<Entries>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> PortResult<MutexGuard<'_, Entries>> {
        self.entries
            .lock()
            .map_err(|_| PortError::Unexpected("state store lock poisoned".to_string()))
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn read(&self, user_id: Uuid, key: &str) -> PortResult<Option<Value>> {
        Ok(self.lock()?.get(&(user_id, key.to_string())).cloned())
    }

    async fn write(&self, user_id: Uuid, key: &str, value: Value) -> PortResult<()> {
        self.lock()?.insert((user_id, key.to_string()), value);
        Ok(())
    }

    async fn remove(&self, user_id: Uuid, key: &str) -> PortResult<()> {
        self.lock()?.remove(&(user_id, key.to_string()));
        Ok(())
    }

    async fn clear(&self, user_id: Uuid) -> PortResult<()> {
        self.lock()?.retain(|(owner, _), _| *owner != user_id);
        Ok(())
    }
}
