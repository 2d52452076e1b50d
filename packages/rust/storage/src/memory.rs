//! In-process [`ProfileStore`] with the same versioning rules as [`Storage`](crate::Storage).

use std::collections::HashMap;

use async_trait::async_trait;
use intake_shared::{CallRecord, CallerId, Result, StructuredProfile};
use tokio::sync::Mutex;

use crate::{ProfileStore, StoredProfile, UpsertOutcome};

#[derive(Default)]
pub struct MemoryStore {
    profiles: Mutex<HashMap<CallerId, StoredProfile>>,
    calls: Mutex<Vec<CallRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn get_profile(&self, caller: &CallerId) -> Result<Option<StoredProfile>> {
        Ok(self.profiles.lock().await.get(caller).cloned())
    }

    async fn upsert_profile(
        &self,
        caller: &CallerId,
        profile: &StructuredProfile,
        expected_version: Option<u64>,
    ) -> Result<UpsertOutcome> {
        let mut profiles = self.profiles.lock().await;
        let current = profiles.get(caller).map(|p| p.version);
        if current != expected_version {
            return Ok(UpsertOutcome::Conflict);
        }
        let version = current.map_or(1, |v| v + 1);
        profiles.insert(
            caller.clone(),
            StoredProfile {
                profile: profile.clone(),
                version,
            },
        );
        Ok(UpsertOutcome::Written { version })
    }

    async fn record_call(&self, record: &CallRecord) -> Result<()> {
        self.calls.lock().await.push(record.clone());
        Ok(())
    }

    async fn list_calls(&self, caller: &CallerId) -> Result<Vec<CallRecord>> {
        let mut calls: Vec<CallRecord> = self
            .calls
            .lock()
            .await
            .iter()
            .filter(|r| &r.caller == caller)
            .cloned()
            .collect();
        calls.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(calls)
    }
}
