//! Stand-in for the external state container that owns Instance records
//! (spec.md §3: "this core only reads its `instance_id`, `status`,
//! `exports`, `last_status_update_ts` and writes a coarse `status` hint").

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use super::{NotFound, StoreError};
use crate::models::InstanceRecord;

#[async_trait]
pub trait InstanceStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<InstanceRecord, StoreError>;
    async fn save(&self, record: InstanceRecord) -> Result<(), StoreError>;

    /// Resolves `instance_name` to an id for Create Changeset's optional
    /// by-name lookup (spec.md §4.1). Name ownership lives in the external
    /// state container this core only reads from; the in-memory reference
    /// below always returns `None`.
    async fn find_id_by_name(&self, _name: &str) -> Result<Option<Uuid>, StoreError> {
        Ok(None)
    }
}

#[derive(Default)]
pub struct InMemoryInstanceStore {
    records: DashMap<Uuid, InstanceRecord>,
}

impl InMemoryInstanceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InstanceStore for InMemoryInstanceStore {
    async fn get(&self, id: Uuid) -> Result<InstanceRecord, StoreError> {
        self.records
            .get(&id)
            .map(|entry| entry.clone())
            .ok_or_else(|| StoreError::NotFound(NotFound))
    }

    async fn save(&self, record: InstanceRecord) -> Result<(), StoreError> {
        self.records.insert(record.id, record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InstanceStatus;
    use chrono::Utc;

    #[tokio::test]
    async fn round_trips_by_id() {
        let store = InMemoryInstanceStore::new();
        let record = InstanceRecord {
            id: Uuid::now_v7(),
            status: InstanceStatus::Deployed,
            exports: Default::default(),
            last_status_update_ts: Utc::now(),
        };
        store.save(record.clone()).await.unwrap();
        let fetched = store.get(record.id).await.unwrap();
        assert_eq!(fetched.status, InstanceStatus::Deployed);
    }
}
