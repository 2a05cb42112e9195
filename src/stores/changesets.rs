use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use super::{NotFound, StoreError};
use crate::models::ChangesetRecord;

#[async_trait]
pub trait ChangesetStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<ChangesetRecord, StoreError>;
    async fn save(&self, record: ChangesetRecord) -> Result<(), StoreError>;
    async fn cleanup(&self, threshold: DateTime<Utc>) -> Result<u64, StoreError>;
}

#[derive(Default)]
pub struct InMemoryChangesetStore {
    records: DashMap<Uuid, ChangesetRecord>,
}

impl InMemoryChangesetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChangesetStore for InMemoryChangesetStore {
    async fn get(&self, id: Uuid) -> Result<ChangesetRecord, StoreError> {
        self.records
            .get(&id)
            .map(|entry| entry.clone())
            .ok_or_else(|| StoreError::NotFound(NotFound))
    }

    async fn save(&self, record: ChangesetRecord) -> Result<(), StoreError> {
        self.records.insert(record.id, record);
        Ok(())
    }

    async fn cleanup(&self, threshold: DateTime<Utc>) -> Result<u64, StoreError> {
        let before = self.records.len();
        self.records.retain(|_, record| record.created >= threshold);
        Ok((before - self.records.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChangesetStatus;

    fn record() -> ChangesetRecord {
        ChangesetRecord {
            id: Uuid::now_v7(),
            instance_id: None,
            destroy: false,
            status: ChangesetStatus::Starting,
            blueprint_location: "file:///a/b.yml".into(),
            computed_changes: None,
            created: Utc::now(),
        }
    }

    #[tokio::test]
    async fn missing_changeset_is_not_found_not_bad_request() {
        // The store itself reports NotFound; mapping to 400 on the
        // deploy/destroy path is the Controller's job (spec.md §4.5, §7).
        let store = InMemoryChangesetStore::new();
        let err = store.get(Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn round_trips_by_id() {
        let store = InMemoryChangesetStore::new();
        let record = record();
        store.save(record.clone()).await.unwrap();
        assert_eq!(store.get(record.id).await.unwrap().id, record.id);
    }
}
