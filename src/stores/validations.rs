use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use super::{NotFound, StoreError};
use crate::models::ValidationRecord;

#[async_trait]
pub trait ValidationStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<ValidationRecord, StoreError>;
    async fn save(&self, record: ValidationRecord) -> Result<(), StoreError>;
    async fn cleanup(&self, threshold: DateTime<Utc>) -> Result<u64, StoreError>;
}

#[derive(Default)]
pub struct InMemoryValidationStore {
    records: DashMap<Uuid, ValidationRecord>,
}

impl InMemoryValidationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ValidationStore for InMemoryValidationStore {
    async fn get(&self, id: Uuid) -> Result<ValidationRecord, StoreError> {
        self.records
            .get(&id)
            .map(|entry| entry.clone())
            .ok_or_else(|| StoreError::NotFound(NotFound))
    }

    async fn save(&self, record: ValidationRecord) -> Result<(), StoreError> {
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
    use crate::models::ValidationStatus;

    fn record(created: DateTime<Utc>) -> ValidationRecord {
        ValidationRecord {
            id: Uuid::now_v7(),
            status: ValidationStatus::Starting,
            blueprint_location: "file:///a/b.yml".into(),
            created,
        }
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let store = InMemoryValidationStore::new();
        let err = store.get(Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn round_trips_by_id() {
        let store = InMemoryValidationStore::new();
        let record = record(Utc::now());
        store.save(record.clone()).await.unwrap();
        let fetched = store.get(record.id).await.unwrap();
        assert_eq!(fetched.id, record.id);
    }

    #[tokio::test]
    async fn cleanup_is_monotonic_on_created_at() {
        let store = InMemoryValidationStore::new();
        let old = record(Utc::now() - chrono::Duration::hours(1));
        let fresh = record(Utc::now());
        store.save(old.clone()).await.unwrap();
        store.save(fresh.clone()).await.unwrap();

        let removed = store.cleanup(Utc::now() - chrono::Duration::minutes(1)).await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.get(old.id).await.is_err());
        assert!(store.get(fresh.id).await.is_ok());
    }
}
