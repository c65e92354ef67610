//! In-memory bucket repository implementation

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::domain::bucket::{Bucket, BucketId, BucketRepository, NewBucket};
use crate::domain::DomainError;

#[derive(Debug, Default)]
struct BucketStore {
    buckets: BTreeMap<i64, Bucket>,
    next_id: i64,
}

/// In-memory implementation of BucketRepository
#[derive(Debug, Default)]
pub struct InMemoryBucketRepository {
    store: Arc<RwLock<BucketStore>>,
}

impl InMemoryBucketRepository {
    /// Create a new empty repository
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BucketRepository for InMemoryBucketRepository {
    async fn create(&self, bucket: NewBucket) -> Result<Bucket, DomainError> {
        let mut store = self.store.write().await;

        if store.buckets.values().any(|b| b.name() == bucket.name()) {
            return Err(DomainError::conflict(format!(
                "Bucket '{}' already exists",
                bucket.name()
            )));
        }

        store.next_id += 1;
        let id = store.next_id;

        let created = Bucket::new(BucketId::new(id), bucket.name(), bucket.owner(), Utc::now());
        store.buckets.insert(id, created.clone());

        Ok(created)
    }

    async fn get(&self, id: BucketId) -> Result<Option<Bucket>, DomainError> {
        let store = self.store.read().await;
        Ok(store.buckets.get(&id.value()).cloned())
    }

    async fn list(&self, owner: Option<&str>) -> Result<Vec<Bucket>, DomainError> {
        let store = self.store.read().await;
        Ok(store
            .buckets
            .values()
            .filter(|b| owner.is_none_or(|o| b.owner() == o))
            .cloned()
            .collect())
    }

    async fn exists(&self, id: BucketId) -> Result<bool, DomainError> {
        let store = self.store.read().await;
        Ok(store.buckets.contains_key(&id.value()))
    }

    async fn ping(&self) -> Result<(), DomainError> {
        Ok(())
    }
}
