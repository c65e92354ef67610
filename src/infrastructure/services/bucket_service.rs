//! Bucket service - CRUD operations for buckets

use std::sync::Arc;

use crate::domain::bucket::{Bucket, BucketId, BucketRepository, NewBucket};
use crate::domain::DomainError;

/// Request to create a new bucket
#[derive(Debug, Clone)]
pub struct CreateBucketRequest {
    pub name: String,
    pub owner: String,
}

/// Bucket service for creation and lookup
#[derive(Debug)]
pub struct BucketService<R: BucketRepository> {
    repository: Arc<R>,
}

impl<R: BucketRepository> BucketService<R> {
    /// Create a new BucketService with the given repository
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Create a new bucket
    pub async fn create(&self, request: CreateBucketRequest) -> Result<Bucket, DomainError> {
        let bucket = NewBucket::new(request.name, request.owner)?;
        self.repository.create(bucket).await
    }

    /// Get a bucket by ID
    pub async fn get(&self, id: BucketId) -> Result<Option<Bucket>, DomainError> {
        self.repository.get(id).await
    }

    /// Get a bucket by ID, returning an error if not found
    pub async fn get_required(&self, id: BucketId) -> Result<Bucket, DomainError> {
        self.get(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Bucket {} not found", id)))
    }

    /// List buckets, optionally restricted to one owner
    pub async fn list(&self, owner: Option<&str>) -> Result<Vec<Bucket>, DomainError> {
        self.repository.list(owner).await
    }

    /// Verify the backing store is reachable
    pub async fn ping(&self) -> Result<(), DomainError> {
        self.repository.ping().await
    }
}
