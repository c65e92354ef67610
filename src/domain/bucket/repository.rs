//! Bucket repository trait

use async_trait::async_trait;

use super::entity::{Bucket, BucketId, NewBucket};
use crate::domain::DomainError;

/// Repository trait for bucket persistence
#[async_trait]
pub trait BucketRepository: Send + Sync {
    /// Create a new bucket, assigning its identifier
    async fn create(&self, bucket: NewBucket) -> Result<Bucket, DomainError>;

    /// Get a bucket by ID
    async fn get(&self, id: BucketId) -> Result<Option<Bucket>, DomainError>;

    /// List buckets, optionally restricted to one owner
    async fn list(&self, owner: Option<&str>) -> Result<Vec<Bucket>, DomainError>;

    /// Check if a bucket exists
    async fn exists(&self, id: BucketId) -> Result<bool, DomainError>;

    /// Verify the backend is reachable
    async fn ping(&self) -> Result<(), DomainError>;
}
