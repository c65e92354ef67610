//! Bucket domain: named namespaces grouping workflows

pub mod entity;
pub mod repository;

pub use entity::{validate_bucket_name, Bucket, BucketId, NewBucket};
pub use repository::BucketRepository;
