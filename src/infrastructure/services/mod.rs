//! Application services built on the repository traits

pub mod bucket_service;
pub mod workflow_service;

pub use bucket_service::{BucketService, CreateBucketRequest};
pub use workflow_service::WorkflowService;
