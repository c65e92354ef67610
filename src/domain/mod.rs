//! Domain layer - Core business logic and entities

pub mod bucket;
pub mod error;
pub mod page;
pub mod query;
pub mod workflow;

pub use bucket::{Bucket, BucketId, BucketRepository, NewBucket};
pub use error::DomainError;
pub use page::{Page, Pagination, SortDirection, SortField, SortKey, SortSpec};
pub use query::{parse_query, QueryExpression};
pub use workflow::{
    KeyValue, NewRevision, ParsedWorkflow, RevisionMetadata, Workflow, WorkflowId,
    WorkflowRepository, WorkflowRevision,
};
