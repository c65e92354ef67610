//! API request and response types

pub mod bucket;
pub mod error;
pub mod json;
pub mod page;
pub mod workflow;

pub use bucket::{BucketResponse, CreateBucketBody, ListBucketsParams};
pub use error::{ApiError, ApiErrorResponse};
pub use json::Json;
pub use page::PagedResponse;
pub use workflow::{
    CreateWorkflowParams, CreatedWorkflowsResponse, GetWorkflowParams, KeyValueEntry,
    ListRevisionsParams, ListWorkflowsParams, WorkflowMetadataResponse,
};
