//! Workflow API types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::workflow::{KeyValue, RevisionMetadata, WorkflowRevision};

/// A key/value metadata entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyValueEntry {
    pub name: String,
    pub value: String,
}

impl From<&KeyValue> for KeyValueEntry {
    fn from(entry: &KeyValue) -> Self {
        Self {
            name: entry.name.clone(),
            value: entry.value.clone(),
        }
    }
}

/// Metadata of one workflow revision, as returned by every endpoint
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowMetadataResponse {
    pub bucket_id: i64,
    pub workflow_id: i64,
    pub revision_number: i64,
    pub name: String,
    pub project_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    pub created_at: DateTime<Utc>,
    pub generic_information: Vec<KeyValueEntry>,
    pub variables: Vec<KeyValueEntry>,
}

impl From<&RevisionMetadata> for WorkflowMetadataResponse {
    fn from(metadata: &RevisionMetadata) -> Self {
        Self {
            bucket_id: metadata.bucket_id.value(),
            workflow_id: metadata.workflow_id.value(),
            revision_number: metadata.revision_number,
            name: metadata.name.clone(),
            project_name: metadata.project_name.clone(),
            layout: metadata.layout.clone(),
            created_at: metadata.created_at,
            generic_information: metadata
                .generic_information
                .iter()
                .map(KeyValueEntry::from)
                .collect(),
            variables: metadata.variables.iter().map(KeyValueEntry::from).collect(),
        }
    }
}

impl From<&WorkflowRevision> for WorkflowMetadataResponse {
    fn from(revision: &WorkflowRevision) -> Self {
        Self::from(&revision.metadata())
    }
}

/// Response for workflow creation: one entry per created workflow
#[derive(Debug, Clone, Serialize)]
pub struct CreatedWorkflowsResponse {
    pub workflows: Vec<WorkflowMetadataResponse>,
}

impl CreatedWorkflowsResponse {
    pub fn from_revisions(revisions: &[WorkflowRevision]) -> Self {
        Self {
            workflows: revisions.iter().map(WorkflowMetadataResponse::from).collect(),
        }
    }
}

/// Query parameters for workflow creation
#[derive(Debug, Clone, Deserialize)]
pub struct CreateWorkflowParams {
    /// Opaque description of task positions, stored verbatim
    pub layout: Option<String>,
    /// `zip` imports every XML entry of the uploaded archive
    pub alt: Option<String>,
}

/// Query parameters for workflow retrieval
#[derive(Debug, Clone, Deserialize)]
pub struct GetWorkflowParams {
    /// `xml` returns the raw payload, `zip` an archive of the listed ids
    pub alt: Option<String>,
}

/// Query parameters for the bucket listing endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ListWorkflowsParams {
    /// Optional query expression over latest-revision metadata
    pub query: Option<String>,
    /// 0-based page index
    pub page: Option<u32>,
    pub size: Option<u32>,
    /// Comma-separated `field` or `field:desc` tokens
    pub sort: Option<String>,
}

/// Query parameters for the revision history endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ListRevisionsParams {
    pub page: Option<u32>,
    pub size: Option<u32>,
}
