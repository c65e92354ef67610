//! Workflow and revision domain entities

use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::bucket::BucketId;
use crate::domain::DomainError;

/// Surrogate workflow identifier, assigned by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowId(i64);

impl WorkflowId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for WorkflowId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A named key/value entry owned by a revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub name: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Workflow metadata extracted from an uploaded XML document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedWorkflow {
    pub name: String,
    pub project_name: String,
    pub generic_information: Vec<KeyValue>,
    pub variables: Vec<KeyValue>,
}

/// Validated content for a revision about to be created
#[derive(Debug, Clone)]
pub struct NewRevision {
    name: String,
    project_name: String,
    layout: Option<String>,
    generic_information: Vec<KeyValue>,
    variables: Vec<KeyValue>,
    xml_payload: Bytes,
}

impl NewRevision {
    pub fn new(
        parsed: ParsedWorkflow,
        layout: Option<String>,
        xml_payload: Bytes,
    ) -> Result<Self, DomainError> {
        if parsed.name.is_empty() {
            return Err(DomainError::validation("Workflow name cannot be empty"));
        }

        if parsed.project_name.is_empty() {
            return Err(DomainError::validation("Project name cannot be empty"));
        }

        if xml_payload.is_empty() {
            return Err(DomainError::validation("Workflow payload cannot be empty"));
        }

        Ok(Self {
            name: parsed.name,
            project_name: parsed.project_name,
            layout,
            generic_information: parsed.generic_information,
            variables: parsed.variables,
            xml_payload,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn layout(&self) -> Option<&str> {
        self.layout.as_deref()
    }

    pub fn generic_information(&self) -> &[KeyValue] {
        &self.generic_information
    }

    pub fn variables(&self) -> &[KeyValue] {
        &self.variables
    }

    pub fn xml_payload(&self) -> &Bytes {
        &self.xml_payload
    }
}

/// A workflow: the identity a history of revisions hangs off
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workflow {
    id: WorkflowId,
    bucket_id: BucketId,
    last_revision_number: i64,
}

impl Workflow {
    pub fn new(id: WorkflowId, bucket_id: BucketId, last_revision_number: i64) -> Self {
        Self {
            id,
            bucket_id,
            last_revision_number,
        }
    }

    pub fn id(&self) -> WorkflowId {
        self.id
    }

    pub fn bucket_id(&self) -> BucketId {
        self.bucket_id
    }

    /// The sequence number of the most recently created revision
    pub fn last_revision_number(&self) -> i64 {
        self.last_revision_number
    }

    /// Claim the next sequence number for a revision being created
    pub fn advance_revision(&mut self) -> i64 {
        self.last_revision_number += 1;
        self.last_revision_number
    }
}

/// A revision's metadata without its payload, as returned by listings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionMetadata {
    pub id: i64,
    pub workflow_id: WorkflowId,
    pub revision_number: i64,
    pub bucket_id: BucketId,
    pub name: String,
    pub project_name: String,
    pub layout: Option<String>,
    pub created_at: DateTime<Utc>,
    pub generic_information: Vec<KeyValue>,
    pub variables: Vec<KeyValue>,
}

/// One immutable snapshot of a workflow's content and metadata
#[derive(Debug, Clone)]
pub struct WorkflowRevision {
    id: i64,
    workflow_id: WorkflowId,
    revision_number: i64,
    bucket_id: BucketId,
    name: String,
    project_name: String,
    layout: Option<String>,
    created_at: DateTime<Utc>,
    generic_information: Vec<KeyValue>,
    variables: Vec<KeyValue>,
    xml_payload: Bytes,
}

impl WorkflowRevision {
    pub fn new(
        id: i64,
        workflow_id: WorkflowId,
        revision_number: i64,
        bucket_id: BucketId,
        created_at: DateTime<Utc>,
        content: NewRevision,
    ) -> Self {
        Self {
            id,
            workflow_id,
            revision_number,
            bucket_id,
            name: content.name,
            project_name: content.project_name,
            layout: content.layout,
            created_at,
            generic_information: content.generic_information,
            variables: content.variables,
            xml_payload: content.xml_payload,
        }
    }

    /// Reassemble a revision loaded from storage
    pub fn from_metadata(metadata: RevisionMetadata, xml_payload: Bytes) -> Self {
        Self {
            id: metadata.id,
            workflow_id: metadata.workflow_id,
            revision_number: metadata.revision_number,
            bucket_id: metadata.bucket_id,
            name: metadata.name,
            project_name: metadata.project_name,
            layout: metadata.layout,
            created_at: metadata.created_at,
            generic_information: metadata.generic_information,
            variables: metadata.variables,
            xml_payload,
        }
    }

    /// The payload-free view of this revision
    pub fn metadata(&self) -> RevisionMetadata {
        RevisionMetadata {
            id: self.id,
            workflow_id: self.workflow_id,
            revision_number: self.revision_number,
            bucket_id: self.bucket_id,
            name: self.name.clone(),
            project_name: self.project_name.clone(),
            layout: self.layout.clone(),
            created_at: self.created_at,
            generic_information: self.generic_information.clone(),
            variables: self.variables.clone(),
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn workflow_id(&self) -> WorkflowId {
        self.workflow_id
    }

    /// Position of this snapshot in its workflow's history (1-based)
    pub fn revision_number(&self) -> i64 {
        self.revision_number
    }

    pub fn bucket_id(&self) -> BucketId {
        self.bucket_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn layout(&self) -> Option<&str> {
        self.layout.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn generic_information(&self) -> &[KeyValue] {
        &self.generic_information
    }

    pub fn variables(&self) -> &[KeyValue] {
        &self.variables
    }

    /// The stored payload, byte-identical to the uploaded document
    pub fn xml_payload(&self) -> &Bytes {
        &self.xml_payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(name: &str, project: &str) -> ParsedWorkflow {
        ParsedWorkflow {
            name: name.to_string(),
            project_name: project.to_string(),
            generic_information: vec![KeyValue::new("team", "ops")],
            variables: vec![KeyValue::new("cpu", "4")],
        }
    }

    #[test]
    fn test_new_revision_valid() {
        let content = NewRevision::new(
            parsed("Flow1", "Project A"),
            Some("layout-json".to_string()),
            Bytes::from_static(b"<job/>"),
        )
        .unwrap();

        assert_eq!(content.name(), "Flow1");
        assert_eq!(content.project_name(), "Project A");
        assert_eq!(content.layout(), Some("layout-json"));
        assert_eq!(content.generic_information().len(), 1);
        assert_eq!(content.variables().len(), 1);
    }

    #[test]
    fn test_new_revision_rejects_empty_name() {
        let result = NewRevision::new(parsed("", "P"), None, Bytes::from_static(b"<job/>"));
        assert!(result.is_err());
    }

    #[test]
    fn test_new_revision_rejects_empty_project() {
        let result = NewRevision::new(parsed("Flow1", ""), None, Bytes::from_static(b"<job/>"));
        assert!(result.is_err());
    }

    #[test]
    fn test_new_revision_rejects_empty_payload() {
        let result = NewRevision::new(parsed("Flow1", "P"), None, Bytes::new());
        assert!(result.is_err());
    }

    #[test]
    fn test_revision_getters() {
        let content = NewRevision::new(
            parsed("Flow1", "Project A"),
            None,
            Bytes::from_static(b"<job name=\"Flow1\"/>"),
        )
        .unwrap();

        let created_at = Utc::now();
        let revision = WorkflowRevision::new(
            7,
            WorkflowId::new(3),
            2,
            BucketId::new(1),
            created_at,
            content,
        );

        assert_eq!(revision.id(), 7);
        assert_eq!(revision.workflow_id(), WorkflowId::new(3));
        assert_eq!(revision.revision_number(), 2);
        assert_eq!(revision.bucket_id(), BucketId::new(1));
        assert_eq!(revision.name(), "Flow1");
        assert_eq!(revision.project_name(), "Project A");
        assert_eq!(revision.layout(), None);
        assert_eq!(revision.created_at(), created_at);
        assert_eq!(revision.xml_payload().as_ref(), b"<job name=\"Flow1\"/>");
    }

    #[test]
    fn test_metadata_round_trip() {
        let content = NewRevision::new(
            parsed("Flow1", "Project A"),
            Some("layout".to_string()),
            Bytes::from_static(b"<job/>"),
        )
        .unwrap();

        let revision = WorkflowRevision::new(
            7,
            WorkflowId::new(3),
            2,
            BucketId::new(1),
            Utc::now(),
            content,
        );

        let metadata = revision.metadata();
        assert_eq!(metadata.name, "Flow1");
        assert_eq!(metadata.revision_number, 2);

        let rebuilt =
            WorkflowRevision::from_metadata(metadata, Bytes::from_static(b"<job/>"));
        assert_eq!(rebuilt.id(), revision.id());
        assert_eq!(rebuilt.name(), revision.name());
        assert_eq!(rebuilt.xml_payload(), revision.xml_payload());
    }

    #[test]
    fn test_workflow_getters() {
        let workflow = Workflow::new(WorkflowId::new(5), BucketId::new(2), 3);

        assert_eq!(workflow.id().value(), 5);
        assert_eq!(workflow.bucket_id().value(), 2);
        assert_eq!(workflow.last_revision_number(), 3);
    }

    #[test]
    fn test_advance_revision_is_sequential() {
        let mut workflow = Workflow::new(WorkflowId::new(5), BucketId::new(2), 0);

        assert_eq!(workflow.advance_revision(), 1);
        assert_eq!(workflow.advance_revision(), 2);
        assert_eq!(workflow.last_revision_number(), 2);
    }
}
