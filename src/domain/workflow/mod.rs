//! Workflow domain: versioned workflow documents and their revision store

pub mod entity;
pub mod repository;

pub use entity::{
    KeyValue, NewRevision, ParsedWorkflow, RevisionMetadata, Workflow, WorkflowId,
    WorkflowRevision,
};
pub use repository::WorkflowRepository;
