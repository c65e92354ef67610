//! Revision history endpoints

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{
    ApiError, CreateWorkflowParams, GetWorkflowParams, Json, ListRevisionsParams, PagedResponse,
    WorkflowMetadataResponse,
};
use crate::api::workflows::read_file_part;
use crate::domain::bucket::BucketId;
use crate::domain::page::Pagination;
use crate::domain::workflow::WorkflowId;

/// POST /buckets/{bucket_id}/workflows/{workflow_id}/revisions
///
/// Appends a revision to the workflow's history, assigning the next
/// sequence number.
pub async fn create_revision(
    State(state): State<AppState>,
    Path((bucket_id, workflow_id)): Path<(i64, i64)>,
    Query(params): Query<CreateWorkflowParams>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let payload = read_file_part(multipart).await?;

    debug!(
        bucket_id = bucket_id,
        workflow_id = workflow_id,
        bytes = payload.len(),
        "Creating revision"
    );

    let revision = state
        .workflow_service
        .create_revision(
            BucketId::new(bucket_id),
            WorkflowId::new(workflow_id),
            params.layout,
            payload,
        )
        .await
        .map_err(ApiError::from)?;

    Ok((
        StatusCode::CREATED,
        Json(WorkflowMetadataResponse::from(&revision)),
    )
        .into_response())
}

/// GET /buckets/{bucket_id}/workflows/{workflow_id}/revisions
///
/// The workflow's history, most recent first.
pub async fn list_revisions(
    State(state): State<AppState>,
    Path((bucket_id, workflow_id)): Path<(i64, i64)>,
    Query(params): Query<ListRevisionsParams>,
) -> Result<Json<PagedResponse<WorkflowMetadataResponse>>, ApiError> {
    let pagination = Pagination::new(params.page, params.size).map_err(ApiError::from)?;

    let page = state
        .workflow_service
        .list_revisions(
            BucketId::new(bucket_id),
            WorkflowId::new(workflow_id),
            pagination,
        )
        .await
        .map_err(ApiError::from)?;

    let page = page.map(|metadata| WorkflowMetadataResponse::from(&metadata));

    Ok(Json(PagedResponse::from(page)))
}

/// GET /buckets/{bucket_id}/workflows/{workflow_id}/revisions/{revision_number}
///
/// One revision by sequence number; `alt=xml` returns its raw payload.
pub async fn get_revision(
    State(state): State<AppState>,
    Path((bucket_id, workflow_id, revision_number)): Path<(i64, i64, i64)>,
    Query(params): Query<GetWorkflowParams>,
) -> Result<Response, ApiError> {
    let revision = state
        .workflow_service
        .get_revision(
            BucketId::new(bucket_id),
            WorkflowId::new(workflow_id),
            revision_number,
        )
        .await
        .map_err(ApiError::from)?;

    match params.alt.as_deref() {
        Some("xml") => Ok((
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/xml")],
            revision.xml_payload().clone(),
        )
            .into_response()),
        None => Ok(Json(WorkflowMetadataResponse::from(&revision)).into_response()),
        Some(other) => Err(ApiError::bad_request(format!(
            "Unsupported alt value '{}': expected 'xml'",
            other
        ))),
    }
}
