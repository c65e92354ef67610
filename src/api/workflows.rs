//! Workflow collection endpoints: upload, listing, retrieval and deletion

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{
    ApiError, CreateWorkflowParams, CreatedWorkflowsResponse, GetWorkflowParams, Json,
    ListWorkflowsParams, PagedResponse, WorkflowMetadataResponse,
};
use crate::domain::bucket::BucketId;
use crate::domain::page::{Pagination, SortSpec};
use crate::domain::workflow::WorkflowId;

const ZIP_ALT: &str = "zip";
const XML_ALT: &str = "xml";

/// Read the `file` part of a multipart upload
pub(crate) async fn read_file_part(mut multipart: Multipart) -> Result<Bytes, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Failed to read multipart field: {}", e)))?
    {
        if field.name() == Some("file") {
            return field.bytes().await.map_err(|e| {
                ApiError::bad_request(format!("Failed to read uploaded file: {}", e))
            });
        }
    }

    Err(ApiError::bad_request("Missing 'file' part in multipart upload"))
}

/// Parse a comma-separated workflow id list from a path segment
pub(crate) fn parse_id_list(raw: &str) -> Result<Vec<WorkflowId>, ApiError> {
    let ids: Vec<WorkflowId> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map(WorkflowId::new)
                .map_err(|_| ApiError::bad_request(format!("Invalid workflow id '{}'", s)))
        })
        .collect::<Result<_, _>>()?;

    if ids.is_empty() {
        return Err(ApiError::bad_request("No workflow id given"));
    }

    Ok(ids)
}

/// POST /buckets/{bucket_id}/workflows
///
/// Uploads a workflow XML document; `alt=zip` imports every XML entry of
/// the uploaded archive instead, one workflow per entry.
pub async fn create_workflows(
    State(state): State<AppState>,
    Path(bucket_id): Path<i64>,
    Query(params): Query<CreateWorkflowParams>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let bucket_id = BucketId::new(bucket_id);
    let payload = read_file_part(multipart).await?;

    debug!(
        bucket_id = %bucket_id,
        bytes = payload.len(),
        alt = params.alt.as_deref().unwrap_or(""),
        "Creating workflows"
    );

    let created = if params.alt.as_deref() == Some(ZIP_ALT) {
        state
            .workflow_service
            .create_workflows_from_archive(bucket_id, params.layout, payload)
            .await
            .map_err(ApiError::from)?
    } else {
        vec![state
            .workflow_service
            .create_workflow(bucket_id, params.layout, payload)
            .await
            .map_err(ApiError::from)?]
    };

    Ok((
        StatusCode::CREATED,
        Json(CreatedWorkflowsResponse::from_revisions(&created)),
    )
        .into_response())
}

/// GET /buckets/{bucket_id}/workflows
pub async fn list_workflows(
    State(state): State<AppState>,
    Path(bucket_id): Path<i64>,
    Query(params): Query<ListWorkflowsParams>,
) -> Result<Json<PagedResponse<WorkflowMetadataResponse>>, ApiError> {
    let pagination = Pagination::new(params.page, params.size).map_err(ApiError::from)?;
    let sort = match params.sort.as_deref() {
        Some(spec) => SortSpec::parse(spec).map_err(ApiError::from)?,
        None => SortSpec::default(),
    };

    let page = state
        .workflow_service
        .list(BucketId::new(bucket_id), params.query, pagination, sort)
        .await
        .map_err(ApiError::from)?;

    let page = page.map(|metadata| WorkflowMetadataResponse::from(&metadata));

    Ok(Json(PagedResponse::from(page)))
}

/// GET /buckets/{bucket_id}/workflows/{workflow_id}
///
/// The path segment accepts a comma-separated id list. Without `alt`, a
/// single id returns the latest revision's metadata and more than one id is
/// ambiguous. `alt=xml` returns the raw payload; `alt=zip` returns an
/// archive of the listed workflows' latest payloads.
pub async fn get_workflows(
    State(state): State<AppState>,
    Path((bucket_id, id_list)): Path<(i64, String)>,
    Query(params): Query<GetWorkflowParams>,
) -> Result<Response, ApiError> {
    let bucket_id = BucketId::new(bucket_id);
    let ids = parse_id_list(&id_list)?;

    match params.alt.as_deref() {
        Some(ZIP_ALT) => {
            let archive = state
                .workflow_service
                .export_archive(bucket_id, ids)
                .await
                .map_err(ApiError::from)?;

            Ok((
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "application/zip"),
                    (
                        header::CONTENT_DISPOSITION,
                        "attachment; filename=\"archive.zip\"",
                    ),
                ],
                archive,
            )
                .into_response())
        }
        Some(XML_ALT) => {
            let workflow_id = single_id(&ids)?;
            let revision = state
                .workflow_service
                .get_latest(bucket_id, workflow_id)
                .await
                .map_err(ApiError::from)?;

            Ok((
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/xml")],
                revision.xml_payload().clone(),
            )
                .into_response())
        }
        None => {
            let workflow_id = single_id(&ids)?;
            let revision = state
                .workflow_service
                .get_latest(bucket_id, workflow_id)
                .await
                .map_err(ApiError::from)?;

            Ok(Json(WorkflowMetadataResponse::from(&revision)).into_response())
        }
        Some(other) => Err(ApiError::bad_request(format!(
            "Unsupported alt value '{}': expected 'xml' or 'zip'",
            other
        ))),
    }
}

fn single_id(ids: &[WorkflowId]) -> Result<WorkflowId, ApiError> {
    match ids {
        [id] => Ok(*id),
        _ => Err(ApiError::bad_request(
            "More than one workflow id requires alt=zip",
        )),
    }
}

/// DELETE /buckets/{bucket_id}/workflows/{workflow_id}
///
/// Removes the workflow with its entire revision history and returns the
/// deleted workflow's latest metadata. A repeated delete reports not-found.
pub async fn delete_workflow(
    State(state): State<AppState>,
    Path((bucket_id, workflow_id)): Path<(i64, i64)>,
) -> Result<Json<WorkflowMetadataResponse>, ApiError> {
    let deleted = state
        .workflow_service
        .delete(BucketId::new(bucket_id), WorkflowId::new(workflow_id))
        .await
        .map_err(ApiError::from)?;

    Ok(Json(WorkflowMetadataResponse::from(&deleted)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_list_single() {
        let ids = parse_id_list("42").unwrap();
        assert_eq!(ids, vec![WorkflowId::new(42)]);
    }

    #[test]
    fn test_parse_id_list_multiple() {
        let ids = parse_id_list("1,2, 3").unwrap();
        assert_eq!(
            ids,
            vec![WorkflowId::new(1), WorkflowId::new(2), WorkflowId::new(3)]
        );
    }

    #[test]
    fn test_parse_id_list_rejects_garbage() {
        assert!(parse_id_list("1,abc").is_err());
        assert!(parse_id_list("").is_err());
        assert!(parse_id_list(",,").is_err());
    }

    #[test]
    fn test_single_id_rejects_multiple() {
        let err = single_id(&[WorkflowId::new(1), WorkflowId::new(2)]).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        assert_eq!(single_id(&[WorkflowId::new(1)]).unwrap(), WorkflowId::new(1));
    }
}
