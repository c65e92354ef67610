//! Bucket endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{ApiError, BucketResponse, CreateBucketBody, Json, ListBucketsParams};
use crate::domain::bucket::BucketId;
use crate::infrastructure::services::CreateBucketRequest;

/// POST /buckets
pub async fn create_bucket(
    State(state): State<AppState>,
    Json(body): Json<CreateBucketBody>,
) -> Result<Response, ApiError> {
    debug!(name = %body.name, owner = %body.owner, "Creating bucket");

    let bucket = state
        .bucket_service
        .create(CreateBucketRequest {
            name: body.name,
            owner: body.owner,
        })
        .await
        .map_err(ApiError::from)?;

    Ok((StatusCode::CREATED, Json(BucketResponse::from(&bucket))).into_response())
}

/// GET /buckets
pub async fn list_buckets(
    State(state): State<AppState>,
    Query(params): Query<ListBucketsParams>,
) -> Result<Json<Vec<BucketResponse>>, ApiError> {
    let buckets = state
        .bucket_service
        .list(params.owner.as_deref())
        .await
        .map_err(ApiError::from)?;

    Ok(Json(buckets.iter().map(BucketResponse::from).collect()))
}

/// GET /buckets/{bucket_id}
pub async fn get_bucket(
    State(state): State<AppState>,
    Path(bucket_id): Path<i64>,
) -> Result<Json<BucketResponse>, ApiError> {
    let bucket = state
        .bucket_service
        .get_required(BucketId::new(bucket_id))
        .await
        .map_err(ApiError::from)?;

    Ok(Json(BucketResponse::from(&bucket)))
}
