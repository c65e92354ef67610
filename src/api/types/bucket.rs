//! Bucket API types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::bucket::Bucket;

/// Request body for bucket creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBucketBody {
    pub name: String,
    pub owner: String,
}

/// Bucket metadata response
#[derive(Debug, Clone, Serialize)]
pub struct BucketResponse {
    pub id: i64,
    pub name: String,
    pub owner: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Bucket> for BucketResponse {
    fn from(bucket: &Bucket) -> Self {
        Self {
            id: bucket.id().value(),
            name: bucket.name().to_string(),
            owner: bucket.owner().to_string(),
            created_at: bucket.created_at(),
        }
    }
}

/// Query parameters for the bucket listing endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ListBucketsParams {
    pub owner: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bucket::BucketId;

    #[test]
    fn test_bucket_response_from_entity() {
        let bucket = Bucket::new(BucketId::new(7), "tools", "admin", Utc::now());
        let response = BucketResponse::from(&bucket);

        assert_eq!(response.id, 7);
        assert_eq!(response.name, "tools");
        assert_eq!(response.owner, "admin");
    }

    #[test]
    fn test_create_body_deserialization() {
        let body: CreateBucketBody =
            serde_json::from_str(r#"{"name":"tools","owner":"admin"}"#).unwrap();

        assert_eq!(body.name, "tools");
        assert_eq!(body.owner, "admin");
    }
}
