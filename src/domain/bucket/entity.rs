//! Bucket domain entity

use std::fmt;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Maximum length for bucket names
pub const MAX_NAME_LENGTH: usize = 100;

/// Regex pattern for valid bucket names: starts alphanumeric, then
/// alphanumerics, dashes, underscores or spaces
static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9-_ ]*$").unwrap());

/// Surrogate bucket identifier, assigned by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BucketId(i64);

impl BucketId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for BucketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for BucketId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Validate a bucket name
pub fn validate_bucket_name(name: &str) -> Result<(), DomainError> {
    if name.is_empty() {
        return Err(DomainError::validation("Bucket name cannot be empty"));
    }

    if name.len() > MAX_NAME_LENGTH {
        return Err(DomainError::validation(format!(
            "Bucket name exceeds maximum length of {} characters",
            MAX_NAME_LENGTH
        )));
    }

    if !NAME_PATTERN.is_match(name) {
        return Err(DomainError::validation(format!(
            "Invalid bucket name '{}': must start with an alphanumeric character and contain \
             only alphanumerics, dashes, underscores or spaces",
            name
        )));
    }

    Ok(())
}

/// A validated request to create a bucket
#[derive(Debug, Clone)]
pub struct NewBucket {
    name: String,
    owner: String,
}

impl NewBucket {
    pub fn new(name: impl Into<String>, owner: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        let owner = owner.into();

        validate_bucket_name(&name)?;

        if owner.is_empty() {
            return Err(DomainError::validation("Bucket owner cannot be empty"));
        }

        Ok(Self { name, owner })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }
}

/// A named namespace grouping a set of workflows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    id: BucketId,
    name: String,
    owner: String,
    created_at: DateTime<Utc>,
}

impl Bucket {
    pub fn new(
        id: BucketId,
        name: impl Into<String>,
        owner: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            owner: owner.into(),
            created_at,
        }
    }

    pub fn id(&self) -> BucketId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_name_valid() {
        assert!(validate_bucket_name("tools").is_ok());
        assert!(validate_bucket_name("my-bucket_1").is_ok());
        assert!(validate_bucket_name("Examples Bucket").is_ok());
        assert!(validate_bucket_name("a").is_ok());
    }

    #[test]
    fn test_bucket_name_invalid() {
        assert!(validate_bucket_name("").is_err());
        assert!(validate_bucket_name("-leading-dash").is_err());
        assert!(validate_bucket_name(" leading space").is_err());
        assert!(validate_bucket_name("has/slash").is_err());

        let long_name = "a".repeat(101);
        assert!(validate_bucket_name(&long_name).is_err());
    }

    #[test]
    fn test_new_bucket_requires_owner() {
        assert!(NewBucket::new("tools", "").is_err());

        let bucket = NewBucket::new("tools", "admin").unwrap();
        assert_eq!(bucket.name(), "tools");
        assert_eq!(bucket.owner(), "admin");
    }

    #[test]
    fn test_bucket_id_display() {
        let id = BucketId::new(42);
        assert_eq!(id.to_string(), "42");
        assert_eq!(id.value(), 42);
    }

    #[test]
    fn test_bucket_getters() {
        let now = Utc::now();
        let bucket = Bucket::new(BucketId::new(1), "tools", "admin", now);

        assert_eq!(bucket.id(), BucketId::new(1));
        assert_eq!(bucket.name(), "tools");
        assert_eq!(bucket.owner(), "admin");
        assert_eq!(bucket.created_at(), now);
    }
}
