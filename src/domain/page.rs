//! Pagination and sorting value types

use serde::Serialize;

use crate::domain::DomainError;

/// Default page size when the client sends none
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Upper bound on page size
pub const MAX_PAGE_SIZE: u32 = 1000;

/// A validated page request (0-based page index)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: u32,
    size: u32,
}

impl Pagination {
    pub fn new(page: Option<u32>, size: Option<u32>) -> Result<Self, DomainError> {
        let size = size.unwrap_or(DEFAULT_PAGE_SIZE);

        if size == 0 {
            return Err(DomainError::validation("Page size must be at least 1"));
        }

        if size > MAX_PAGE_SIZE {
            return Err(DomainError::validation(format!(
                "Page size must not exceed {}",
                MAX_PAGE_SIZE
            )));
        }

        Ok(Self {
            page: page.unwrap_or(0),
            size,
        })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Attributes a listing can be sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Name,
    ProjectName,
    CreatedAt,
    RevisionNumber,
    Id,
}

impl SortKey {
    fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "name" => Ok(Self::Name),
            "project_name" => Ok(Self::ProjectName),
            "created_at" => Ok(Self::CreatedAt),
            "revision_number" => Ok(Self::RevisionNumber),
            "id" => Ok(Self::Id),
            other => Err(DomainError::validation(format!(
                "Unknown sort field '{}': expected one of name, project_name, created_at, \
                 revision_number, id",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// One sort criterion: a field and a direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortField {
    pub key: SortKey,
    pub direction: SortDirection,
}

/// An ordered list of sort criteria
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SortSpec {
    fields: Vec<SortField>,
}

impl SortSpec {
    /// Parse a comma-separated sort specification: `field` or `field:desc`
    /// tokens, e.g. `name:asc,created_at:desc`
    pub fn parse(spec: &str) -> Result<Self, DomainError> {
        let mut fields = Vec::new();

        for token in spec.split(',') {
            let token = token.trim();

            if token.is_empty() {
                continue;
            }

            let (field, direction) = match token.split_once(':') {
                Some((field, "asc")) => (field, SortDirection::Ascending),
                Some((field, "desc")) => (field, SortDirection::Descending),
                Some((_, other)) => {
                    return Err(DomainError::validation(format!(
                        "Unknown sort direction '{}': expected 'asc' or 'desc'",
                        other
                    )));
                }
                None => (token, SortDirection::Ascending),
            };

            fields.push(SortField {
                key: SortKey::parse(field)?,
                direction,
            });
        }

        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[SortField] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// One page of results plus the totals over the full filtered set
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, pagination: &Pagination, total_elements: u64) -> Self {
        Self {
            content,
            page: pagination.page(),
            size: pagination.size(),
            total_elements,
        }
    }

    pub fn total_pages(&self) -> u64 {
        if self.total_elements == 0 {
            0
        } else {
            self.total_elements.div_ceil(u64::from(self.size))
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        let pagination = Pagination::new(None, None).unwrap();
        assert_eq!(pagination.page(), 0);
        assert_eq!(pagination.size(), DEFAULT_PAGE_SIZE);
        assert_eq!(pagination.offset(), 0);
    }

    #[test]
    fn test_pagination_offset() {
        let pagination = Pagination::new(Some(3), Some(25)).unwrap();
        assert_eq!(pagination.offset(), 75);
    }

    #[test]
    fn test_pagination_rejects_zero_size() {
        assert!(Pagination::new(None, Some(0)).is_err());
    }

    #[test]
    fn test_pagination_rejects_oversized_page() {
        assert!(Pagination::new(None, Some(MAX_PAGE_SIZE + 1)).is_err());
        assert!(Pagination::new(None, Some(MAX_PAGE_SIZE)).is_ok());
    }

    #[test]
    fn test_sort_spec_parse_single() {
        let spec = SortSpec::parse("name").unwrap();
        assert_eq!(spec.fields().len(), 1);
        assert_eq!(spec.fields()[0].key, SortKey::Name);
        assert_eq!(spec.fields()[0].direction, SortDirection::Ascending);
    }

    #[test]
    fn test_sort_spec_parse_multi() {
        let spec = SortSpec::parse("name:asc,created_at:desc").unwrap();
        assert_eq!(spec.fields().len(), 2);
        assert_eq!(spec.fields()[1].key, SortKey::CreatedAt);
        assert_eq!(spec.fields()[1].direction, SortDirection::Descending);
    }

    #[test]
    fn test_sort_spec_rejects_unknown_field() {
        assert!(SortSpec::parse("owner").is_err());
    }

    #[test]
    fn test_sort_spec_rejects_unknown_direction() {
        assert!(SortSpec::parse("name:down").is_err());
    }

    #[test]
    fn test_sort_spec_skips_empty_tokens() {
        let spec = SortSpec::parse("name,,").unwrap();
        assert_eq!(spec.fields().len(), 1);
    }

    #[test]
    fn test_page_totals() {
        let pagination = Pagination::new(Some(1), Some(10)).unwrap();
        let page = Page::new(vec![1, 2, 3], &pagination, 23);

        assert_eq!(page.total_pages(), 3);
        assert_eq!(page.total_elements, 23);
        assert_eq!(page.page, 1);
    }

    #[test]
    fn test_page_empty_totals() {
        let page: Page<i32> = Page::new(vec![], &Pagination::default(), 0);
        assert_eq!(page.total_pages(), 0);
    }

    #[test]
    fn test_page_map() {
        let page = Page::new(vec![1, 2], &Pagination::default(), 2);
        let mapped = page.map(|n| n * 10);
        assert_eq!(mapped.content, vec![10, 20]);
        assert_eq!(mapped.total_elements, 2);
    }
}
