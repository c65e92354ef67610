//! Pagination envelope for listing responses

use serde::Serialize;

use crate::domain::page::Page;

/// One page of results plus the pagination envelope
#[derive(Debug, Clone, Serialize)]
pub struct PagedResponse<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u64,
}

impl<T> From<Page<T>> for PagedResponse<T> {
    fn from(page: Page<T>) -> Self {
        let total_pages = page.total_pages();

        Self {
            content: page.content,
            page: page.page,
            size: page.size,
            total_elements: page.total_elements,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::page::Pagination;

    #[test]
    fn test_envelope_totals() {
        let pagination = Pagination::new(Some(1), Some(10)).unwrap();
        let page = Page::new(vec!["a", "b"], &pagination, 23);

        let response = PagedResponse::from(page);

        assert_eq!(response.page, 1);
        assert_eq!(response.size, 10);
        assert_eq!(response.total_elements, 23);
        assert_eq!(response.total_pages, 3);
    }

    #[test]
    fn test_envelope_serialization() {
        let page = Page::new(vec![1, 2, 3], &Pagination::default(), 3);
        let json = serde_json::to_string(&PagedResponse::from(page)).unwrap();

        assert!(json.contains("\"content\":[1,2,3]"));
        assert!(json.contains("\"total_elements\":3"));
        assert!(json.contains("\"total_pages\":1"));
    }
}
