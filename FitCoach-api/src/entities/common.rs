use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use fit_coach_domain::entities::{CheckIn, Message, Page, PageRequest};

/// Query parameters for paginated requests
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// Number of results to return (default: 20, max: 100)
    pub limit: Option<usize>,

    /// Number of results to skip (default: 0)
    pub offset: Option<usize>,
}

impl From<PaginationParams> for PageRequest {
    fn from(params: PaginationParams) -> Self {
        PageRequest::new(params.limit, params.offset)
    }
}

/// Paginated response format
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[aliases(CheckInPage = PaginatedResponse<CheckIn>, MessagePage = PaginatedResponse<Message>)]
pub struct PaginatedResponse<T> {
    /// The data items for this page
    pub data: Vec<T>,

    /// Total number of items
    pub total: usize,

    /// Number of items to skip
    pub offset: usize,

    /// Number of items per page
    pub limit: usize,

    /// URL for the next page, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,

    /// URL for the previous page, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
}

impl<T> PaginatedResponse<T> {
    /// Wrap a page, linking neighbours relative to `base_path`
    pub fn from_page(page: Page<T>, base_path: &str) -> Self {
        let link = |offset: usize| format!("{}?limit={}&offset={}", base_path, page.limit, offset);
        let next = page.has_next().then(|| link(page.offset.saturating_add(page.limit)));
        let previous = page
            .has_previous()
            .then(|| link(page.offset.saturating_sub(page.limit)));

        Self {
            total: page.total,
            offset: page.offset,
            limit: page.limit,
            next,
            previous,
            data: page.items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_links_for_middle_page() {
        let page = Page { items: vec![1, 2], total: 5, limit: 2, offset: 2 };
        let response = PaginatedResponse::from_page(page, "/api/v1/clients/c1/check-ins");

        assert_eq!(response.next.as_deref(), Some("/api/v1/clients/c1/check-ins?limit=2&offset=4"));
        assert_eq!(response.previous.as_deref(), Some("/api/v1/clients/c1/check-ins?limit=2&offset=0"));
        assert_eq!(response.data, vec![1, 2]);
    }

    #[test]
    fn test_no_links_for_single_page() {
        let page: Page<u8> = Page { items: vec![], total: 0, limit: 20, offset: 0 };
        let response = PaginatedResponse::from_page(page, "/x");
        assert!(response.next.is_none());
        assert!(response.previous.is_none());
    }

    #[test]
    fn test_huge_offset_from_query() {
        let request = PageRequest::from(PaginationParams { limit: Some(10), offset: Some(usize::MAX) });
        let page: Page<u8> = Page { items: vec![], total: 3, limit: request.limit, offset: request.offset };
        let response = PaginatedResponse::from_page(page, "/x");

        assert!(response.next.is_none());
        assert_eq!(
            response.previous,
            Some(format!("/x?limit=10&offset={}", i64::MAX as usize - 10))
        );
    }
}
