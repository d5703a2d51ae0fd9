use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_LIMIT: usize = 20;
pub const MAX_PAGE_LIMIT: usize = 100;
/// Largest offset SQLite accepts as a signed 64-bit integer
pub const MAX_PAGE_OFFSET: usize = i64::MAX as usize;

/// Limit/offset pair after defaults and bounds have been applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: usize,
    pub offset: usize,
}

impl PageRequest {
    /// Apply the default limit and clamp it to `1..=MAX_PAGE_LIMIT`.
    /// The offset is capped at `MAX_PAGE_OFFSET`.
    pub fn new(limit: Option<usize>, offset: Option<usize>) -> Self {
        Self {
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT),
            offset: offset.unwrap_or(0).min(MAX_PAGE_OFFSET),
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results plus the total number available
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.offset.saturating_add(self.limit) < self.total
    }

    pub fn has_previous(&self) -> bool {
        self.offset > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_bounds() {
        assert_eq!(PageRequest::new(None, None), PageRequest { limit: 20, offset: 0 });
        assert_eq!(PageRequest::new(Some(500), Some(3)).limit, 100);
        assert_eq!(PageRequest::new(Some(0), None).limit, 1);
    }

    #[test]
    fn test_page_links() {
        let page: Page<u8> = Page { items: vec![], total: 45, limit: 20, offset: 20 };
        assert!(page.has_next());
        assert!(page.has_previous());

        let last: Page<u8> = Page { items: vec![], total: 45, limit: 20, offset: 40 };
        assert!(!last.has_next());
    }

    #[test]
    fn test_huge_offset_is_capped() {
        let request = PageRequest::new(None, Some(usize::MAX));
        assert_eq!(request.offset, MAX_PAGE_OFFSET);
        assert!(i64::try_from(request.offset).is_ok());

        let page: Page<u8> = Page { items: vec![], total: 3, limit: 100, offset: usize::MAX };
        assert!(!page.has_next());
        assert!(page.has_previous());
    }
}
