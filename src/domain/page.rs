use serde::{Deserialize, Serialize, Serializer, ser::SerializeStruct};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Normalised paging parameters. `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: i64,
    page_size: i64,
}

impl PageRequest {
    /// Non-positive or missing values fall back to page 1 / the default size;
    /// sizes above the maximum are clamped.
    pub fn new(page: Option<i64>, page_size: Option<i64>) -> Self {
        let page = page.filter(|p| *p > 0).unwrap_or(1);
        let page_size = match page_size {
            Some(size) if size > 0 => size.min(MAX_PAGE_SIZE),
            _ => DEFAULT_PAGE_SIZE,
        };
        Self { page, page_size }
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn page_size(&self) -> i64 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// A bounded slice of items plus paging metadata.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub page_size: i64,
    pub total_count: i64,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total_count: i64) -> Self {
        Self {
            items,
            page: request.page(),
            page_size: request.page_size(),
            total_count,
        }
    }

    pub fn has_more(&self) -> bool {
        self.page.saturating_mul(self.page_size) < self.total_count
    }
}

// Serialized by hand so the derived `hasMore` travels with the page.
impl<T: Serialize> Serialize for PagedResult<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("PagedResult", 5)?;
        s.serialize_field("items", &self.items)?;
        s.serialize_field("page", &self.page)?;
        s.serialize_field("pageSize", &self.page_size)?;
        s.serialize_field("totalCount", &self.total_count)?;
        s.serialize_field("hasMore", &self.has_more())?;
        s.end()
    }
}
