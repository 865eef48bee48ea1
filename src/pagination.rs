use serde::Deserialize;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;
/// Highest page whose offset still fits in an `i64` at `MAX_LIMIT` rows per page.
pub const MAX_PAGE: i64 = i64::MAX / MAX_LIMIT;

/// Raw list query string. Values stay strings so that junk falls back to defaults
/// instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

fn positive(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v > 0)
}

impl PageRequest {
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: page.clamp(1, MAX_PAGE),
            limit: limit.clamp(1, MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE, DEFAULT_LIMIT)
    }
}

impl ListQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(
            positive(self.page.as_deref()).unwrap_or(DEFAULT_PAGE),
            positive(self.limit.as_deref()).unwrap_or(DEFAULT_LIMIT),
        )
    }

    /// Name filter, `None` when absent or blank.
    pub fn name_filter(&self) -> Option<String> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}
