use axum::http::Uri;
use serde::Deserialize;

use foodgram_types::api::Page;

use crate::error::ApiError;

pub const DEFAULT_PAGE_SIZE: i64 = 6;
pub const MAX_PAGE_SIZE: i64 = 100;
/// Highest page whose offset still fits in an i64.
pub const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_SIZE;

/// `?page=&limit=` with 1-based pages.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageRequest {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageRequest {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self { page, limit }
    }

    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }

    pub fn validate(self) -> Result<Self, ApiError> {
        if self.page() < 1 {
            return Err(ApiError::validation("page must be at least 1"));
        }
        if self.page() > MAX_PAGE {
            return Err(ApiError::Validation(format!("page must be at most {}", MAX_PAGE)));
        }
        Ok(self)
    }
}

/// Wrap one page of results with links to its neighbours. The links keep
/// every other query parameter of `uri`.
pub fn paginate<T>(results: Vec<T>, count: i64, req: PageRequest, uri: &Uri) -> Page<T> {
    let page = req.page();
    let last = (count + req.limit() - 1) / req.limit();

    Page {
        count,
        next: (page < last).then(|| page_url(uri, page + 1)),
        previous: (page > 1).then(|| page_url(uri, (page - 1).min(last.max(1)))),
        results,
    }
}

fn page_url(uri: &Uri, page: i64) -> String {
    let mut pairs: Vec<&str> = uri
        .query()
        .unwrap_or("")
        .split('&')
        .filter(|p| !p.is_empty() && !p.starts_with("page="))
        .collect();

    let page_pair = format!("page={}", page);
    pairs.push(&page_pair);
    format!("{}?{}", uri.path(), pairs.join("&"))
}
