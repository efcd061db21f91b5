//! Pagination strategy implementations
//!
//! Each strategy handles a specific pagination pattern.

use super::types::{NextPage, PaginationStrategy};
use crate::http::{HttpResponse, RequestDescriptor};
use serde_json::Value;
use std::collections::HashMap;
use url::Url;

// ============================================================================
// Link Header Pagination
// ============================================================================

/// Follows the `Link` header (e.g. GitHub)
///
/// The link URL's query string becomes the next request's parameters (first
/// occurrence of a repeated key wins) and is stripped from the URL, so the
/// client never sends the same parameter twice.
#[derive(Debug, Clone)]
pub struct LinkPaginator {
    /// Rel value to follow (default: "next")
    pub rel: String,
}

impl Default for LinkPaginator {
    fn default() -> Self {
        Self {
            rel: "next".to_string(),
        }
    }
}

impl LinkPaginator {
    /// Create a new link paginator
    pub fn new(rel: impl Into<String>) -> Self {
        Self { rel: rel.into() }
    }
}

impl PaginationStrategy for LinkPaginator {
    fn next(&self, response: &HttpResponse, request: &RequestDescriptor) -> NextPage {
        let Some(link) = response.link(&self.rel) else {
            return NextPage::Done;
        };

        // Relative links resolve against the request that produced them
        let parsed = Url::parse(&link)
            .or_else(|_| Url::parse(&request.url).and_then(|base| base.join(&link)));
        let Ok(mut url) = parsed else {
            tracing::warn!("Ignoring unparseable {} link: {}", self.rel, link);
            return NextPage::Done;
        };

        let mut params = HashMap::new();
        for (key, value) in url.query_pairs() {
            params
                .entry(key.into_owned())
                .or_insert_with(|| value.into_owned());
        }
        url.set_query(None);
        url.set_fragment(None);

        NextPage::Continue(request.rebuild(url.as_str(), params))
    }
}

// ============================================================================
// Threshold Pagination
// ============================================================================

/// Time-window pagination driven by a full-page count
///
/// When the body reports `count` equal to the page size, the next request
/// starts where this window ended: `start_time` is set to the body's
/// `end_time`. A short page ends the stream.
#[derive(Debug, Clone)]
pub struct ThresholdPaginator {
    /// Page size that signals more data
    pub threshold: u64,
    /// Body field holding the record count
    pub count_field: String,
    /// Body field holding the end of the returned window
    pub end_field: String,
    /// Request parameter receiving the new window start
    pub start_param: String,
}

impl Default for ThresholdPaginator {
    fn default() -> Self {
        Self {
            threshold: 1000,
            count_field: "count".to_string(),
            end_field: "end_time".to_string(),
            start_param: "start_time".to_string(),
        }
    }
}

impl ThresholdPaginator {
    /// Create a threshold paginator with a custom page size
    pub fn new(threshold: u64) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }

    fn is_full_page(&self, body: &Value) -> bool {
        match body.get(&self.count_field) {
            Some(Value::Number(n)) => {
                n.as_u64() == Some(self.threshold)
                    || n.as_f64().is_some_and(|f| f == self.threshold as f64)
            }
            _ => false,
        }
    }
}

impl PaginationStrategy for ThresholdPaginator {
    fn next(&self, response: &HttpResponse, request: &RequestDescriptor) -> NextPage {
        if !self.is_full_page(&response.body) {
            return NextPage::Done;
        }

        let end = match response.body.get(&self.end_field) {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return NextPage::Done,
        };

        let mut params = request.params.clone();
        params.insert(self.start_param.clone(), end);
        NextPage::Continue(request.rebuild(request.url.clone(), params))
    }
}

// ============================================================================
// No Pagination
// ============================================================================

/// One request per stream
#[derive(Debug, Clone, Copy, Default)]
pub struct SinglePagePaginator;

impl PaginationStrategy for SinglePagePaginator {
    fn next(&self, _response: &HttpResponse, _request: &RequestDescriptor) -> NextPage {
        NextPage::Done
    }
}
