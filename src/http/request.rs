//! Request and response descriptors
//!
//! A `RequestDescriptor` is a value: pagination strategies return a new one
//! instead of editing the one in flight.

use reqwest::header::HeaderMap;
use serde_json::Value;
use std::collections::HashMap;

const CONTENT_TYPE: &str = "Content-Type";
const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Everything needed to issue one page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    /// Absolute URL without query string
    pub url: String,
    /// Request headers; `Content-Type` is always present
    pub headers: HashMap<String, String>,
    /// Query parameters
    pub params: HashMap<String, String>,
}

impl RequestDescriptor {
    /// Create a descriptor with the default content type and no parameters
    pub fn new(url: impl Into<String>) -> Self {
        let mut headers = HashMap::new();
        headers.insert(CONTENT_TYPE.to_string(), DEFAULT_CONTENT_TYPE.to_string());
        Self {
            url: url.into(),
            headers,
            params: HashMap::new(),
        }
    }

    /// Set a header, replacing any existing header with the same name in any casing
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        self.headers.retain(|k, _| !k.eq_ignore_ascii_case(&key));
        self.headers.insert(key, value.into());
        self
    }

    /// Set a query parameter
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// New descriptor for a different URL and parameter set, keeping the headers
    pub fn rebuild(&self, url: impl Into<String>, params: HashMap<String, String>) -> Self {
        Self {
            url: url.into(),
            headers: self.headers.clone(),
            params,
        }
    }

    /// Header lookup ignoring case
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

/// A successful response with its body already parsed
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Status code (always 2xx when returned by the client)
    pub status: u16,
    /// Final URL of the request
    pub url: String,
    /// Response headers
    pub headers: HeaderMap,
    /// Parsed JSON body; `Null` for an empty body
    pub body: Value,
}

impl HttpResponse {
    /// Build a response by hand (for strategies and tests)
    pub fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            url: String::new(),
            headers: HeaderMap::new(),
            body,
        }
    }

    /// Attach a header; invalid names or values are ignored
    #[must_use]
    pub fn with_header(mut self, key: &'static str, value: &str) -> Self {
        if let Ok(value) = value.parse() {
            self.headers.insert(key, value);
        }
        self
    }

    /// URL of the `Link` header relation `rel`, if any
    pub fn link(&self, rel: &str) -> Option<String> {
        self.headers
            .get_all("link")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|header| parse_link_header(header, rel))
    }
}

/// Parse a Link header and extract the URL for the given rel
///
/// Format: `<url>; rel="next", <url>; rel="prev"`. A relation list such as
/// `rel="next last"` matches each of its members. Link values are delimited
/// by their `<...>` targets, so commas inside a URL are kept.
pub fn parse_link_header(header: &str, target_rel: &str) -> Option<String> {
    let mut rest = header;

    while let Some(open) = rest.find('<') {
        let target = &rest[open + 1..];
        let close = target.find('>')?;
        let url = &target[..close];

        let tail = &target[close + 1..];
        let params_end = tail.find('<').unwrap_or(tail.len());
        if link_rels(&tail[..params_end]).any(|rel| rel == target_rel) {
            return Some(url.trim().to_string());
        }

        rest = &tail[params_end..];
    }

    None
}

/// Relation names in the parameter part of one link value
fn link_rels(params: &str) -> impl Iterator<Item = &str> {
    params
        .split([';', ','])
        .filter_map(|param| {
            let (key, value) = param.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("rel")
                .then(|| value.trim().trim_matches('"').trim_matches('\''))
        })
        .flat_map(str::split_whitespace)
}
