//! Pagination types and traits

use super::strategies::{LinkPaginator, SinglePagePaginator, ThresholdPaginator};
use crate::http::{HttpResponse, RequestDescriptor};
use crate::types::PaginationMode;

/// Result of the next page computation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextPage {
    /// Issue this request next
    Continue(RequestDescriptor),
    /// No more pages
    Done,
}

impl NextPage {
    /// Check if this is a done result
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Check if this is a continue result
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue(_))
    }

    /// The next request, if any
    pub fn into_request(self) -> Option<RequestDescriptor> {
        match self {
            Self::Continue(request) => Some(request),
            Self::Done => None,
        }
    }
}

/// Decides the request for the following page
pub trait PaginationStrategy: Send + Sync + std::fmt::Debug {
    /// Compute the next request from the page just received
    fn next(&self, response: &HttpResponse, request: &RequestDescriptor) -> NextPage;
}

impl PaginationMode {
    /// Build the strategy for this mode
    pub fn build(self) -> Box<dyn PaginationStrategy> {
        match self {
            PaginationMode::None => Box::new(SinglePagePaginator),
            PaginationMode::Next => Box::new(LinkPaginator::default()),
            PaginationMode::Precise => Box::new(ThresholdPaginator::default()),
        }
    }
}
