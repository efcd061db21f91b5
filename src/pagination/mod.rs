//! Pagination module
//!
//! Supports: Link header (`next`), count threshold (`precise`), single page
//!
//! # Overview
//!
//! A `PaginationStrategy` looks at a page's response and the request that
//! produced it and returns either the next request or `Done`. Strategies are
//! pure: they never touch the network, state or the request in flight, and
//! every input (missing headers, malformed bodies) maps to a defined result.

mod strategies;
mod types;

pub use strategies::{LinkPaginator, SinglePagePaginator, ThresholdPaginator};
pub use types::{NextPage, PaginationStrategy};
