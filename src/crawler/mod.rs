//! Network and HTML plumbing behind the crawler operators.
//!
//! The evaluator only talks to the [`Fetcher`] and [`Extractor`] traits, so
//! scripts can run against the real HTTP client and CSS engine or against
//! in-memory doubles.

mod batch;
mod extract;
mod fetch;

pub use batch::{fetch_batch, BatchStream, CancelToken};
pub use extract::{ExtractError, Extracted, Extractor, HtmlExtractor};
pub use fetch::{
    fetch_with_retry, FetchError, FetchOptions, Fetcher, HttpFetcher, Response, RetryPolicy,
};
