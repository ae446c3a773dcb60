//! HTTP client with retry and rate limiting
//!
//! A thin, polite HTTP layer for the Airtable REST API: automatic retries
//! with configurable backoff, `Retry-After` handling for 429s, and a token
//! bucket tuned to Airtable's documented 5 requests/second limit.

mod client;
mod rate_limit;


pub use client::{BackoffType, HttpClient, HttpClientConfig, HttpClientConfigBuilder, RequestConfig};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
