//! HTTP request execution
//!
//! One executor per session. Every request carries the session's bearer
//! token; HTTP 429 is recovered locally by waiting out the throttle window
//! and retrying the same request, invisible to callers except via latency.

mod executor;

pub use executor::{ExecutorConfig, RequestExecutor};
