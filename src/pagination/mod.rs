//! Pagination
//!
//! Two accumulation strategies over the same fetch seam:
//!
//! - [`collect_all_pages`] follows the page metadata the server reports
//!   (`page`, `lastPageNumber`/`isLastPage` or their `data` family
//!   equivalents) and concatenates every page in order.
//! - [`collect_unpaginated`] probes routes that report no usable page
//!   metadata by forcing a fixed page size and stopping at the first short
//!   page.
//!
//! Both are strictly sequential. A failure on any page discards everything
//! collected so far; callers never see a silently truncated sequence.

mod paginator;
mod types;

pub use paginator::{collect_all_pages, collect_unpaginated, PageFetcher, PROBE_PAGE_SIZE};
pub use types::{EndCondition, PageDescriptor};

#[cfg(test)]
mod tests;
