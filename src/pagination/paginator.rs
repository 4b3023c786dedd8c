//! Page accumulation

use super::types::PageDescriptor;
use crate::error::{Error, Result};
use crate::query::Query;
use crate::routes::Domain;
use crate::types::{ApiError, FetchOutcome, RecordSequence};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

/// Page size forced by the probing paginator
pub const PROBE_PAGE_SIZE: i64 = 100;

/// The fetch seam between the paginators and the HTTP layer.
///
/// `RequestExecutor` is the production implementation; tests substitute
/// scripted fetchers to drive the accumulation loops without a server.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch one page, returning `None` when the server produced no
    /// decodable body
    async fn fetch_page(&self, domain: Domain, path: &str, query: &Query)
        -> Result<Option<Value>>;
}

/// Fetch every page of a route that reports page metadata and concatenate
/// the records in page order.
///
/// The first page decides everything: a flat array is returned as-is, a
/// body carrying an `error` key becomes an error outcome, and a recognized
/// paginated shape drives the loop. Any failure on a later page discards
/// the records collected so far.
pub async fn collect_all_pages(
    fetcher: &dyn PageFetcher,
    domain: Domain,
    path: &str,
    query: &Query,
) -> Result<FetchOutcome> {
    let mut query = query.clone();

    let first = match fetcher.fetch_page(domain, path, &query).await? {
        Some(body) => body,
        None => return Ok(FetchOutcome::Empty),
    };
    if let Some(error) = ApiError::from_payload(&first) {
        return Ok(FetchOutcome::Error(error));
    }
    if let Value::Array(records) = first {
        return Ok(FetchOutcome::Records(records));
    }

    let Some(descriptor) = PageDescriptor::detect(&first) else {
        return Err(Error::UnknownResponseShape);
    };
    debug!("detected page descriptor: {descriptor:?}");

    let mut records: RecordSequence = descriptor.records(&first).to_vec();
    let mut body = first;
    while !descriptor.is_last_page(&body) {
        query.set_page(descriptor.current_page(&body) + 1);
        body = match fetcher.fetch_page(domain, path, &query).await? {
            Some(body) => body,
            None => return Ok(FetchOutcome::Empty),
        };
        if let Some(error) = ApiError::from_payload(&body) {
            return Ok(FetchOutcome::Error(error));
        }
        records.extend_from_slice(descriptor.records(&body));
    }

    Ok(FetchOutcome::Records(records))
}

/// Fetch every page of a route that reports no usable page metadata.
///
/// Defaults `itemsPerPage` to [`PROBE_PAGE_SIZE`] when the caller did not
/// choose a size, and walks the pages from 1, stopping as soon as a page
/// (the first one included) comes back short of the effective size. An
/// exactly-full final page costs one extra request that returns an empty
/// page.
pub async fn collect_unpaginated(
    fetcher: &dyn PageFetcher,
    domain: Domain,
    path: &str,
    query: &Query,
) -> Result<FetchOutcome> {
    let mut query = query.clone();
    query.ensure("itemsPerPage", PROBE_PAGE_SIZE);
    let page_size = query.get_i64("itemsPerPage").unwrap_or(PROBE_PAGE_SIZE);

    let mut records = RecordSequence::new();
    let mut page = 1;
    loop {
        query.set_page(page);
        let body = match fetcher.fetch_page(domain, path, &query).await? {
            Some(body) => body,
            None => return Ok(FetchOutcome::Empty),
        };
        if let Some(error) = ApiError::from_payload(&body) {
            return Ok(FetchOutcome::Error(error));
        }

        let page_records = extract_records(&body)?;
        let count = page_records.len() as i64;
        records.extend_from_slice(page_records);
        if count < page_size {
            break;
        }
        page += 1;
    }

    Ok(FetchOutcome::Records(records))
}

/// Pull the record array out of a probed page, whatever its wrapping
fn extract_records(body: &Value) -> Result<&[Value]> {
    if let Some(records) = body.as_array() {
        return Ok(records);
    }
    match PageDescriptor::detect(body) {
        Some(descriptor) => Ok(descriptor.records(body)),
        None => Err(Error::UnknownResponseShape),
    }
}
