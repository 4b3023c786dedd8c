//! Tests for the paginators

use super::*;
use crate::error::Error;
use crate::query::Query;
use crate::routes::Domain;
use crate::types::{FetchOutcome, ReasonCode};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Fetcher replaying a scripted sequence of responses.
///
/// Records every query it receives so tests can assert on page advancement
/// and request counts.
struct ScriptedFetcher {
    responses: Mutex<Vec<Option<Value>>>,
    requests: AtomicUsize,
    queries: Mutex<Vec<Query>>,
}

impl ScriptedFetcher {
    fn new(responses: Vec<Option<Value>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn queries(&self) -> Vec<Query> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch_page(
        &self,
        _domain: Domain,
        _path: &str,
        query: &Query,
    ) -> crate::Result<Option<Value>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().unwrap().push(query.clone());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            panic!("fetcher script exhausted");
        }
        Ok(responses.remove(0))
    }
}

/// One page in the `entries` family
fn entries_page(page: i64, last: i64, ids: &[i64]) -> Value {
    json!({
        "page": page,
        "totalsCount": 0,
        "isLastPage": page >= last,
        "lastPageNumber": last,
        "itemsPerPage": ids.len(),
        "entries": ids.iter().map(|id| json!({"id": id})).collect::<Vec<_>>(),
    })
}

/// One page of anonymous records for the probing loop
fn probe_page(count: usize) -> Value {
    json!({"data": (0..count).map(|i| json!({"n": i})).collect::<Vec<_>>()})
}

fn ids(outcome: &FetchOutcome) -> Vec<i64> {
    outcome
        .records()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_i64().unwrap())
        .collect()
}

// ============================================================================
// Descriptor detection
// ============================================================================

#[test]
fn test_detect_entries_family() {
    let descriptor = PageDescriptor::detect(&entries_page(1, 3, &[1, 2])).unwrap();
    assert_eq!(descriptor.data_key, "entries");
    assert_eq!(descriptor.end, EndCondition::Flag("isLastPage"));

    // Without the boolean flag the last page number drives termination
    let body = json!({"page": 2, "lastPageNumber": 5, "entries": []});
    let descriptor = PageDescriptor::detect(&body).unwrap();
    assert_eq!(descriptor.end, EndCondition::LastPage("lastPageNumber"));
    assert_eq!(descriptor.current_page(&body), 2);
    assert!(!descriptor.is_last_page(&body));
}

#[test]
fn test_detect_data_family() {
    let body = json!({"page": 1, "lastPage": 2, "data": [{"id": 1}]});
    let descriptor = PageDescriptor::detect(&body).unwrap();
    assert_eq!(descriptor.data_key, "data");
    assert_eq!(descriptor.end, EndCondition::LastPage("lastPage"));
    assert!(!descriptor.is_last_page(&body));

    // No page metadata at all means a single page
    let body = json!({"data": [{"id": 1}]});
    let descriptor = PageDescriptor::detect(&body).unwrap();
    assert_eq!(descriptor.end, EndCondition::PageAbsent);
    assert!(descriptor.is_last_page(&body));
}

#[test]
fn test_detect_rejects_unknown_shapes() {
    assert!(PageDescriptor::detect(&json!({"items": []})).is_none());
    assert!(PageDescriptor::detect(&json!({"entries": "nope"})).is_none());
    assert!(PageDescriptor::detect(&json!([1, 2])).is_none());
}

#[test]
fn test_missing_metadata_counts_as_final() {
    // A later page that lost its flag must not loop forever
    let descriptor = PageDescriptor::detect(&entries_page(1, 2, &[1])).unwrap();
    assert!(descriptor.is_last_page(&json!({"entries": [{"id": 9}]})));
}

// ============================================================================
// Standard paginator
// ============================================================================

#[tokio::test]
async fn test_pages_concatenate_in_order() {
    let fetcher = ScriptedFetcher::new(vec![
        Some(entries_page(1, 3, &[1, 2])),
        Some(entries_page(2, 3, &[3, 4])),
        Some(entries_page(3, 3, &[5])),
    ]);

    let outcome = collect_all_pages(&fetcher, Domain::Orders, "", &Query::new())
        .await
        .unwrap();
    assert_eq!(ids(&outcome), vec![1, 2, 3, 4, 5]);
    assert_eq!(fetcher.requests(), 3);

    // The page parameter advanced between requests
    let queries = fetcher.queries();
    assert_eq!(queries[0].get_i64("page"), None);
    assert_eq!(queries[1].get_i64("page"), Some(2));
    assert_eq!(queries[2].get_i64("page"), Some(3));
}

#[tokio::test]
async fn test_single_page_needs_one_request() {
    let fetcher = ScriptedFetcher::new(vec![Some(entries_page(1, 1, &[7]))]);
    let outcome = collect_all_pages(&fetcher, Domain::Orders, "", &Query::new())
        .await
        .unwrap();
    assert_eq!(ids(&outcome), vec![7]);
    assert_eq!(fetcher.requests(), 1);
}

#[tokio::test]
async fn test_data_family_pagination() {
    let fetcher = ScriptedFetcher::new(vec![
        Some(json!({"page": 1, "lastPage": 2, "data": [{"id": 1}]})),
        Some(json!({"page": 2, "lastPage": 2, "data": [{"id": 2}]})),
    ]);
    let outcome = collect_all_pages(&fetcher, Domain::PropertiesV2, "", &Query::new())
        .await
        .unwrap();
    assert_eq!(ids(&outcome), vec![1, 2]);
    assert_eq!(fetcher.requests(), 2);
}

#[tokio::test]
async fn test_flat_array_body_is_returned_directly() {
    let fetcher = ScriptedFetcher::new(vec![Some(json!([{"id": 1}, {"id": 2}]))]);
    let outcome = collect_all_pages(&fetcher, Domain::Referrers, "", &Query::new())
        .await
        .unwrap();
    assert_eq!(ids(&outcome), vec![1, 2]);
}

#[tokio::test]
async fn test_intermediate_error_discards_partial_records() {
    let fetcher = ScriptedFetcher::new(vec![
        Some(entries_page(1, 3, &[1, 2])),
        Some(json!({"error": {"message": "internal error", "code": 0}})),
    ]);

    let outcome = collect_all_pages(&fetcher, Domain::Orders, "", &Query::new())
        .await
        .unwrap();
    let error = outcome.error().expect("expected an error outcome");
    assert_eq!(error.code, ReasonCode::ServerError);
    assert!(outcome.records().is_none());
}

#[tokio::test]
async fn test_first_page_error_is_error_outcome() {
    let fetcher = ScriptedFetcher::new(vec![Some(json!({"error": "access_denied"}))]);
    let outcome = collect_all_pages(&fetcher, Domain::Orders, "", &Query::new())
        .await
        .unwrap();
    assert_eq!(
        outcome.error().unwrap().code,
        ReasonCode::Other("access_denied".to_string())
    );
}

#[tokio::test]
async fn test_missing_body_is_empty_outcome() {
    let fetcher = ScriptedFetcher::new(vec![None]);
    let outcome = collect_all_pages(&fetcher, Domain::Orders, "", &Query::new())
        .await
        .unwrap();
    assert!(outcome.is_empty());

    // Also when a later page vanishes
    let fetcher = ScriptedFetcher::new(vec![Some(entries_page(1, 2, &[1])), None]);
    let outcome = collect_all_pages(&fetcher, Domain::Orders, "", &Query::new())
        .await
        .unwrap();
    assert!(outcome.is_empty());
}

#[tokio::test]
async fn test_unknown_shape_is_hard_error() {
    let fetcher = ScriptedFetcher::new(vec![Some(json!({"surprise": true}))]);
    let err = collect_all_pages(&fetcher, Domain::Orders, "", &Query::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnknownResponseShape));
}

// ============================================================================
// Probing paginator
// ============================================================================

#[tokio::test]
async fn test_probing_collects_until_short_page() {
    let fetcher = ScriptedFetcher::new(vec![
        Some(probe_page(100)),
        Some(probe_page(100)),
        Some(probe_page(43)),
    ]);

    let outcome = collect_unpaginated(&fetcher, Domain::BiRawData, "/files", &Query::new())
        .await
        .unwrap();
    assert_eq!(outcome.records().unwrap().len(), 243);
    assert_eq!(fetcher.requests(), 3);

    // The probe forces its page size and walks the pages from 1
    let queries = fetcher.queries();
    assert_eq!(queries[0].get_i64("itemsPerPage"), Some(100));
    assert_eq!(queries[0].get_i64("page"), Some(1));
    assert_eq!(queries[2].get_i64("page"), Some(3));
}

#[tokio::test]
async fn test_probing_keeps_caller_page_size() {
    let fetcher = ScriptedFetcher::new(vec![Some(probe_page(50)), Some(probe_page(12))]);
    let query = Query::new().with("itemsPerPage", 50_i64);

    let outcome = collect_unpaginated(&fetcher, Domain::BiRawData, "/files", &query)
        .await
        .unwrap();
    assert_eq!(outcome.records().unwrap().len(), 62);
    assert_eq!(fetcher.requests(), 2);

    // The caller's size is what went over the wire and what ended the loop
    let queries = fetcher.queries();
    assert_eq!(queries[0].get_i64("itemsPerPage"), Some(50));
    assert_eq!(queries[1].get_i64("itemsPerPage"), Some(50));
}

#[tokio::test]
async fn test_probing_exactly_full_page_costs_one_extra_request() {
    let fetcher = ScriptedFetcher::new(vec![Some(probe_page(100)), Some(probe_page(0))]);
    let outcome = collect_unpaginated(&fetcher, Domain::BiRawData, "/files", &Query::new())
        .await
        .unwrap();
    assert_eq!(outcome.records().unwrap().len(), 100);
    assert_eq!(fetcher.requests(), 2);
}

#[tokio::test]
async fn test_probing_short_first_page_stops_immediately() {
    let fetcher = ScriptedFetcher::new(vec![Some(probe_page(17))]);
    let outcome = collect_unpaginated(&fetcher, Domain::BiRawData, "/files", &Query::new())
        .await
        .unwrap();
    assert_eq!(outcome.records().unwrap().len(), 17);
    assert_eq!(fetcher.requests(), 1);
}

#[tokio::test]
async fn test_probing_error_and_missing_body() {
    let fetcher = ScriptedFetcher::new(vec![
        Some(probe_page(100)),
        Some(json!({"error": {"message": "boom"}})),
    ]);
    let outcome = collect_unpaginated(&fetcher, Domain::BiRawData, "/files", &Query::new())
        .await
        .unwrap();
    assert!(outcome.error().is_some());

    let fetcher = ScriptedFetcher::new(vec![None]);
    let outcome = collect_unpaginated(&fetcher, Domain::BiRawData, "/files", &Query::new())
        .await
        .unwrap();
    assert!(outcome.is_empty());
}

#[tokio::test]
async fn test_probing_accepts_flat_array_pages() {
    let fetcher = ScriptedFetcher::new(vec![Some(json!([{"id": 1}, {"id": 2}]))]);
    let outcome = collect_unpaginated(&fetcher, Domain::BiRawData, "/files", &Query::new())
        .await
        .unwrap();
    assert_eq!(outcome.records().unwrap().len(), 2);
}
