//! Query building, sanitization and date handling
//!
//! A [`Query`] is owned by exactly one in-flight fetch operation. The
//! paginators advance its `page` key between iterations, so it must never be
//! shared across concurrently active fetches.

use crate::routes::{normalize_language, Domain};
use crate::types::{ApiError, ReasonCode};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{error, info};

// ============================================================================
// Query
// ============================================================================

/// A single query parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    /// A plain string value
    Str(String),
    /// An integer value
    Int(i64),
    /// A list value, encoded as repeated keys (e.g. `with[]`)
    List(Vec<String>),
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u64> for QueryValue {
    fn from(value: u64) -> Self {
        Self::Int(value as i64)
    }
}

impl From<Vec<String>> for QueryValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

/// Query parameters for one fetch operation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    params: BTreeMap<String, QueryValue>,
}

impl Query {
    /// Create an empty query
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a parameter
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<QueryValue>) {
        self.params.insert(key.into(), value.into());
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert only if the key is not already present
    pub fn ensure(&mut self, key: &str, value: impl Into<QueryValue>) {
        if !self.params.contains_key(key) {
            self.params.insert(key.to_string(), value.into());
        }
    }

    /// Check whether a parameter is present
    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Read a parameter as an integer
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        match self.params.get(key)? {
            QueryValue::Int(value) => Some(*value),
            QueryValue::Str(value) => value.parse().ok(),
            QueryValue::List(_) => None,
        }
    }

    /// Advance the page parameter; the paginators call this between requests
    pub fn set_page(&mut self, page: i64) {
        self.insert("page", page);
    }

    /// Check whether the query has any parameters
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Flatten into key/value pairs for the query string.
    ///
    /// Lists become repeated keys, matching the API's `with[]=a&with[]=b`
    /// convention.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.params.len());
        for (key, value) in &self.params {
            match value {
                QueryValue::Str(v) => pairs.push((key.clone(), v.clone())),
                QueryValue::Int(v) => pairs.push((key.clone(), v.to_string())),
                QueryValue::List(values) => {
                    for v in values {
                        pairs.push((key.clone(), v.clone()));
                    }
                }
            }
        }
        pairs
    }
}

impl<K: Into<String>, V: Into<QueryValue>> FromIterator<(K, V)> for Query {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut query = Self::new();
        for (key, value) in iter {
            query.insert(key, value);
        }
        query
    }
}

// ============================================================================
// Sanitization
// ============================================================================

/// Merge filters and field selections into the query, dropping anything the
/// domain does not accept.
///
/// Invalid refine keys and additional values are removed with a log line.
/// An invalid language is rejected before any network call.
pub fn sanitize_query(
    domain: Domain,
    mut query: Query,
    refine: Option<&Query>,
    additional: Option<&[&str]>,
    lang: Option<&str>,
) -> std::result::Result<Query, ApiError> {
    if let Some(refine) = refine {
        for (key, value) in &refine.params {
            if domain.refine_keys().contains(&key.as_str()) {
                query.params.insert(key.clone(), value.clone());
            } else {
                info!("Invalid refine argument key removed: {key}");
            }
        }
    }

    if let Some(additional) = additional {
        let valid: Vec<&str> = additional
            .iter()
            .copied()
            .filter(|value| {
                let ok = domain.additional_values().contains(value);
                if !ok {
                    info!("Invalid additional argument removed: {value}");
                }
                ok
            })
            .collect();
        if !valid.is_empty() {
            if domain.uses_array_with() {
                let values: Vec<String> = valid.iter().map(ToString::to_string).collect();
                query.insert("with[]", values);
            } else {
                query.insert("with", valid.join(","));
            }
        }
    }

    if let Some(lang) = lang {
        match normalize_language(lang) {
            Some(lang) => query.insert("lang", lang),
            None => {
                error!("Invalid language abbreviation: {lang}");
                return Err(ApiError::new(ReasonCode::InvalidLanguage));
            }
        }
    }

    Ok(query)
}

// ============================================================================
// Dates
// ============================================================================

/// The order date an export filters on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateType {
    /// Order creation
    #[default]
    Creation,
    /// Last change
    Change,
    /// Payment booked
    Payment,
    /// Outgoing items booked
    Delivery,
}

impl DateType {
    fn argument(self) -> &'static str {
        match self {
            Self::Creation => "created",
            Self::Change => "updated",
            Self::Payment => "paid",
            Self::Delivery => "outgoingItemsBooked",
        }
    }
}

/// Start and end of a date filter, both in W3C format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    /// Range start, inclusive
    pub start: String,
    /// Range end, inclusive
    pub end: String,
}

/// Format the local UTC offset as `+HH:MM`
fn local_utc_offset() -> String {
    format_utc_offset(Local::now().offset().local_minus_utc())
}

/// Format an offset in seconds as `+HH:MM`, keeping half-hour zones intact
fn format_utc_offset(seconds: i32) -> String {
    let (sign, seconds) = if seconds < 0 {
        ('-', -seconds)
    } else {
        ('+', seconds)
    };
    format!("{sign}{:02}:{:02}", seconds / 3600, (seconds % 3600) / 60)
}

/// Parse a date string into the W3C format the API requires.
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM`, `YYYY-MM-DDTHH:MM:SS` and fully
/// offset-qualified timestamps. Dates without an offset get the local one.
pub fn parse_w3c_date(input: &str) -> Option<String> {
    if let Ok(date) = DateTime::parse_from_rfc3339(input) {
        return Some(date.format("%Y-%m-%dT%H:%M:%S%:z").to_string());
    }
    if let Ok(date) = DateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(date.format("%Y-%m-%dT%H:%M:%S%:z").to_string());
    }
    let naive = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(input, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;
    Some(format!(
        "{}{}",
        naive.format("%Y-%m-%dT%H:%M:%S"),
        local_utc_offset()
    ))
}

/// Build a W3C date range from two date strings
pub fn build_date_range(start: &str, end: &str) -> Option<DateRange> {
    let start = parse_w3c_date(start)?;
    let end = parse_w3c_date(end)?;
    Some(DateRange { start, end })
}

/// Check that the range is a valid, non-empty range in the past
pub fn check_date_range(range: &DateRange) -> bool {
    let (Ok(start), Ok(end)) = (
        DateTime::parse_from_rfc3339(&range.start),
        DateTime::parse_from_rfc3339(&range.end),
    ) else {
        error!("invalid date {} -> {}", range.start, range.end);
        return false;
    };

    if start > end {
        error!("Date range check failure: end is before the start");
        return false;
    }
    if start == end {
        error!("Date range check failure: start is equal to end");
        return false;
    }
    let now = Local::now().fixed_offset();
    if start > now || end > now {
        error!("Date range check failure: range is or ends in the future");
        return false;
    }
    true
}

/// Build the date filter parameters for an order export
pub fn build_query_date(range: &DateRange, date_type: DateType) -> Query {
    let argument = date_type.argument();
    let mut query = Query::new();
    query.insert(format!("{argument}AtFrom"), range.start.as_str());
    query.insert(format!("{argument}AtTo"), range.end.as_str());
    query
}

static LEADING_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{2,}").unwrap());

/// Parse a date string into a unix timestamp.
///
/// Rejects dates that do not start with a plausible year, so day-first
/// formats cannot be misread.
pub fn date_to_timestamp(input: &str) -> Option<i64> {
    let leading = LEADING_NUMBER.find(input)?;
    if leading.as_str().parse::<i64>().ok()? < 2000 {
        return None;
    }
    let w3c = parse_w3c_date(input)?;
    let date = DateTime::parse_from_rfc3339(&w3c).ok()?;
    Some(date.timestamp())
}

// ============================================================================
// Payload validation
// ============================================================================

/// The POST routes with a minimum-required-field contract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// POST /rest/items
    Items,
    /// POST /rest/items/{id}/variations
    Variations,
    /// POST /rest/items/attributes
    Attributes,
    /// POST /rest/items/attributes/{id}/values
    AttributeValues,
    /// POST /rest/orders/items/{id}/transactions
    Transactions,
}

/// Expected shape of a required payload field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Number,
    String,
    Object,
    ObjectList,
}

impl PayloadKind {
    fn required_fields(self) -> &'static [(&'static str, FieldKind)] {
        match self {
            Self::Items => &[("variations", FieldKind::ObjectList)],
            Self::Variations => &[
                ("unit", FieldKind::Object),
                ("variationCategories", FieldKind::ObjectList),
            ],
            Self::Attributes | Self::AttributeValues => &[("backendName", FieldKind::String)],
            Self::Transactions => &[
                ("quantity", FieldKind::Number),
                ("direction", FieldKind::String),
                ("status", FieldKind::String),
            ],
        }
    }
}

fn field_filled(field: &Value, kind: FieldKind) -> bool {
    match kind {
        FieldKind::Number => field.is_number(),
        FieldKind::String => field.as_str().is_some_and(|s| !s.is_empty()),
        FieldKind::Object => field.as_object().is_some_and(|o| !o.is_empty()),
        FieldKind::ObjectList => field.as_array().is_some_and(|list| {
            !list.is_empty()
                && list
                    .iter()
                    .all(|e| e.as_object().is_some_and(|o| !o.is_empty()))
        }),
    }
}

/// Check that a POST body carries the minimum required fields for its route
pub fn validate_payload(kind: PayloadKind, payload: &Value) -> bool {
    let Some(object) = payload.as_object() else {
        error!("payload for {kind:?} must be a JSON object");
        return false;
    };
    for (field, field_kind) in kind.required_fields() {
        let Some(value) = object.get(*field) else {
            error!("missing required field '{field}' for {kind:?} creation");
            return false;
        };
        if !field_filled(value, *field_kind) {
            error!("empty required field '{field}' for {kind:?} creation");
            return false;
        }
    }
    true
}
