//! Response shape detection
//!
//! The API paginates in two dialects. The common one wraps records in
//! `entries` next to `page`, `lastPageNumber` and sometimes an `isLastPage`
//! flag; a handful of newer routes wrap them in `data` next to `page` and
//! `lastPage`, or omit the page metadata entirely on the final page. The
//! descriptor is sniffed once from the first page and reused for the rest
//! of the fetch.

use serde_json::Value;

/// How a response signals that the final page has been reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndCondition {
    /// A boolean key that is `true` on the final page
    Flag(&'static str),
    /// A numeric key holding the number of the final page
    LastPage(&'static str),
    /// The page key disappears on (or after) the final page
    PageAbsent,
}

/// Describes where one response family keeps its records and page metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageDescriptor {
    /// Key holding the record array
    pub data_key: &'static str,
    /// Key holding the current page number
    pub page_key: &'static str,
    /// How the final page announces itself
    pub end: EndCondition,
}

impl PageDescriptor {
    /// Sniff the response family from a decoded first page.
    ///
    /// Returns `None` when the body matches neither family; flat arrays are
    /// handled by the paginator before detection runs.
    pub fn detect(body: &Value) -> Option<Self> {
        let object = body.as_object()?;

        if object.get("entries").is_some_and(Value::is_array) {
            let end = if object.get("isLastPage").is_some_and(Value::is_boolean) {
                EndCondition::Flag("isLastPage")
            } else {
                EndCondition::LastPage("lastPageNumber")
            };
            return Some(Self {
                data_key: "entries",
                page_key: "page",
                end,
            });
        }

        if object.get("data").is_some_and(Value::is_array) {
            let end = if object.contains_key("page") {
                EndCondition::LastPage("lastPage")
            } else {
                EndCondition::PageAbsent
            };
            return Some(Self {
                data_key: "data",
                page_key: "page",
                end,
            });
        }

        None
    }

    /// The record array of one page
    pub fn records<'a>(&self, body: &'a Value) -> &'a [Value] {
        body.get(self.data_key)
            .and_then(Value::as_array)
            .map_or(&[], Vec::as_slice)
    }

    /// The page number the server reports for this body
    pub fn current_page(&self, body: &Value) -> i64 {
        body.get(self.page_key).and_then(Value::as_i64).unwrap_or(1)
    }

    /// Check whether this body is the final page.
    ///
    /// Missing or unreadable metadata counts as final; the paginator must
    /// never loop on a body it cannot interpret.
    pub fn is_last_page(&self, body: &Value) -> bool {
        match self.end {
            EndCondition::Flag(key) => body.get(key).and_then(Value::as_bool).unwrap_or(true),
            EndCondition::LastPage(key) => match body.get(key).and_then(Value::as_i64) {
                Some(last) => self.current_page(body) >= last,
                None => true,
            },
            EndCondition::PageAbsent => body.get(self.page_key).is_none(),
        }
    }
}
