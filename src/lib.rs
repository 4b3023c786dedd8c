//! # plenty-rest
//!
//! A Rust client for the PlentyMarkets REST API.
//!
//! ## Features
//!
//! - **Multiple Login Strategies**: stored, interactive, plain, encrypted
//!   file, platform managed
//! - **Pagination-Aware Fetching**: response shape detection, automatic page
//!   collection, probing mode for endpoints without pagination metadata
//! - **Rate-Limit Recovery**: transparent retry on API throttling
//! - **Structured or Tabular Output**: choose once per session
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use plenty_rest::{LoginMethod, OutputFormat, PlentyClient, PlentyConfig, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = PlentyConfig::builder("https://shop.plentymarkets-cloud01.com")
//!         .login(LoginMethod::plain("user", "secret"))
//!         .output_format(OutputFormat::Structured)
//!         .build();
//!
//!     // Authenticates immediately; failure here is terminal.
//!     let client = PlentyClient::connect(config).await?;
//!
//!     let orders = client
//!         .get_orders_by_date("2023-05-01", "2023-05-02", Default::default(), None, None)
//!         .await?;
//!
//!     for order in orders.records().unwrap_or_default() {
//!         // Process orders
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        PlentyClient                             │
//! │  connect() → Session      fetch() → FetchOutcome                │
//! │  ~35 resource methods (orders, items, attributes, stock, ...)   │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────┬────────────┬──────┴────────┬────────────┬───────────┐
//! │   Auth   │    HTTP    │   Paginate    │   Query    │  Output   │
//! ├──────────┼────────────┼───────────────┼────────────┼───────────┤
//! │ Stored   │ GET/POST   │ Shape detect  │ Sanitize   │ Records   │
//! │ Prompt   │ PUT        │ Page loop     │ Dates      │ Table     │
//! │ Plain    │ 429 retry  │ Probing loop  │ Payloads   │           │
//! │ File     │ Bearer     │               │            │           │
//! └──────────┴────────────┴───────────────┴────────────┴───────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the client
pub mod error;

/// Common types: records, outcomes, output formats
pub mod types;

/// Resource domains and static route/validation tables
pub mod routes;

/// Query building, sanitization, date handling and payload validation
pub mod query;

/// Login strategies and the authenticator
pub mod auth;

/// Request executor with rate-limit recovery
pub mod http;

/// Response shape detection and pagination loops
pub mod pagination;

/// The PlentyMarkets client and its resource methods
pub mod client;

/// Redistribution/reorder templates and transaction builders
pub mod transfer;

/// Result post-processing: VAT tables, attribute maps, package summaries
pub mod mappings;

/// Tabular projection of record sequences
pub mod tabular;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

pub use auth::{Authenticator, Credentials, LoginMethod};
pub use client::{AvailabilityTarget, PlentyClient, PlentyConfig, StockBooking};
pub use routes::Domain;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
