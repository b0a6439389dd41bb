//! Core library for rappelconso
//!
//! This crate implements the **Functional Core** of the rappelconso application,
//! following the Functional Core - Imperative Shell architectural pattern.
//!
//! # Architecture Overview
//!
//! The rappelconso project uses a two-crate architecture to enforce separation of concerns:
//!
//! - **`rappelconso_core`** (this crate): Pure transformation functions with zero I/O
//! - **`rappelconso`**: HTTP calls, CLI and MCP server (the Imperative Shell)
//!
//! ## Functional Core Principles
//!
//! All functions in this crate adhere to these principles:
//!
//! - **Pure functions**: Same input always produces the same output
//! - **No side effects**: No I/O operations, no external state mutations
//! - **Testable**: Can be tested with simple fixture data, no mocking required
//!
//! # Module Organization
//!
//! - [`schema`]: The normalized recall record, its field allow-list and the result envelope
//! - [`filter`]: Translation of filter expressions into the upstream `where` dialect
//! - [`params`]: Validation of tool inputs and construction of upstream query parameters
//! - [`normalize`]: Conversion of the upstream response envelopes into the result model
//! - [`error`]: The structured error returned by every tool operation
//! - [`prompt`]: Prompt templates exposed next to the tools
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use rappelconso_core::normalize::{normalize_records, Outcome, UpstreamBody};
//!
//! let body = UpstreamBody::Json(serde_json::json!({
//!     "total_count": 1,
//!     "results": [{ "libelle": "Chocolat noir", "date_publication": "2024-05-02" }]
//! }));
//!
//! if let Outcome::Normalized(envelope) = normalize_records(&body) {
//!     assert_eq!(envelope.results[0].libelle, "Chocolat noir");
//! }
//! ```

pub mod error;
pub mod filter;
pub mod normalize;
pub mod params;
pub mod prompt;
pub mod schema;
