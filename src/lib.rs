//! sheetbridge — REST proxy exposing one Google Sheet as a customer record store.
//!
//! The first row of the configured sheet is treated as a header/schema;
//! every subsequent row is a record, keyed by the column whose name matches
//! the configured identifier field. One designated column holds a
//! JSON-encoded free-form payload.
//!
//! Modules:
//! - config: environment-derived configuration
//! - sheets: native Google Sheets v4 client + credential resolution
//! - store: header-driven record CRUD over sheet rows
//! - http: axum routes for /api/customers
//! - error: HTTP-facing error mapping

pub mod config;
pub mod error;
pub mod http;
pub mod sheets;
pub mod store;
