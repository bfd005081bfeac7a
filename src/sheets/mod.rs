//! Native Google Sheets API client.
//!
//! Talks to the Sheets v4 REST endpoints directly over reqwest instead of
//! going through the generated google_sheets4 bindings. Token acquisition
//! is delegated to the service-account authenticator built in
//! `credentials`.
//!
//! Modules:
//! - credentials: service-account key resolution + authenticator
//! - values: values get/append/update, metadata lookup, row deletion

pub mod credentials;
pub mod values;

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

pub use credentials::CredentialSource;
pub use values::SheetsClient;

/// OAuth scope required for every operation the proxy performs.
pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Last column any operation reads or writes. Sheets wider than column Z
/// are not supported.
pub const MAX_COLUMN: &str = "Z";

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Sheets API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Authorization failed: {0}")]
    Auth(String),

    #[error("Credentials not found at {0}")]
    CredentialsNotFound(PathBuf),

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Sheet not found in spreadsheet: {0}")]
    SheetNotFound(String),

    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// The spreadsheet operations the record store needs.
///
/// `SheetsClient` implements this against the live API; tests substitute an
/// in-memory sheet. Row numbering follows the grid: `row_number` is the
/// 1-based sheet row (header = 1), `row_index` the 0-based grid index.
#[async_trait]
pub trait SheetsBackend: Send + Sync {
    /// Read the full `A1:Z` range of the sheet. Rows may be ragged; the
    /// API omits trailing empty cells.
    async fn read_rows(&self, sheet: &str) -> Result<Vec<Vec<String>>, SheetsError>;

    /// Read only the header row (`A1:Z1`).
    async fn read_header(&self, sheet: &str) -> Result<Vec<Vec<String>>, SheetsError>;

    /// Append one row after the last row of the range.
    async fn append_row(&self, sheet: &str, row: Vec<String>) -> Result<(), SheetsError>;

    /// Overwrite the row at the given 1-based sheet position.
    async fn write_row(
        &self,
        sheet: &str,
        row_number: usize,
        row: Vec<String>,
    ) -> Result<(), SheetsError>;

    /// Physically remove the row at the given 0-based grid index. Later
    /// rows shift up, so any previously computed row position is stale
    /// after this returns.
    async fn delete_row(&self, sheet: &str, row_index: usize) -> Result<(), SheetsError>;
}
