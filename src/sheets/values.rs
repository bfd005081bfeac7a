//! Sheets v4 REST calls: values get/append/update, spreadsheet metadata,
//! and row deletion via `batchUpdate`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::credentials::SheetsAuthenticator;
use super::{SheetsBackend, SheetsError, MAX_COLUMN, SPREADSHEETS_SCOPE};

const BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

// ============================================================================
// Raw API response types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValueRangeResponse {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    #[serde(default)]
    sheet_id: i64,
    #[serde(default)]
    title: String,
}

// ============================================================================
// Client
// ============================================================================

/// Live Sheets v4 client.
pub struct SheetsClient {
    http: reqwest::Client,
    auth: SheetsAuthenticator,
    spreadsheet_id: String,
}

impl SheetsClient {
    pub fn new(auth: SheetsAuthenticator, spreadsheet_id: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            auth,
            spreadsheet_id,
        }
    }

    async fn bearer(&self) -> Result<String, SheetsError> {
        let token = self
            .auth
            .token(&[SPREADSHEETS_SCOPE])
            .await
            .map_err(|e| SheetsError::Auth(e.to_string()))?;
        token
            .token()
            .map(str::to_string)
            .ok_or_else(|| SheetsError::Auth("authenticator returned no access token".to_string()))
    }

    fn values_url(&self, range: &str) -> String {
        format!("{}/{}/values/{}", BASE_URL, self.spreadsheet_id, range)
    }

    async fn get_range(&self, range: &str) -> Result<Vec<Vec<String>>, SheetsError> {
        let token = self.bearer().await?;
        let resp = self
            .http
            .get(self.values_url(range))
            .bearer_auth(token)
            .query(&[("majorDimension", "ROWS")])
            .send()
            .await?;
        let resp = check_status(resp).await?;

        let body: ValueRangeResponse = resp.json().await?;
        Ok(body.values.into_iter().map(normalize_row).collect())
    }

    async fn sheet_id_by_title(&self, title: &str) -> Result<i64, SheetsError> {
        let token = self.bearer().await?;
        let resp = self
            .http
            .get(format!("{}/{}", BASE_URL, self.spreadsheet_id))
            .bearer_auth(token)
            .query(&[("fields", "sheets.properties")])
            .send()
            .await?;
        let resp = check_status(resp).await?;

        let meta: SpreadsheetMeta = resp.json().await?;
        meta.sheets
            .into_iter()
            .map(|entry| entry.properties)
            .find(|props| props.title == title)
            .map(|props| props.sheet_id)
            .ok_or_else(|| SheetsError::SheetNotFound(title.to_string()))
    }
}

#[async_trait]
impl SheetsBackend for SheetsClient {
    async fn read_rows(&self, sheet: &str) -> Result<Vec<Vec<String>>, SheetsError> {
        self.get_range(&format!("{}!A1:{}", sheet, MAX_COLUMN)).await
    }

    async fn read_header(&self, sheet: &str) -> Result<Vec<Vec<String>>, SheetsError> {
        self.get_range(&format!("{}!A1:{}1", sheet, MAX_COLUMN)).await
    }

    async fn append_row(&self, sheet: &str, row: Vec<String>) -> Result<(), SheetsError> {
        let token = self.bearer().await?;
        let range = format!("{}!A1:{}", sheet, MAX_COLUMN);
        let resp = self
            .http
            .post(format!("{}:append", self.values_url(&range)))
            .bearer_auth(token)
            .query(&[
                ("valueInputOption", "RAW"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&json!({ "values": [row] }))
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }

    async fn write_row(
        &self,
        sheet: &str,
        row_number: usize,
        row: Vec<String>,
    ) -> Result<(), SheetsError> {
        let token = self.bearer().await?;
        let range = format!("{}!A{}", sheet, row_number);
        let resp = self
            .http
            .put(self.values_url(&range))
            .bearer_auth(token)
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({
                "range": range,
                "majorDimension": "ROWS",
                "values": [row],
            }))
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }

    async fn delete_row(&self, sheet: &str, row_index: usize) -> Result<(), SheetsError> {
        // Dimension deletes address the sheet by numeric id, not title.
        let sheet_id = self.sheet_id_by_title(sheet).await?;

        let token = self.bearer().await?;
        let resp = self
            .http
            .post(format!("{}/{}:batchUpdate", BASE_URL, self.spreadsheet_id))
            .bearer_auth(token)
            .json(&delete_dimension_request(sheet_id, row_index))
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, SheetsError> {
    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(SheetsError::Auth("access token rejected".to_string()));
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(SheetsError::Api {
            status: status.as_u16(),
            message: body,
        });
    }
    Ok(resp)
}

/// The API returns formatted cells as strings, but untyped JSON leaves room
/// for bare numbers and booleans; render those back to their cell text.
fn normalize_row(row: Vec<Value>) -> Vec<String> {
    row.into_iter()
        .map(|cell| match cell {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        })
        .collect()
}

fn delete_dimension_request(sheet_id: i64, row_index: usize) -> Value {
    json!({
        "requests": [{
            "deleteDimension": {
                "range": {
                    "sheetId": sheet_id,
                    "dimension": "ROWS",
                    "startIndex": row_index,
                    "endIndex": row_index + 1,
                }
            }
        }]
    })
}
