//! SheetRecordStore — rows of one sheet as keyed records.
//!
//! Row 1 of the sheet is the header and defines the field set at request
//! time; rows 2..N are records positionally aligned to the header. The
//! identifier column is located by case-insensitive header match, while
//! identifier *values* are compared case-sensitively. One designated column
//! carries a JSON-encoded payload that is opportunistically parsed on read.
//!
//! No operation is atomic with respect to concurrent writers: update and
//! delete re-read the range to locate the row, then write, so two racing
//! writers can interleave (lost update). That matches the upstream model —
//! the spreadsheet is the only shared state.

use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::sheets::{SheetsBackend, SheetsError};

/// A record, shaped per request from the header row. Fields are strings or
/// null, except the custom-data field which may be a parsed JSON value.
pub type Record = Map<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("header row has no '{0}' column")]
    MissingKeyColumn(String),

    #[error("sheet has no header row")]
    EmptySheet,

    #[error("record not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Sheets(#[from] SheetsError),
}

/// Column layout discovered from the header row of one request.
#[derive(Debug, Clone)]
pub struct HeaderSchema {
    fields: Vec<String>,
    key_index: usize,
}

impl HeaderSchema {
    /// Header names are matched case-insensitively; exactly the first match
    /// is used.
    pub fn from_row(row: &[String], key_field: &str) -> Result<Self, StoreError> {
        let wanted = key_field.to_lowercase();
        let key_index = row
            .iter()
            .position(|header| header.trim().to_lowercase() == wanted)
            .ok_or_else(|| StoreError::MissingKeyColumn(key_field.to_string()))?;
        Ok(Self {
            fields: row.to_vec(),
            key_index,
        })
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn key_index(&self) -> usize {
        self.key_index
    }
}

/// Façade mapping record CRUD onto spreadsheet range reads/writes.
pub struct SheetRecordStore {
    backend: Arc<dyn SheetsBackend>,
    sheet: String,
    key_field: String,
    custom_field: String,
}

impl SheetRecordStore {
    pub fn new(
        backend: Arc<dyn SheetsBackend>,
        sheet: impl Into<String>,
        key_field: impl Into<String>,
        custom_field: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            sheet: sheet.into(),
            key_field: key_field.into(),
            custom_field: custom_field.into(),
        }
    }

    /// Every data row shaped by the header. An empty range yields an empty
    /// vec; listing does not require the identifier column to exist.
    pub async fn list_records(&self) -> Result<Vec<Record>, StoreError> {
        let rows = self.backend.read_rows(&self.sheet).await?;
        let Some((header, data)) = rows.split_first() else {
            return Ok(Vec::new());
        };
        Ok(data.iter().map(|row| self.shape_record(header, row)).collect())
    }

    /// First row whose identifier cell equals `id` exactly.
    pub async fn get_record(&self, id: &str) -> Result<Record, StoreError> {
        let rows = self.backend.read_rows(&self.sheet).await?;
        let (header, data) = rows.split_first().ok_or(StoreError::EmptySheet)?;
        let schema = HeaderSchema::from_row(header, &self.key_field)?;

        let (_, row) = locate(&schema, data, id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        Ok(self.shape_record(header, row))
    }

    /// Append one new row positionally aligned to the header. Fields absent
    /// from the payload become empty cells. The assigned row position is
    /// not reported back.
    pub async fn create_record(&self, payload: &Record) -> Result<(), StoreError> {
        let header_rows = self.backend.read_header(&self.sheet).await?;
        let header = header_rows
            .into_iter()
            .next()
            .filter(|row| !row.is_empty())
            .ok_or(StoreError::EmptySheet)?;

        let row = header
            .iter()
            .map(|field| payload.get(field).map(cell_from_value).unwrap_or_default())
            .collect();
        self.backend.append_row(&self.sheet, row).await?;
        Ok(())
    }

    /// Rewrite the matched row in place: payload fields win, every other
    /// column keeps its stored cell. There is no partial-cell write — the
    /// whole row goes back at its absolute position.
    pub async fn update_record(&self, id: &str, payload: &Record) -> Result<(), StoreError> {
        let rows = self.backend.read_rows(&self.sheet).await?;
        let (header, data) = rows.split_first().ok_or(StoreError::EmptySheet)?;
        let schema = HeaderSchema::from_row(header, &self.key_field)?;

        let (pos, existing) =
            locate(&schema, data, id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let row: Vec<String> = schema
            .fields()
            .iter()
            .enumerate()
            .map(|(i, field)| match payload.get(field) {
                Some(value) => cell_from_value(value),
                None => existing.get(i).cloned().unwrap_or_default(),
            })
            .collect();

        // Data row `pos` sits at 1-based sheet row pos + 2 (after the header).
        self.backend.write_row(&self.sheet, pos + 2, row).await?;
        Ok(())
    }

    /// Remove the matched row entirely. Rows below shift up by one, so any
    /// cached row position is invalid afterwards.
    pub async fn delete_record(&self, id: &str) -> Result<(), StoreError> {
        let rows = self.backend.read_rows(&self.sheet).await?;
        let (header, data) = rows.split_first().ok_or(StoreError::EmptySheet)?;
        let schema = HeaderSchema::from_row(header, &self.key_field)?;

        let (pos, _) =
            locate(&schema, data, id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        // Grid index counts the header row.
        self.backend.delete_row(&self.sheet, pos + 1).await?;
        Ok(())
    }

    fn shape_record(&self, header: &[String], row: &[String]) -> Record {
        let mut record = Record::new();
        for (i, field) in header.iter().enumerate() {
            let value = match row.get(i) {
                None => Value::Null,
                Some(cell) if *field == self.custom_field => parse_custom_cell(cell),
                Some(cell) => Value::String(cell.clone()),
            };
            record.insert(field.clone(), value);
        }
        record
    }
}

fn locate<'a>(
    schema: &HeaderSchema,
    data: &'a [Vec<String>],
    id: &str,
) -> Option<(usize, &'a Vec<String>)> {
    data.iter()
        .enumerate()
        .find(|(_, row)| row.get(schema.key_index()).map(String::as_str) == Some(id))
}

/// Render a payload value to cell text. Objects (the custom-data field)
/// serialize to JSON text; plain strings pass through; null clears the cell.
fn cell_from_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// A custom-data cell is expected to hold JSON; anything that does not
/// parse falls back to the raw string.
fn parse_custom_cell(cell: &str) -> Value {
    serde_json::from_str(cell).unwrap_or_else(|_| Value::String(cell.to_string()))
}
