//! Environment-derived configuration.
//!
//! Everything the proxy needs is resolved once at startup into an explicit
//! `AppConfig`; request handlers never touch the process environment.

use std::net::SocketAddr;

use thiserror::Error;

/// Default identifier header. One deployment keys rows by "phone" instead;
/// that is a `KEY_COLUMN` override, not a separate code path.
pub const DEFAULT_KEY_COLUMN: &str = "id";

/// Default header for the JSON-payload column.
pub const DEFAULT_CUSTOM_DATA_COLUMN: &str = "customData";

const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

/// Startup configuration for the proxy.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Spreadsheet document id (the long token in the sheet URL).
    pub spreadsheet_id: String,
    /// Title of the sheet tab holding the records.
    pub sheet_name: String,
    /// Listen address for the HTTP server.
    pub bind_addr: SocketAddr,
    /// Header name of the identifier column (matched case-insensitively).
    pub key_column: String,
    /// Header name of the JSON-payload column.
    pub custom_data_column: String,
    /// CORS allow-list. Empty means any origin.
    pub allowed_origins: Vec<String>,
    /// When set, GET /api/customers/:id returns only these fields.
    pub get_projection: Option<Vec<String>>,
    /// When set, the list endpoint interleaves this separator between every
    /// character of the serialized JSON body.
    pub list_separator: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary variable lookup. Tests inject a
    /// map-backed closure here instead of mutating the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let spreadsheet_id = require(&lookup, "SPREADSHEET_ID")?;
        let sheet_name = require(&lookup, "SHEET_NAME")?;

        let port = match non_empty(lookup("PORT")) {
            None => DEFAULT_PORT,
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                var: "PORT",
                value: raw,
            })?,
        };

        let key_column =
            non_empty(lookup("KEY_COLUMN")).unwrap_or_else(|| DEFAULT_KEY_COLUMN.to_string());
        let custom_data_column = non_empty(lookup("CUSTOM_DATA_COLUMN"))
            .unwrap_or_else(|| DEFAULT_CUSTOM_DATA_COLUMN.to_string());

        let allowed_origins = split_csv(lookup("ALLOWED_ORIGINS"));
        let get_projection = match split_csv(lookup("GET_PROJECTION")) {
            fields if fields.is_empty() => None,
            fields => Some(fields),
        };
        // Separator may be whitespace; only the empty string is "unset".
        let list_separator = lookup("LIST_SEPARATOR").filter(|s| !s.is_empty());

        Ok(AppConfig {
            spreadsheet_id,
            sheet_name,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], port)),
            key_column,
            custom_data_column,
            allowed_origins,
            get_projection,
            list_separator,
        })
    }
}

fn require(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<String, ConfigError> {
    non_empty(lookup(var)).ok_or(ConfigError::Missing(var))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn split_csv(value: Option<String>) -> Vec<String> {
    value
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("SPREADSHEET_ID", "sheet-doc-id"),
            ("SHEET_NAME", "Customers"),
        ]))
        .unwrap();

        assert_eq!(config.spreadsheet_id, "sheet-doc-id");
        assert_eq!(config.sheet_name, "Customers");
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.key_column, "id");
        assert_eq!(config.custom_data_column, "customData");
        assert!(config.allowed_origins.is_empty());
        assert!(config.get_projection.is_none());
        assert!(config.list_separator.is_none());
    }

    #[test]
    fn test_missing_spreadsheet_id() {
        let err = AppConfig::from_lookup(lookup_from(&[("SHEET_NAME", "Customers")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("SPREADSHEET_ID")));
    }

    #[test]
    fn test_blank_required_value_is_missing() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("SPREADSHEET_ID", "   "),
            ("SHEET_NAME", "Customers"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("SPREADSHEET_ID")));
    }

    #[test]
    fn test_invalid_port() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("SPREADSHEET_ID", "doc"),
            ("SHEET_NAME", "Customers"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "PORT", .. }));
    }

    #[test]
    fn test_variant_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("SPREADSHEET_ID", "doc"),
            ("SHEET_NAME", "Leads"),
            ("PORT", "3000"),
            ("KEY_COLUMN", "phone"),
            ("ALLOWED_ORIGINS", "https://app.example.com, https://admin.example.com"),
            ("GET_PROJECTION", "firstName,lastName,deliveryStatus"),
            ("LIST_SEPARATOR", "|"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.key_column, "phone");
        assert_eq!(
            config.allowed_origins,
            vec!["https://app.example.com", "https://admin.example.com"]
        );
        assert_eq!(
            config.get_projection.as_deref(),
            Some(&["firstName".to_string(), "lastName".into(), "deliveryStatus".into()][..])
        );
        assert_eq!(config.list_separator.as_deref(), Some("|"));
    }

    #[test]
    fn test_empty_projection_is_unset() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("SPREADSHEET_ID", "doc"),
            ("SHEET_NAME", "Customers"),
            ("GET_PROJECTION", " , ,"),
        ]))
        .unwrap();
        assert!(config.get_projection.is_none());
    }
}
