use garde::Validate;
use serde::Deserialize;

use crate::services::reconciler::ReconcilePolicy;

/// Where job rows are stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SheetBackend {
    #[default]
    Google,
    /// In-process sheet, lost on restart. For local runs.
    Memory,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:8888")
    #[serde(default = "default_bind_addr")]
    #[garde(length(min = 1))]
    pub bind_addr: String,

    /// LINE channel secret, used to verify webhook signatures
    #[garde(length(min = 1))]
    pub line_channel_secret: String,

    /// LINE channel access token, used for replies
    #[garde(length(min = 1))]
    pub line_channel_access_token: String,

    #[serde(default = "default_line_api_base")]
    #[garde(length(min = 1))]
    pub line_api_base: String,

    /// Send acknowledgment replies to the chat
    #[serde(default = "default_true")]
    #[garde(skip)]
    pub replies_enabled: bool,

    #[serde(default)]
    #[garde(skip)]
    pub sheet_backend: SheetBackend,

    /// Service account key JSON (required for the google backend)
    #[garde(length(min = 1))]
    pub google_credentials_json: Option<String>,

    /// Spreadsheet key from the sheet URL (required for the google backend)
    #[garde(length(min = 1))]
    pub spreadsheet_id: Option<String>,

    #[serde(default = "default_sheet_name")]
    #[garde(length(min = 1))]
    pub sheet_name: String,

    /// Numeric id of the sheet tab (the `gid` in its URL)
    #[serde(default)]
    #[garde(range(min = 0))]
    pub sheet_gid: i64,

    #[serde(default = "default_sheets_api_base")]
    #[garde(length(min = 1))]
    pub sheets_api_base: String,

    #[serde(default)]
    #[garde(skip)]
    pub reconcile_policy: ReconcilePolicy,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8888".to_string()
}

fn default_line_api_base() -> String {
    "https://api.line.me".to_string()
}

fn default_sheets_api_base() -> String {
    "https://sheets.googleapis.com".to_string()
}

fn default_sheet_name() -> String {
    "Sheet1".to_string()
}

fn default_true() -> bool {
    true
}

impl AppConfig {
    /// Load from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: Self = envy::from_iter(vars)?;
        config.validate()?;

        if config.sheet_backend == SheetBackend::Google {
            if config.google_credentials_json.is_none() {
                return Err(ConfigError::Missing("GOOGLE_CREDENTIALS_JSON"));
            }
            if config.spreadsheet_id.is_none() {
                return Err(ConfigError::Missing("SPREADSHEET_ID"));
            }
        }

        Ok(config)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration from environment: {0}")]
    Env(#[from] envy::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] garde::Report),

    #[error("{0} must be set when SHEET_BACKEND=google")]
    Missing(&'static str),
}
