use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;

use crate::models::job::JobField;

const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Seconds before expiry at which a cached access token is refreshed.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// Row-oriented spreadsheet backend. Row numbers are 1-based, as in the sheet.
#[async_trait]
pub trait SheetStore: Send + Sync {
    /// Every row of the sheet, header included.
    async fn fetch_all(&self) -> Result<Vec<Vec<String>>, StoreError>;

    /// Overwrite columns A..=L of `row_number`.
    async fn update(&self, row_number: u32, values: &[String]) -> Result<(), StoreError>;

    /// Add a row after the last one, or insert it at `position` shifting
    /// later rows down.
    async fn append(&self, values: &[String], position: Option<u32>) -> Result<(), StoreError>;

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Google service account key, as downloaded from the cloud console.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        serde_json::from_str(json)
            .map_err(|e| StoreError::Credentials(format!("invalid service account JSON: {e}")))
    }
}

/// How the client obtains bearer tokens.
pub enum SheetsAuth {
    ServiceAccount(ServiceAccountKey),
    /// Pre-issued token, for emulators and tests.
    Static(String),
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Client for one sheet of a Google spreadsheet (Sheets API v4).
///
/// Built once at startup and shared; the access token is fetched lazily on
/// first use and cached until shortly before it expires.
pub struct GoogleSheetsClient {
    http: Client,
    api_base: Url,
    spreadsheet_id: String,
    sheet_name: String,
    sheet_gid: i64,
    auth: SheetsAuth,
    token: Mutex<Option<CachedToken>>,
}

impl GoogleSheetsClient {
    pub fn new(
        api_base: &str,
        spreadsheet_id: &str,
        sheet_name: &str,
        sheet_gid: i64,
        auth: SheetsAuth,
    ) -> Result<Self, StoreError> {
        let api_base = Url::parse(api_base)
            .map_err(|e| StoreError::Config(format!("invalid Sheets API base URL: {e}")))?;
        if api_base.cannot_be_a_base() {
            return Err(StoreError::Config(format!(
                "Sheets API base URL cannot be a base: {api_base}"
            )));
        }

        if let SheetsAuth::ServiceAccount(key) = &auth {
            // Fail at startup rather than on the first message.
            EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
        }

        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            api_base,
            spreadsheet_id: spreadsheet_id.to_string(),
            sheet_name: sheet_name.to_string(),
            sheet_gid,
            auth,
            token: Mutex::new(None),
        })
    }

    /// Bearer token for the next request, minting a new one when needed.
    async fn access_token(&self) -> Result<String, StoreError> {
        let key = match &self.auth {
            SheetsAuth::Static(token) => return Ok(token.clone()),
            SheetsAuth::ServiceAccount(key) => key,
        };

        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at - Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) > Utc::now() {
                return Ok(token.value.clone());
            }
        }

        let now = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &key.client_email,
            scope: SHEETS_SCOPE,
            aud: &key.token_uri,
            iat: now,
            exp: now + 3600,
        };
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
        let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)?;

        tracing::debug!(client_email = %key.client_email, "Requesting Sheets access token");
        let response = self
            .http
            .post(&key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;
        let token: TokenResponse = error_for_status(response).await?.json().await?;

        let value = token.access_token.clone();
        *cached = Some(CachedToken {
            value: token.access_token,
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
        });
        Ok(value)
    }

    fn url(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Config("Sheets API base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn values_url(&self, range: &str) -> Result<Url, StoreError> {
        self.url(&["v4", "spreadsheets", self.spreadsheet_id.as_str(), "values", range])
    }

    /// A1 range covering the job columns of one row.
    fn row_range(&self, row_number: u32) -> String {
        let last = JobField::last_column_letter();
        format!(
            "{}!A{row_number}:{last}{row_number}",
            quote_sheet_name(&self.sheet_name)
        )
    }

    async fn insert_blank_row(&self, row_number: u32) -> Result<(), StoreError> {
        let start_index = row_number.saturating_sub(1);
        let body = json!({
            "requests": [{
                "insertDimension": {
                    "range": {
                        "sheetId": self.sheet_gid,
                        "dimension": "ROWS",
                        "startIndex": start_index,
                        "endIndex": start_index + 1,
                    },
                    "inheritFromBefore": start_index > 0,
                }
            }]
        });

        let batch_segment = format!("{}:batchUpdate", self.spreadsheet_id);
        let url = self.url(&["v4", "spreadsheets", batch_segment.as_str()])?;
        let response = self
            .http
            .post(url)
            .bearer_auth(self.access_token().await?)
            .json(&body)
            .send()
            .await?;
        error_for_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl SheetStore for GoogleSheetsClient {
    async fn fetch_all(&self) -> Result<Vec<Vec<String>>, StoreError> {
        let url = self.values_url(&quote_sheet_name(&self.sheet_name))?;
        let response = self
            .http
            .get(url)
            .bearer_auth(self.access_token().await?)
            .send()
            .await?;
        let range: ValueRange = error_for_status(response).await?.json().await?;
        Ok(range.values)
    }

    async fn update(&self, row_number: u32, values: &[String]) -> Result<(), StoreError> {
        if row_number == 0 {
            return Err(StoreError::InvalidRow(row_number));
        }

        let range = self.row_range(row_number);
        let body = json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": [values],
        });
        let response = self
            .http
            .put(self.values_url(&range)?)
            .query(&[("valueInputOption", "RAW")])
            .bearer_auth(self.access_token().await?)
            .json(&body)
            .send()
            .await?;
        error_for_status(response).await?;
        Ok(())
    }

    async fn append(&self, values: &[String], position: Option<u32>) -> Result<(), StoreError> {
        if let Some(row_number) = position {
            if row_number == 0 {
                return Err(StoreError::InvalidRow(row_number));
            }
            self.insert_blank_row(row_number).await?;
            return self.update(row_number, values).await;
        }

        let append_segment = format!("{}:append", self.row_range(1));
        let body = json!({
            "majorDimension": "ROWS",
            "values": [values],
        });
        let response = self
            .http
            .post(self.values_url(&append_segment)?)
            .query(&[
                ("valueInputOption", "RAW"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .bearer_auth(self.access_token().await?)
            .json(&body)
            .send()
            .await?;
        error_for_status(response).await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        let url = self.url(&["v4", "spreadsheets", self.spreadsheet_id.as_str()])?;
        let response = self
            .http
            .get(url)
            .query(&[("fields", "spreadsheetId")])
            .bearer_auth(self.access_token().await?)
            .send()
            .await?;
        error_for_status(response).await?;
        Ok(())
    }
}

/// Quote a sheet name for use in an A1 range when it is not a bare word.
fn quote_sheet_name(name: &str) -> String {
    if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "''"))
    }
}

async fn error_for_status(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let (message, reason) = match serde_json::from_str::<ApiErrorBody>(&body) {
        Ok(parsed) => (parsed.error.message, parsed.error.status),
        Err(_) => (body, None),
    };
    Err(StoreError::Api {
        status: status.as_u16(),
        reason,
        message,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("HTTP request to spreadsheet backend failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Spreadsheet credentials error: {0}")]
    Credentials(String),

    #[error("Failed to sign service account assertion: {0}")]
    Assertion(#[from] jsonwebtoken::errors::Error),

    #[error("Spreadsheet API returned {status}: {message}")]
    Api {
        status: u16,
        reason: Option<String>,
        message: String,
    },

    #[error("Invalid sheet row number: {0}")]
    InvalidRow(u32),

    #[error("Spreadsheet configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// True when the backend rejected the call for rate or quota reasons.
    pub fn is_quota(&self) -> bool {
        match self {
            StoreError::Api { status, reason, .. } => {
                *status == 429 || reason.as_deref() == Some("RESOURCE_EXHAUSTED")
            }
            _ => false,
        }
    }
}
