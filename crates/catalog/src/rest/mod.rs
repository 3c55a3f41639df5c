//! Remote tables behind a PostgREST-style HTTP API.
//!
//! Requests carry the project API key plus the current session's access token
//! (falling back to the API key for anonymous reads). Failures are classified
//! into [`StoreError`] from the HTTP status, the PostgREST error code and the
//! message text.

mod auth;
mod points;
mod settings;

pub use auth::RestAuth;
pub use points::RestPointStore;
pub use settings::RestSettingsStore;

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, StatusCode};
use runtime::SessionContext;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{StoreError, looks_like_auth};

pub const DEFAULT_POINTS_TABLE: &str = "map_points";
pub const DEFAULT_SETTINGS_TABLE: &str = "user_settings";

#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    pub base_url: String,
    /// Public API key sent as `apikey` on every request.
    pub api_key: String,
    pub points_table: String,
    pub settings_table: String,
}

impl RestConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            points_table: DEFAULT_POINTS_TABLE.to_string(),
            settings_table: DEFAULT_SETTINGS_TABLE.to_string(),
        }
    }

    fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base())
    }

    pub fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base(), path.trim_start_matches('/'))
    }
}

/// Shared HTTP plumbing for the table stores.
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    config: Arc<RestConfig>,
    session: SessionContext,
}

impl RestClient {
    pub fn new(config: RestConfig, session: SessionContext) -> Self {
        Self {
            http: reqwest::Client::new(),
            config: Arc::new(config),
            session,
        }
    }

    pub fn config(&self) -> &RestConfig {
        &self.config
    }

    fn table_request(&self, method: Method, table: &str) -> RequestBuilder {
        let bearer = self
            .session
            .access_token()
            .unwrap_or_else(|| self.config.api_key.clone());
        self.http
            .request(method, self.config.table_url(table))
            .header("apikey", &self.config.api_key)
            .bearer_auth(bearer)
    }

    async fn send_rows<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<Vec<T>, StoreError> {
        let resp = req
            .send()
            .await
            .map_err(|e| StoreError::store(format!("request failed: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(error_from_response(status, &body));
        }
        resp.json::<Vec<T>>()
            .await
            .map_err(|e| StoreError::store(format!("failed to decode response: {e}")))
    }
}

/// Error body returned by PostgREST (and, with `msg`, by the auth service).
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    code: Option<String>,
    message: Option<String>,
    msg: Option<String>,
    details: Option<String>,
}

fn error_from_response(status: StatusCode, body: &str) -> StoreError {
    let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .message
        .or(parsed.msg)
        .or(parsed.details)
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.to_string()
            } else {
                body.to_string()
            }
        });
    classify(status.as_u16(), parsed.code.as_deref(), &message)
}

const VALIDATION_CODES: &[&str] = &["23502", "23514", "22P02", "22003", "PGRST204"];

/// Maps an HTTP failure onto the store error taxonomy.
pub fn classify(status: u16, code: Option<&str>, message: &str) -> StoreError {
    if code == Some("PGRST116") {
        return StoreError::NotFound(message.to_string());
    }
    if status == 401 || status == 403 || looks_like_auth(code, message) {
        return StoreError::Auth(message.to_string());
    }
    if status == 400 || status == 422 || code.is_some_and(|c| VALIDATION_CODES.contains(&c)) {
        return StoreError::Validation(message.to_string());
    }
    if status == 404 {
        return StoreError::NotFound(message.to_string());
    }
    StoreError::Store {
        code: Some(code.map(str::to_string).unwrap_or_else(|| status.to_string())),
        message: message.to_string(),
    }
}

/// Returns the single row of a `return=representation` response, or `NotFound`.
fn single_row<T>(rows: Vec<T>, what: impl FnOnce() -> String) -> Result<T, StoreError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| StoreError::NotFound(what()))
}
