// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Backend API client.
//!
//! Handles:
//! - Identity assertion exchange (provision and login)
//! - Password registration and login
//! - Pantry item list/create/update/delete
//! - Classifying every failure into a `BackendError`, once, here

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{AppError, BackendError};
use crate::models::{
    AuthTokens, IdentityAssertion, InventoryItem, InventoryScope, ItemPatch, NewItem,
    PasswordCredentials, Provider,
};
use crate::services::SessionManager;

/// Longest raw (non-JSON) error body kept as a message.
const MAX_RAW_ERROR_CHARS: usize = 200;

/// Backend REST API client.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    sessions: SessionManager,
}

#[derive(Serialize)]
struct OAuthRequest {
    provider: Provider,
}

/// List endpoints return either a bare array or `{"items": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ItemList {
    Bare(Vec<InventoryItem>),
    Wrapped { items: Vec<InventoryItem> },
}

impl ApiClient {
    /// Create a client for `config.api_base_url` with the configured timeout.
    pub fn new(config: &Config, sessions: SessionManager) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.api_base_url.clone(),
            sessions,
        })
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ─── Auth ────────────────────────────────────────────────────────────────

    /// Create an account from an identity assertion.
    ///
    /// POST /auth/signup/oauth, a 409 means the account already exists.
    pub async fn signup_oauth(
        &self,
        assertion: &IdentityAssertion,
    ) -> Result<AuthTokens, BackendError> {
        self.exchange_assertion("/auth/signup/oauth", assertion).await
    }

    /// Log in to an existing account with an identity assertion.
    ///
    /// POST /auth/login/oauth
    pub async fn login_oauth(
        &self,
        assertion: &IdentityAssertion,
    ) -> Result<AuthTokens, BackendError> {
        self.exchange_assertion("/auth/login/oauth", assertion).await
    }

    async fn exchange_assertion(
        &self,
        path: &str,
        assertion: &IdentityAssertion,
    ) -> Result<AuthTokens, BackendError> {
        let response = self
            .http
            .post(self.url(path))
            .bearer_auth(assertion.token())
            .json(&OAuthRequest {
                provider: assertion.provider(),
            })
            .send()
            .await
            .map_err(classify_transport)?;

        read_auth_tokens(response).await
    }

    /// POST /auth/register
    pub async fn register(
        &self,
        credentials: &PasswordCredentials,
    ) -> Result<AuthTokens, BackendError> {
        let response = self
            .http
            .post(self.url("/auth/register"))
            .json(credentials)
            .send()
            .await
            .map_err(classify_transport)?;

        read_auth_tokens(response).await
    }

    /// POST /auth/login
    pub async fn login(&self, credentials: &PasswordCredentials) -> Result<AuthTokens, BackendError> {
        let body = PasswordCredentials {
            full_name: None,
            ..credentials.clone()
        };
        let response = self
            .http
            .post(self.url("/auth/login"))
            .json(&body)
            .send()
            .await
            .map_err(classify_transport)?;

        read_auth_tokens(response).await
    }

    // ─── Pantry ──────────────────────────────────────────────────────────────

    /// GET /pantry/items, filtered to a family when the scope is one.
    pub async fn list_items(
        &self,
        scope: &InventoryScope,
    ) -> Result<Vec<InventoryItem>, BackendError> {
        let mut request = self.http.get(self.url("/pantry/items"));
        if let Some(family_id) = scope.family_id() {
            request = request.query(&[("family_id", family_id)]);
        }

        let response = self.send_authorized(request).await?;
        let list: ItemList = check_response_json(response).await?;
        Ok(match list {
            ItemList::Bare(items) | ItemList::Wrapped { items } => items,
        })
    }

    /// POST /pantry/items
    pub async fn create_item(&self, item: &NewItem) -> Result<InventoryItem, BackendError> {
        let request = self.http.post(self.url("/pantry/items")).json(item);
        let response = self.send_authorized(request).await?;
        check_response_json(response).await
    }

    /// PATCH /pantry/items/{id}
    pub async fn update_item(
        &self,
        item_id: &str,
        patch: &ItemPatch,
    ) -> Result<InventoryItem, BackendError> {
        let request = self.http.patch(self.item_url(item_id)).json(patch);
        let response = self.send_authorized(request).await?;
        check_response_json(response).await
    }

    /// DELETE /pantry/items/{id}
    pub async fn delete_item(&self, item_id: &str) -> Result<(), BackendError> {
        let request = self.http.delete(self.item_url(item_id));
        let response = self.send_authorized(request).await?;
        check_response(response).await?;
        Ok(())
    }

    fn item_url(&self, item_id: &str) -> String {
        self.url(&format!("/pantry/items/{}", urlencoding::encode(item_id)))
    }

    /// Attach the current bearer token and send.
    ///
    /// The token is read from the session manager on every call. A 401
    /// revokes the session that issued it.
    async fn send_authorized(&self, request: RequestBuilder) -> Result<Response, BackendError> {
        let token = self.sessions.access_token().ok_or(BackendError::NoSession)?;

        let response = request
            .bearer_auth(&token)
            .send()
            .await
            .map_err(classify_transport)?;

        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!("Backend rejected access token, ending session");
            self.sessions.revoke(&token).await;
        }

        Ok(response)
    }
}

/// Map a reqwest send/read error to a transport failure.
fn classify_transport(err: reqwest::Error) -> BackendError {
    if err.is_timeout() {
        tracing::warn!("Backend request timed out");
        BackendError::Timeout
    } else {
        BackendError::Unreachable(err.to_string())
    }
}

/// Check response status and return error if not successful.
async fn check_response(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();

    if status == StatusCode::TOO_MANY_REQUESTS {
        tracing::warn!("Backend rate limit hit (429)");
    }

    Err(BackendError::Http {
        status: status.as_u16(),
        message: normalize_error_body(status, &body),
    })
}

/// Check response and parse JSON body.
async fn check_response_json<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let response = check_response(response).await?;
    let status = response.status();
    let bytes = response.bytes().await.map_err(classify_transport)?;

    serde_json::from_slice(&bytes).map_err(|e| BackendError::Http {
        status: status.as_u16(),
        message: format!("Malformed response body: {}", e),
    })
}

/// Auth endpoints may answer 2xx with an empty body; that parses as no tokens.
async fn read_auth_tokens(response: Response) -> Result<AuthTokens, BackendError> {
    let response = check_response(response).await?;
    let status = response.status();
    let bytes = response.bytes().await.map_err(classify_transport)?;

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(AuthTokens::default());
    }

    serde_json::from_slice(&bytes).map_err(|e| BackendError::Http {
        status: status.as_u16(),
        message: format!("Malformed response body: {}", e),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Error body normalization
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    detail: Option<ErrorDetail>,
    #[serde(default)]
    message: Option<LooseText>,
    #[serde(default)]
    error_description: Option<LooseText>,
    #[serde(default)]
    error: Option<ErrorField>,
}

/// A field expected to be text; other shapes are accepted and ignored.
#[derive(Deserialize)]
#[serde(untagged)]
enum LooseText {
    Text(String),
    Other(serde_json::Value),
}

impl LooseText {
    fn text(self) -> Option<String> {
        match self {
            LooseText::Text(text) => Some(text),
            LooseText::Other(_) => None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Text(String),
    List(Vec<DetailEntry>),
    Object(DetailObject),
    Other(serde_json::Value),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DetailEntry {
    Text(String),
    Field {
        msg: String,
        #[serde(default)]
        loc: Vec<serde_json::Value>,
    },
    Other(serde_json::Value),
}

#[derive(Deserialize)]
struct DetailObject {
    #[serde(default)]
    message: Option<LooseText>,
    #[serde(default)]
    msg: Option<LooseText>,
    #[serde(default)]
    detail: Option<LooseText>,
}

impl DetailObject {
    fn text(self) -> Option<String> {
        [self.message, self.msg, self.detail]
            .into_iter()
            .flatten()
            .find_map(LooseText::text)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorField {
    Text(String),
    Object(DetailObject),
    Other(serde_json::Value),
}

impl DetailEntry {
    fn text(self) -> Option<String> {
        match self {
            DetailEntry::Text(text) => Some(text),
            DetailEntry::Field { msg, loc } => {
                // FastAPI prefixes locations with where the value came from
                let path: Vec<String> = loc
                    .iter()
                    .skip_while(|part| {
                        matches!(part.as_str(), Some("body" | "query" | "path" | "header"))
                    })
                    .map(|part| match part {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect();
                if path.is_empty() {
                    Some(msg)
                } else {
                    Some(format!("{}: {}", path.join("."), msg))
                }
            }
            DetailEntry::Other(_) => None,
        }
    }
}

/// Turn an error response body into a single message.
///
/// Accepts the shapes the backend and its proxies produce: `detail` as a
/// string, a list of field errors or an object; top-level `message`;
/// OAuth-style `error`/`error_description`; or plain text.
pub(crate) fn normalize_error_body(status: StatusCode, body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        let from_detail = envelope.detail.and_then(|detail| match detail {
            ErrorDetail::Text(text) => Some(text),
            ErrorDetail::List(entries) => {
                let parts: Vec<String> = entries.into_iter().filter_map(DetailEntry::text).collect();
                (!parts.is_empty()).then(|| parts.join("; "))
            }
            ErrorDetail::Object(object) => object.text(),
            ErrorDetail::Other(_) => None,
        });

        let message = from_detail
            .or_else(|| envelope.message.and_then(LooseText::text))
            .or_else(|| envelope.error_description.and_then(LooseText::text))
            .or_else(|| {
                envelope.error.and_then(|error| match error {
                    ErrorField::Text(text) => Some(text),
                    ErrorField::Object(object) => object.text(),
                    ErrorField::Other(_) => None,
                })
            })
            .filter(|m| !m.trim().is_empty());

        if let Some(message) = message {
            return message;
        }
    }

    let raw = body.trim();
    if !raw.is_empty() && !raw.starts_with('{') && !raw.starts_with('<') {
        return raw.chars().take(MAX_RAW_ERROR_CHARS).collect();
    }

    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}
