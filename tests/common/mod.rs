// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process fake of the pantry backend, served by axum on an ephemeral port.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};

use pantry_sync::config::Config;
use pantry_sync::db::{MemorySessionStore, SessionStore};
use pantry_sync::error::AppError;
use pantry_sync::models::{InventoryItem, Provider, Session};
use pantry_sync::services::{ApiClient, IdentityService, InventoryService, SessionManager};

/// Auth endpoints whose responses tests script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthRoute {
    SignupOauth,
    LoginOauth,
    Register,
    Login,
}

/// A canned response. `Value::Null` sends an empty body.
#[derive(Debug, Clone)]
pub struct Scripted {
    pub status: u16,
    pub body: Value,
}

/// One request as the backend saw it.
#[derive(Debug, Clone)]
pub struct Call {
    pub method: &'static str,
    pub path: String,
    pub bearer: Option<String>,
    pub body: Value,
}

#[derive(Default)]
struct Inner {
    calls: Vec<Call>,
    auth: HashMap<AuthRoute, Scripted>,
    auth_delay: HashMap<AuthRoute, Duration>,
    items: Vec<InventoryItem>,
    next_id: u64,
    numeric_ids: bool,
    reject_tokens: bool,
    write_failure: Option<Scripted>,
}

impl Inner {
    fn mint_id(&mut self) -> String {
        let n = self.next_id;
        self.next_id += 1;
        if self.numeric_ids {
            n.to_string()
        } else {
            format!("item-{}", n)
        }
    }

    fn wire(&self, item: &InventoryItem) -> Value {
        wire_item(item, self.numeric_ids)
    }
}

/// Item JSON as the backend sends it.
fn wire_item(item: &InventoryItem, numeric_ids: bool) -> Value {
    let mut value = serde_json::to_value(item).unwrap();
    if numeric_ids {
        if let Ok(id) = item.id.parse::<u64>() {
            value["id"] = json!(id);
        }
    }
    value
}

type Shared = Arc<Mutex<Inner>>;

pub struct FakeBackend {
    pub url: String,
    state: Shared,
}

impl FakeBackend {
    pub async fn spawn() -> Self {
        let state: Shared = Arc::new(Mutex::new(Inner {
            next_id: 1,
            ..Inner::default()
        }));

        let app = Router::new()
            .route("/auth/signup/oauth", post(signup_oauth))
            .route("/auth/login/oauth", post(login_oauth))
            .route("/auth/register", post(register))
            .route("/auth/login", post(login))
            .route("/pantry/items", get(list_items).post(create_item))
            .route("/pantry/items/{id}", patch(update_item).delete(delete_item))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            url: format!("http://{}", addr),
            state,
        }
    }

    pub fn script(&self, route: AuthRoute, status: u16, body: Value) {
        self.state
            .lock()
            .unwrap()
            .auth
            .insert(route, Scripted { status, body });
    }

    /// Hold responses on `route` for `delay` before answering.
    pub fn delay_auth(&self, route: AuthRoute, delay: Duration) {
        self.state.lock().unwrap().auth_delay.insert(route, delay);
    }

    /// Assign and send item ids as JSON integers.
    pub fn use_numeric_ids(&self) {
        self.state.lock().unwrap().numeric_ids = true;
    }

    /// Answer every pantry request with 401.
    pub fn reject_tokens(&self) {
        self.state.lock().unwrap().reject_tokens = true;
    }

    /// Answer pantry writes (POST/PATCH/DELETE) with this response.
    pub fn fail_writes(&self, status: u16, body: Value) {
        self.state.lock().unwrap().write_failure = Some(Scripted { status, body });
    }

    pub fn seed(&self, name: &str, quantity: Option<f64>, family_id: Option<&str>) -> InventoryItem {
        let mut inner = self.state.lock().unwrap();
        let item = InventoryItem {
            id: inner.mint_id(),
            name: name.to_string(),
            quantity,
            unit: Some("pcs".to_string()),
            category: None,
            expires_at: None,
            user_id: family_id.is_none().then(|| "user-1".to_string()),
            family_id: family_id.map(str::to_string),
        };
        inner.items.push(item.clone());
        item
    }

    pub fn items(&self) -> Vec<InventoryItem> {
        self.state.lock().unwrap().items.clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// `"METHOD /path"` for every request, in order.
    pub fn requests(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|c| format!("{} {}", c.method, c.path))
            .collect()
    }

    pub fn config(&self) -> Config {
        Config {
            request_timeout: Duration::from_millis(500),
            ..Config::default()
        }
        .with_api_base_url(&self.url)
        .unwrap()
    }
}

/// Services wired to one backend and one in-memory store.
pub struct Harness {
    pub sessions: SessionManager,
    pub store: Arc<MemorySessionStore>,
    pub api: ApiClient,
    pub identity: IdentityService,
    pub inventory: InventoryService,
}

pub fn harness(config: &Config) -> Harness {
    let store = Arc::new(MemorySessionStore::new());
    harness_with_store(config, store.clone(), store)
}

pub fn harness_with_store(
    config: &Config,
    store: Arc<dyn SessionStore>,
    memory: Arc<MemorySessionStore>,
) -> Harness {
    let sessions = SessionManager::new(store);
    let api = ApiClient::new(config, sessions.clone()).unwrap();
    Harness {
        identity: IdentityService::new(api.clone()),
        inventory: InventoryService::new(api.clone()),
        sessions,
        store: memory,
        api,
    }
}

/// Harness that is already signed in with `token`.
pub async fn signed_in(config: &Config, token: &str) -> Harness {
    let h = harness(config);
    h.sessions.establish(session(token)).await;
    h
}

pub fn session(token: &str) -> Session {
    Session {
        access_token: token.to_string(),
        refresh_token: Some(format!("{}-refresh", token)),
        provider: Provider::Google,
        issued_at: Utc::now(),
        user_id: Some("user-1".to_string()),
        expires_at: None,
    }
}

pub fn tokens(access: &str, refresh: &str, user_id: &str) -> Value {
    json!({
        "access_token": access,
        "refresh_token": refresh,
        "user": { "id": user_id, "email": "cook@example.com" }
    })
}

/// A base URL nothing is listening on.
pub async fn unreachable_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// Store whose every operation fails.
pub struct FailingStore;

#[async_trait]
impl SessionStore for FailingStore {
    async fn load(&self) -> Result<Option<Session>, AppError> {
        Err(AppError::Storage("disk unavailable".to_string()))
    }

    async fn save(&self, _session: &Session) -> Result<(), AppError> {
        Err(AppError::Storage("disk full".to_string()))
    }

    async fn clear(&self) -> Result<(), AppError> {
        Err(AppError::Storage("disk unavailable".to_string()))
    }
}

// ─── Handlers ────────────────────────────────────────────────────────────────

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

fn record(state: &Shared, method: &'static str, path: String, headers: &HeaderMap, body: &Bytes) {
    let body = serde_json::from_slice(body).unwrap_or(Value::Null);
    state.lock().unwrap().calls.push(Call {
        method,
        path,
        bearer: bearer(headers),
        body,
    });
}

fn respond(scripted: Scripted) -> Response {
    let status = StatusCode::from_u16(scripted.status).unwrap();
    if scripted.body.is_null() {
        status.into_response()
    } else {
        (status, Json(scripted.body)).into_response()
    }
}

async fn auth(state: Shared, route: AuthRoute, path: &str, headers: HeaderMap, body: Bytes) -> Response {
    record(&state, "POST", path.to_string(), &headers, &body);

    let (scripted, delay) = {
        let inner = state.lock().unwrap();
        (inner.auth.get(&route).cloned(), inner.auth_delay.get(&route).copied())
    };
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    respond(scripted.unwrap_or(Scripted {
        status: 500,
        body: json!({ "detail": "no scripted response" }),
    }))
}

async fn signup_oauth(State(state): State<Shared>, headers: HeaderMap, body: Bytes) -> Response {
    auth(state, AuthRoute::SignupOauth, "/auth/signup/oauth", headers, body).await
}

async fn login_oauth(State(state): State<Shared>, headers: HeaderMap, body: Bytes) -> Response {
    auth(state, AuthRoute::LoginOauth, "/auth/login/oauth", headers, body).await
}

async fn register(State(state): State<Shared>, headers: HeaderMap, body: Bytes) -> Response {
    auth(state, AuthRoute::Register, "/auth/register", headers, body).await
}

async fn login(State(state): State<Shared>, headers: HeaderMap, body: Bytes) -> Response {
    auth(state, AuthRoute::Login, "/auth/login", headers, body).await
}

/// 401 for missing or rejected bearer tokens, else `None`.
fn deny(state: &Shared, headers: &HeaderMap) -> Option<Response> {
    let rejected = state.lock().unwrap().reject_tokens;
    if bearer(headers).is_none() || rejected {
        Some((StatusCode::UNAUTHORIZED, Json(json!({ "detail": "Invalid token" }))).into_response())
    } else {
        None
    }
}

fn write_failure(state: &Shared) -> Option<Response> {
    state.lock().unwrap().write_failure.clone().map(respond)
}

async fn list_items(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let path = match query.get("family_id") {
        Some(family) => format!("/pantry/items?family_id={}", family),
        None => "/pantry/items".to_string(),
    };
    record(&state, "GET", path, &headers, &Bytes::new());
    if let Some(denied) = deny(&state, &headers) {
        return denied;
    }

    let family = query.get("family_id").cloned();
    let inner = state.lock().unwrap();
    let items: Vec<Value> = inner
        .items
        .iter()
        .filter(|item| item.family_id == family)
        .map(|item| inner.wire(item))
        .collect();
    Json(json!({ "items": items })).into_response()
}

async fn create_item(State(state): State<Shared>, headers: HeaderMap, body: Bytes) -> Response {
    record(&state, "POST", "/pantry/items".to_string(), &headers, &body);
    if let Some(denied) = deny(&state, &headers) {
        return denied;
    }
    if let Some(failure) = write_failure(&state) {
        return failure;
    }

    let fields: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let mut inner = state.lock().unwrap();
    let mut item: InventoryItem = serde_json::from_value(json!({
        "id": inner.mint_id(),
        "name": fields["name"],
        "quantity": fields["quantity"],
        "unit": fields["unit"],
        "category": fields["category"],
        "expires_at": fields["expires_at"],
        "family_id": fields["family_id"],
    }))
    .unwrap();
    if item.family_id.is_none() {
        item.user_id = Some("user-1".to_string());
    }
    inner.items.push(item.clone());

    (StatusCode::CREATED, Json(inner.wire(&item))).into_response()
}

async fn update_item(
    State(state): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    record(&state, "PATCH", format!("/pantry/items/{}", id), &headers, &body);
    if let Some(denied) = deny(&state, &headers) {
        return denied;
    }
    if let Some(failure) = write_failure(&state) {
        return failure;
    }

    let fields: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let mut inner = state.lock().unwrap();
    let numeric_ids = inner.numeric_ids;
    let Some(item) = inner.items.iter_mut().find(|item| item.id == id) else {
        return (StatusCode::NOT_FOUND, Json(json!({ "detail": "Item not found" }))).into_response();
    };

    if let Some(quantity) = fields["quantity"].as_f64() {
        item.quantity = Some(quantity);
    }
    if let Some(unit) = fields["unit"].as_str() {
        item.unit = Some(unit.to_string());
    }
    if let Some(category) = fields["category"].as_str() {
        item.category = Some(category.to_string());
    }
    if !fields["expires_at"].is_null() {
        item.expires_at = serde_json::from_value(fields["expires_at"].clone()).ok();
    }

    Json(wire_item(item, numeric_ids)).into_response()
}

async fn delete_item(
    State(state): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    record(&state, "DELETE", format!("/pantry/items/{}", id), &headers, &Bytes::new());
    if let Some(denied) = deny(&state, &headers) {
        return denied;
    }
    if let Some(failure) = write_failure(&state) {
        return failure;
    }

    let mut inner = state.lock().unwrap();
    let before = inner.items.len();
    inner.items.retain(|item| item.id != id);
    if inner.items.len() == before {
        return (StatusCode::NOT_FOUND, Json(json!({ "detail": "Item not found" }))).into_response();
    }
    StatusCode::NO_CONTENT.into_response()
}
