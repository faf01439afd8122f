// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Pantry-Sync: client-side session bootstrap and pantry item upserts
//!
//! This crate turns third-party identity assertions into backend sessions
//! and keeps a user's pantry inventory free of duplicate names by merging
//! quantities into existing items.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;

use std::sync::Arc;

use config::Config;
use db::{FileSessionStore, SessionStore};
use error::Result;
use services::{ApiClient, IdentityService, InventoryService, SessionManager, ThrottleRegistry};

/// Everything a host app needs, wired to one shared session.
pub struct PantryClient {
    pub config: Config,
    pub sessions: SessionManager,
    pub api: ApiClient,
    pub identity: IdentityService,
    pub inventory: InventoryService,
    pub throttles: ThrottleRegistry,
}

impl PantryClient {
    /// Build a client that persists its session to `config.session_path`.
    pub async fn connect(config: Config) -> Result<Self> {
        let store = Arc::new(FileSessionStore::new(config.session_path.clone()));
        Self::from_parts(config, store).await
    }

    /// Build a client on an arbitrary store and restore any persisted session.
    pub async fn from_parts(config: Config, store: Arc<dyn SessionStore>) -> Result<Self> {
        let sessions = SessionManager::new(store);
        if let Err(e) = sessions.restore().await {
            tracing::warn!(error = %e, "Failed to restore session, starting signed out");
        }

        let api = ApiClient::new(&config, sessions.clone())?;
        tracing::info!(api_base_url = %config.api_base_url, "Pantry client ready");

        Ok(Self {
            identity: IdentityService::new(api.clone()),
            inventory: InventoryService::new(api.clone()),
            throttles: ThrottleRegistry::default(),
            config,
            sessions,
            api,
        })
    }
}
