// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Single owner of the client session.
//!
//! Every consumer (the API client, the identity service, the host app)
//! holds a clone of the same `SessionManager` and reads the current session
//! through it on each use. Updates are published on a `watch` channel so a
//! host can react to sign-in and sign-out.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};

use crate::db::SessionStore;
use crate::error::AppError;
use crate::models::Session;

/// Why a session was removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The user signed out
    SignedOut,
    /// The backend rejected the session's access token
    Rejected,
}

#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    current: Arc<watch::Sender<Option<Session>>>,
    /// Held across each storage write and the publish that follows it
    write_lock: Arc<Mutex<()>>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            store,
            current: Arc::new(current),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Load the persisted session into memory. Call once at startup.
    pub async fn restore(&self) -> Result<Option<Session>, AppError> {
        let _guard = self.write_lock.lock().await;
        let session = self.store.load().await?;
        if let Some(s) = &session {
            tracing::info!(provider = %s.provider, "Restored persisted session");
        }
        self.current.send_replace(session.clone());
        Ok(session)
    }

    /// Snapshot of the current session.
    pub fn current(&self) -> Option<Session> {
        self.current.borrow().clone()
    }

    /// Current bearer token, if signed in.
    pub fn access_token(&self) -> Option<String> {
        self.current
            .borrow()
            .as_ref()
            .map(|s| s.access_token.clone())
    }

    pub fn is_signed_in(&self) -> bool {
        self.current.borrow().is_some()
    }

    /// Receiver that observes every session change.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.current.subscribe()
    }

    /// Make `session` the current session and persist it.
    ///
    /// A storage failure is logged and the session still becomes current.
    /// Overlapping calls apply one after another, so storage and memory
    /// end up holding the same session.
    pub async fn establish(&self, session: Session) {
        let _guard = self.write_lock.lock().await;
        let provider = session.provider;
        if let Err(e) = self.store.save(&session).await {
            tracing::warn!(error = %e, %provider, "Failed to persist session, continuing anyway");
        }
        self.current.send_replace(Some(session));
    }

    /// Explicit sign-out. Clears memory, then storage.
    pub async fn sign_out(&self) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;
        let previous = self.current.send_replace(None);
        if previous.is_some() {
            tracing::info!(reason = ?SessionEnd::SignedOut, "Session ended");
        }
        self.store.clear().await
    }

    /// Drop the session after the backend denied `rejected_token`.
    ///
    /// Does nothing if the session was replaced since that token was read.
    pub async fn revoke(&self, rejected_token: &str) {
        let _guard = self.write_lock.lock().await;
        let revoked = self.current.send_if_modified(|current| {
            let matches = current
                .as_ref()
                .is_some_and(|s| s.access_token == rejected_token);
            if matches {
                *current = None;
            }
            matches
        });
        if !revoked {
            return;
        }

        tracing::info!(reason = ?SessionEnd::Rejected, "Session ended");
        if let Err(e) = self.store.clear().await {
            tracing::warn!(error = %e, "Failed to clear rejected session from storage");
        }
    }
}
