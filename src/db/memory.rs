// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory session store, for tests and hosts without a filesystem.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::db::SessionStore;
use crate::error::AppError;
use crate::models::Session;

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: Mutex<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a session, as if persisted by an earlier run.
    pub fn with_session(session: Session) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<Option<Session>, AppError> {
        Ok(self
            .session
            .lock()
            .await
            .clone()
            .filter(Session::is_complete))
    }

    async fn save(&self, session: &Session) -> Result<(), AppError> {
        *self.session.lock().await = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), AppError> {
        *self.session.lock().await = None;
        Ok(())
    }
}
