// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Durable session storage.

pub mod file;
pub mod memory;

pub use file::FileSessionStore;
pub use memory::MemorySessionStore;

use crate::error::AppError;
use crate::models::Session;
use async_trait::async_trait;

/// Storage for the single client session document.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the persisted session. Incomplete documents load as `None`.
    async fn load(&self) -> Result<Option<Session>, AppError>;

    /// Persist `session`, replacing any previous one.
    async fn save(&self, session: &Session) -> Result<(), AppError>;

    /// Remove the persisted session. Succeeds if none exists.
    async fn clear(&self) -> Result<(), AppError>;
}
