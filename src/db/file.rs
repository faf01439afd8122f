// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! File-backed session store.
//!
//! The session is written as one JSON document to a sibling temp file and
//! then renamed over the target, so readers see the old session or the new
//! one and never a mix of the two.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::db::SessionStore;
use crate::error::AppError;
use crate::models::Session;

/// Session store backed by a JSON file.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "session".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> Result<Option<Session>, AppError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AppError::Storage(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        match serde_json::from_slice::<Session>(&bytes) {
            Ok(session) if session.is_complete() => Ok(Some(session)),
            Ok(_) => {
                tracing::warn!(path = %self.path.display(), "Stored session is incomplete, ignoring");
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Stored session is unreadable, ignoring"
                );
                Ok(None)
            }
        }
    }

    async fn save(&self, session: &Session) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to create {}: {}", parent.display(), e)))?;
        }

        let body = serde_json::to_vec(session)
            .map_err(|e| AppError::Storage(format!("Failed to encode session: {}", e)))?;

        let temp = self.temp_path();
        tokio::fs::write(&temp, &body)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write {}: {}", temp.display(), e)))?;
        tokio::fs::rename(&temp, &self.path).await.map_err(|e| {
            AppError::Storage(format!("Failed to replace {}: {}", self.path.display(), e))
        })?;

        Ok(())
    }

    async fn clear(&self) -> Result<(), AppError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(format!(
                "Failed to remove {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}
