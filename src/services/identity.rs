// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity bootstrap: turn a third-party identity assertion into a session.
//!
//! The backend has no "upsert this identity" endpoint, and the client does
//! not know ahead of time whether an account exists. Bootstrap therefore
//! always tries to provision first and falls back to logging in when the
//! backend reports a conflict:
//!
//! ```text
//! Start -> Provisioning -> Success
//!                       -> Conflict -> Authenticating -> Success | Failure
//!                       -> Failure
//! ```
//!
//! `Conflict` is internal and never surfaces to the caller.

use chrono::Utc;

use crate::error::{AppError, BackendError, Result};
use crate::models::{AuthTokens, IdentityAssertion, PasswordCredentials, Provider, Session};
use crate::services::{ApiClient, SessionManager};

/// Which backend call produced the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapPath {
    /// A new account was created
    Provisioned,
    /// An existing account was logged in
    Authenticated,
}

/// Outcome of the provisioning step.
enum Provisioning {
    Done(Session),
    /// Account exists (409) or was created without tokens; log in next
    Conflict,
}

/// Result of a password registration.
#[derive(Debug, Clone)]
pub struct Registration {
    /// Present when the backend signed the new account in immediately
    pub session: Option<Session>,
    pub user_id: Option<String>,
}

pub struct IdentityService {
    api: ApiClient,
    sessions: SessionManager,
}

impl IdentityService {
    pub fn new(api: ApiClient) -> Self {
        let sessions = api.sessions().clone();
        Self { api, sessions }
    }

    /// Exchange `assertion` for a session, creating the account if needed.
    ///
    /// The assertion is consumed. On success the session is current and has
    /// been handed to storage before this returns.
    pub async fn bootstrap(&self, assertion: IdentityAssertion) -> Result<Session> {
        self.bootstrap_with_path(assertion)
            .await
            .map(|(session, _)| session)
    }

    /// Like [`bootstrap`](Self::bootstrap), also reporting which path succeeded.
    pub async fn bootstrap_with_path(
        &self,
        assertion: IdentityAssertion,
    ) -> Result<(Session, BootstrapPath)> {
        validate_assertion(&assertion)?;
        let provider = assertion.provider();

        tracing::debug!(%provider, "Provisioning account from identity assertion");
        let (session, path) = match self.provision(&assertion).await? {
            Provisioning::Done(session) => (session, BootstrapPath::Provisioned),
            Provisioning::Conflict => {
                tracing::debug!(%provider, "Account exists, authenticating");
                let session = self.authenticate(&assertion).await?;
                (session, BootstrapPath::Authenticated)
            }
        };
        drop(assertion);

        self.sessions.establish(session.clone()).await;
        tracing::info!(%provider, ?path, "Identity bootstrap succeeded");
        Ok((session, path))
    }

    async fn provision(&self, assertion: &IdentityAssertion) -> Result<Provisioning> {
        match self.api.signup_oauth(assertion).await {
            Ok(tokens) => match Session::from_tokens(&tokens, assertion.provider(), Utc::now()) {
                Some(session) => Ok(Provisioning::Done(session)),
                None => {
                    tracing::info!(
                        provider = %assertion.provider(),
                        "Account provisioned without tokens, authenticating"
                    );
                    Ok(Provisioning::Conflict)
                }
            },
            Err(e) if e.is_conflict() => Ok(Provisioning::Conflict),
            Err(e) => {
                tracing::warn!(
                    provider = %assertion.provider(),
                    status = e.status(),
                    error = %e,
                    "Provisioning failed"
                );
                Err(AppError::IdentityBootstrap(e))
            }
        }
    }

    async fn authenticate(&self, assertion: &IdentityAssertion) -> Result<Session> {
        let tokens = self.api.login_oauth(assertion).await.map_err(|e| {
            tracing::warn!(
                provider = %assertion.provider(),
                status = e.status(),
                error = %e,
                "Authentication by assertion failed"
            );
            AppError::IdentityBootstrap(e)
        })?;

        session_or_missing_token(&tokens, assertion.provider()).map_err(AppError::IdentityBootstrap)
    }

    // ─── Password accounts ───────────────────────────────────────────────────

    /// Sign in with email and password.
    pub async fn login_with_password(&self, credentials: &PasswordCredentials) -> Result<Session> {
        credentials.validate()?;

        let tokens = self
            .api
            .login(credentials)
            .await
            .map_err(AppError::Authentication)?;
        let session = session_or_missing_token(&tokens, Provider::Password)
            .map_err(AppError::Authentication)?;

        self.sessions.establish(session.clone()).await;
        tracing::info!(provider = %Provider::Password, "Password login succeeded");
        Ok(session)
    }

    /// Register a password account.
    ///
    /// Some deployments sign the account in immediately; others require
    /// email verification first and return no tokens.
    pub async fn register_with_password(
        &self,
        credentials: &PasswordCredentials,
    ) -> Result<Registration> {
        credentials.validate()?;

        let tokens = self
            .api
            .register(credentials)
            .await
            .map_err(AppError::Authentication)?;

        let session = Session::from_tokens(&tokens, Provider::Password, Utc::now());
        if let Some(session) = &session {
            self.sessions.establish(session.clone()).await;
        }
        tracing::info!(signed_in = session.is_some(), "Password registration succeeded");

        Ok(Registration {
            user_id: tokens
                .user
                .and_then(|u| u.id)
                .or_else(|| session.as_ref().and_then(|s| s.user_id.clone())),
            session,
        })
    }

    /// End the current session.
    pub async fn sign_out(&self) -> Result<()> {
        self.sessions.sign_out().await
    }
}

fn validate_assertion(assertion: &IdentityAssertion) -> Result<()> {
    if assertion.token().trim().is_empty() {
        return Err(AppError::Validation(
            "identity assertion token must not be empty".to_string(),
        ));
    }
    if !assertion.provider().is_identity_provider() {
        return Err(AppError::Validation(format!(
            "{} is not an identity provider",
            assertion.provider()
        )));
    }
    Ok(())
}

/// A 2xx login response without an access token is still a failed login.
fn session_or_missing_token(
    tokens: &AuthTokens,
    provider: Provider,
) -> std::result::Result<Session, BackendError> {
    Session::from_tokens(tokens, provider, Utc::now()).ok_or_else(|| BackendError::Http {
        status: 502,
        message: "Response did not include an access token".to_string(),
    })
}
