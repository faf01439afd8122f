// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session and identity models.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::AppError;

/// How a session was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    Apple,
    Facebook,
    /// Email + password, not a third-party identity provider
    Password,
}

impl Provider {
    /// Whether this provider issues identity assertions usable for bootstrap.
    pub fn is_identity_provider(self) -> bool {
        !matches!(self, Provider::Password)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Apple => "apple",
            Provider::Facebook => "facebook",
            Provider::Password => "password",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Short-lived credential from a third-party identity provider.
///
/// Consumed by value during bootstrap and never persisted.
#[derive(Clone)]
pub struct IdentityAssertion {
    token: String,
    provider: Provider,
}

impl IdentityAssertion {
    pub fn new(token: impl Into<String>, provider: Provider) -> Self {
        Self {
            token: token.into(),
            provider,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }
}

impl fmt::Debug for IdentityAssertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityAssertion")
            .field("token", &"<redacted>")
            .field("provider", &self.provider)
            .finish()
    }
}

/// Email + password sign-in or registration body.
#[derive(Clone, Serialize)]
pub struct PasswordCredentials {
    pub email: String,
    pub password: String,
    /// Sent on registration only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

impl PasswordCredentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            full_name: None,
        }
    }

    pub fn with_full_name(mut self, name: impl Into<String>) -> Self {
        self.full_name = Some(name.into());
        self
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let email = self.email.trim();
        let valid_email = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !valid_email {
            return Err(AppError::Validation("email address is malformed".to_string()));
        }
        if self.password.is_empty() {
            return Err(AppError::Validation("password must not be empty".to_string()));
        }
        Ok(())
    }
}

impl fmt::Debug for PasswordCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("full_name", &self.full_name)
            .finish()
    }
}

/// Tokens issued by the backend auth endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthTokens {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<AccountUser>,
}

impl AuthTokens {
    /// Non-empty access token, if the response carried one.
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// Account summary returned alongside issued tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountUser {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Authenticated identity held by the client.
///
/// Persisted as a single document, so it is either fully present or absent.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub provider: Provider,
    pub issued_at: DateTime<Utc>,
    /// Account id, from the response or the access token `sub` claim
    #[serde(default)]
    pub user_id: Option<String>,
    /// Access token expiry, from the `exp` claim when the token is a JWT
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Build a session from an auth response. Returns `None` without an access token.
    pub fn from_tokens(tokens: &AuthTokens, provider: Provider, now: DateTime<Utc>) -> Option<Self> {
        let access_token = tokens.access_token()?.to_string();
        let claims = peek_claims(&access_token);

        let user_id = tokens
            .user
            .as_ref()
            .and_then(|u| u.id.clone())
            .or_else(|| claims.as_ref().and_then(|c| c.sub.clone()));
        let expires_at = claims
            .as_ref()
            .and_then(|c| c.exp)
            .and_then(|exp| DateTime::from_timestamp(exp, 0));

        Some(Self {
            access_token,
            refresh_token: tokens.refresh_token.clone().filter(|t| !t.is_empty()),
            provider,
            issued_at: now,
            user_id,
            expires_at,
        })
    }

    /// False for documents that only partially made it to storage.
    pub fn is_complete(&self) -> bool {
        !self.access_token.is_empty() && self.refresh_token.as_deref() != Some("")
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("provider", &self.provider)
            .field("issued_at", &self.issued_at)
            .field("user_id", &self.user_id)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Claims read from an access token.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Read claims from a JWT access token without verifying it.
///
/// The backend is the only party that validates tokens; the client only
/// uses these claims for display and bookkeeping. Opaque tokens yield `None`.
pub fn peek_claims(token: &str) -> Option<TokenClaims> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();

    decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .ok()
        .map(|data| data.claims)
}
