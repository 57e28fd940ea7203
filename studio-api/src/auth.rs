//! Session verification for incoming requests.
//!
//! A request carries either the session cookie set by the auth server or an
//! `Authorization: Bearer` token. A [`SessionVerifier`] decides whether that
//! credential belongs to a live session.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::header::{AUTHORIZATION, COOKIE};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub session_token: Option<String>,
    pub bearer_token: Option<String>,
    /// Raw `Cookie` header, forwarded as-is to the auth server
    pub cookie_header: Option<String>,
}

impl Credentials {
    pub fn is_empty(&self) -> bool {
        self.session_token.is_none() && self.bearer_token.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedSession {
    pub user_id: Option<String>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("auth server request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("auth server returned {0}")]
    Upstream(reqwest::StatusCode),
}

#[async_trait]
pub trait SessionVerifier: Send + Sync {
    /// `Ok(None)` when the credentials do not identify a live session
    async fn verify(&self, credentials: &Credentials) -> Result<Option<VerifiedSession>, VerifyError>;
}

/// Accepts any non-empty credential and dates it `ttl` from now
pub struct PresenceVerifier {
    ttl: Duration,
}

impl PresenceVerifier {
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            ttl: Duration::seconds(ttl_secs),
        }
    }
}

#[async_trait]
impl SessionVerifier for PresenceVerifier {
    async fn verify(&self, credentials: &Credentials) -> Result<Option<VerifiedSession>, VerifyError> {
        let present = [&credentials.session_token, &credentials.bearer_token]
            .into_iter()
            .flatten()
            .any(|token| !token.is_empty());
        Ok(present.then(|| VerifiedSession {
            user_id: None,
            expires_at: Utc::now() + self.ttl,
        }))
    }
}

#[derive(Deserialize)]
struct RemoteSessionBody {
    session: Option<RemoteSession>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteSession {
    user_id: Option<String>,
    expires_at: DateTime<Utc>,
}

/// Asks the auth server's session endpoint, forwarding the caller's cookies
pub struct RemoteSessionVerifier {
    client: reqwest::Client,
    url: String,
}

impl RemoteSessionVerifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl SessionVerifier for RemoteSessionVerifier {
    async fn verify(&self, credentials: &Credentials) -> Result<Option<VerifiedSession>, VerifyError> {
        let mut request = self.client.get(&self.url);
        if let Some(cookies) = &credentials.cookie_header {
            request = request.header(COOKIE, cookies);
        }
        if let Some(token) = &credentials.bearer_token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = request.send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(VerifyError::Upstream(status));
        }

        // The auth server answers `null` for an unknown session
        let body: Option<RemoteSessionBody> = response.json().await?;
        let session = body.and_then(|b| b.session);
        tracing::debug!(found = session.is_some(), "Verified session with auth server");
        Ok(session.map(|s| VerifiedSession {
            user_id: s.user_id,
            expires_at: s.expires_at,
        }))
    }
}
