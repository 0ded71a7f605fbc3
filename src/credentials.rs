//! Out-of-band resolution of the translation credential
//!
//! The secret is never compiled in. It comes either from local configuration
//! (env var or config file) or from a trusted backend that issues short-lived
//! tokens, which are cached until shortly before they expire.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::{Error, Result};

/// Token lifetime assumed when the backend does not report one
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(300);

/// Refresh tokens this long before the backend says they expire
const EXPIRY_MARGIN: Duration = Duration::from_secs(30);

/// Supplies the secret attached to remote translation requests
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Resolve the current credential
    ///
    /// # Errors
    ///
    /// Returns error if no credential can be obtained
    async fn credential(&self) -> Result<SecretString>;

    /// Forget any cached credential after the service rejected it
    async fn invalidate(&self) {}
}

/// Credential read once from local configuration
pub struct StaticCredential {
    secret: SecretString,
}

impl StaticCredential {
    /// Wrap a configured secret
    ///
    /// # Errors
    ///
    /// Returns error if the secret is empty
    pub fn new(secret: SecretString) -> Result<Self> {
        if secret.expose_secret().trim().is_empty() {
            return Err(Error::Config("translation API key is empty".to_string()));
        }
        Ok(Self { secret })
    }
}

#[async_trait]
impl CredentialProvider for StaticCredential {
    async fn credential(&self) -> Result<SecretString> {
        Ok(self.secret.clone())
    }
}

/// Response from the token backend
#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Cached backend token
struct CachedToken {
    token: SecretString,
    expires_at: Instant,
}

/// Fetches short-lived tokens from a trusted backend, with caching
pub struct BackendTokenProvider {
    token_url: String,
    client: reqwest::Client,
    cache: RwLock<Option<CachedToken>>,
}

impl BackendTokenProvider {
    /// Create a provider that fetches tokens from `token_url`
    #[must_use]
    pub fn new(token_url: String) -> Self {
        Self {
            token_url,
            client: reqwest::Client::new(),
            cache: RwLock::new(None),
        }
    }

    async fn fetch(&self) -> Result<CachedToken> {
        tracing::debug!(url = %self.token_url, "fetching translation token");

        let response = self.client.get(&self.token_url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "token backend error");
            return Err(Error::Credential(format!(
                "token backend error {status}: {body}"
            )));
        }

        let body: TokenResponse = response.json().await?;
        if body.token.is_empty() {
            return Err(Error::Credential("token backend returned empty token".to_string()));
        }

        let ttl = body
            .expires_in
            .map_or(DEFAULT_TOKEN_TTL, Duration::from_secs)
            .saturating_sub(EXPIRY_MARGIN);

        Ok(CachedToken {
            token: SecretString::from(body.token),
            expires_at: Instant::now() + ttl,
        })
    }
}

#[async_trait]
impl CredentialProvider for BackendTokenProvider {
    async fn credential(&self) -> Result<SecretString> {
        // Fast path: read-lock
        {
            let cache = self.cache.read().await;
            if let Some(token) = fresh_token(cache.as_ref()) {
                return Ok(token);
            }
        }

        let mut cache = self.cache.write().await;
        // Another task may have refreshed while we waited
        if let Some(token) = fresh_token(cache.as_ref()) {
            return Ok(token);
        }

        let fresh = self.fetch().await?;
        let token = fresh.token.clone();
        *cache = Some(fresh);
        Ok(token)
    }

    async fn invalidate(&self) {
        tracing::debug!(url = %self.token_url, "dropping cached translation token");
        *self.cache.write().await = None;
    }
}

fn fresh_token(cached: Option<&CachedToken>) -> Option<SecretString> {
    cached
        .filter(|c| c.expires_at > Instant::now())
        .map(|c| c.token.clone())
}
