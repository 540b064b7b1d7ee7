//! `OAuth2` client-credentials authentication for Microsoft Graph.
//!
//! Each tenant task owns one [`TokenManager`]; the held credential is never
//! shared across tenants.

use chrono::{DateTime, Duration, Utc};
use secrecy::ExposeSecret;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::config::{GraphCredentials, GraphEndpoints};
use crate::error::{ExportError, ExportResult};

/// Seconds subtracted from the advertised token lifetime, so a token is
/// never handed out this close to its real expiry.
pub const EXPIRY_SAFETY_MARGIN_SECS: i64 = 300;

/// `OAuth2` token response from the identity platform.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// The held bearer credential. Recreated wholesale on refresh, never patched.
#[derive(Debug)]
struct Credential {
    token: String,
    expires_at: DateTime<Utc>,
}

impl Credential {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Per-tenant manager for a mutable, expiring bearer token.
///
/// Construction performs an eager initial fetch, so the first
/// [`current_token`](Self::current_token) is always valid. The
/// check-and-refresh in [`ensure_valid`](Self::ensure_valid) runs under a
/// mutex, so concurrent callers trigger at most one network refresh per
/// expiry window.
#[derive(Debug)]
pub struct TokenManager {
    tenant_id: String,
    credentials: Arc<GraphCredentials>,
    token_url: String,
    scope: String,
    http: reqwest::Client,
    credential: Mutex<Credential>,
}

impl TokenManager {
    /// Creates a manager for one tenant and fetches its initial token.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial token request fails; inside a tenant
    /// task this aborts only that tenant.
    pub async fn bootstrap(
        endpoints: &GraphEndpoints,
        credentials: Arc<GraphCredentials>,
        tenant_id: &str,
    ) -> ExportResult<Self> {
        let http = reqwest::Client::new();
        let token_url = endpoints.token_url(tenant_id);
        let scope = endpoints.default_scope();

        let initial = acquire_token(&http, &token_url, &credentials, &scope).await?;

        Ok(Self {
            tenant_id: tenant_id.to_string(),
            credentials,
            token_url,
            scope,
            http,
            credential: Mutex::new(initial),
        })
    }

    /// Refreshes the held credential if its validity window has passed.
    ///
    /// Idempotent; network or auth errors propagate to the caller and the
    /// previous credential stays in place.
    #[instrument(skip(self), fields(tenant_id = %self.tenant_id))]
    pub async fn ensure_valid(&self) -> ExportResult<()> {
        let mut credential = self.credential.lock().await;
        if credential.is_expired(Utc::now()) {
            debug!("Access token expired, refreshing");
            *credential =
                acquire_token(&self.http, &self.token_url, &self.credentials, &self.scope).await?;
        }
        Ok(())
    }

    /// Returns the presently held token. Performs no network I/O.
    pub async fn current_token(&self) -> String {
        self.credential.lock().await.token.clone()
    }
}

/// Acquires a new token via the client-credentials grant.
async fn acquire_token(
    http: &reqwest::Client,
    token_url: &str,
    credentials: &GraphCredentials,
    scope: &str,
) -> ExportResult<Credential> {
    let params = [
        ("grant_type", "client_credentials"),
        ("client_id", credentials.client_id.as_str()),
        ("client_secret", credentials.client_secret.expose_secret()),
        ("scope", scope),
    ];

    let response = http
        .post(token_url)
        .form(&params)
        .send()
        .await
        .map_err(|e| ExportError::Auth(format!("Token request failed: {e}")))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(ExportError::Auth(format!(
            "Token request failed with status {status}: {body}"
        )));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| ExportError::Auth(format!("Failed to parse token response: {e}")))?;

    let expires_at = Utc::now() + Duration::seconds(token.expires_in - EXPIRY_SAFETY_MARGIN_SECS);
    debug!(%expires_at, "Acquired new access token");

    Ok(Credential {
        token: token.access_token,
        expires_at,
    })
}
