//! Runtime configuration loaded from environment variables.
//!
//! Loading is fail-fast: required variables must be present and valid or the
//! process exits with a clear error before any work starts.

use secrecy::SecretString;
use std::env;
use thiserror::Error;

/// Token endpoint base for the Microsoft identity platform.
pub const DEFAULT_LOGIN_ENDPOINT: &str = "https://login.microsoftonline.com";

/// Microsoft Graph API base.
pub const DEFAULT_GRAPH_ENDPOINT: &str = "https://graph.microsoft.com";

/// Default width of the tenant worker pool. Tenants are heavy units of work,
/// and this bound caps simultaneous token/API load across tenants.
pub const DEFAULT_TENANT_WORKERS: usize = 5;

/// Default width of the per-tenant user worker pool. Directory calls are
/// latency-bound and a single tenant can hold a large user population.
pub const DEFAULT_USER_WORKERS: usize = 300;

/// Configuration errors that can occur during environment loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },
}

/// `OAuth2` client credentials for the Entra application.
#[derive(Debug)]
pub struct GraphCredentials {
    /// Application (client) ID.
    pub client_id: String,
    /// Client secret, exposed only at the token request site.
    pub client_secret: SecretString,
}

/// Identity-platform and Graph API endpoints.
///
/// Defaults target the Microsoft commercial cloud; both are overridable so
/// tests can point at a local mock server.
#[derive(Debug, Clone)]
pub struct GraphEndpoints {
    /// Token endpoint base, without a trailing slash.
    pub login: String,
    /// Graph API base, without a trailing slash.
    pub graph: String,
}

impl GraphEndpoints {
    /// Creates endpoints from the given bases, normalizing trailing slashes.
    pub fn new(login_endpoint: impl Into<String>, graph_endpoint: impl Into<String>) -> Self {
        let login = login_endpoint.into();
        let graph = graph_endpoint.into();
        Self {
            login: login.trim_end_matches('/').to_string(),
            graph: graph.trim_end_matches('/').to_string(),
        }
    }

    /// Endpoints for the Microsoft commercial cloud.
    #[must_use]
    pub fn microsoft() -> Self {
        Self::new(DEFAULT_LOGIN_ENDPOINT, DEFAULT_GRAPH_ENDPOINT)
    }

    /// Token endpoint URL for a tenant's client-credentials grant.
    #[must_use]
    pub fn token_url(&self, tenant_id: &str) -> String {
        format!("{}/{}/oauth2/v2.0/token", self.login, tenant_id)
    }

    /// The `.default` scope covering the application's granted Graph roles.
    #[must_use]
    pub fn default_scope(&self) -> String {
        format!("{}/.default", self.graph)
    }
}

/// Full configuration for one export run.
#[derive(Debug)]
pub struct ExportConfig {
    pub credentials: GraphCredentials,
    pub endpoints: GraphEndpoints,
    pub database_url: String,
    /// Table holding the ingested tenant/user snapshot.
    pub snapshot_table: String,
    /// Table receiving the flattened role rows.
    pub destination_table: String,
    pub tenant_workers: usize,
    pub user_workers: usize,
    pub rust_log: String,
}

impl ExportConfig {
    /// Loads configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing or a worker
    /// count is not a positive integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        let client_id = env::var("ENTRA_CLIENT_ID")
            .map_err(|_| ConfigError::MissingVar("ENTRA_CLIENT_ID".to_string()))?;
        let client_secret = env::var("ENTRA_CLIENT_SECRET")
            .map_err(|_| ConfigError::MissingVar("ENTRA_CLIENT_SECRET".to_string()))?;
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let login = env::var("ENTRA_LOGIN_ENDPOINT")
            .unwrap_or_else(|_| DEFAULT_LOGIN_ENDPOINT.to_string());
        let graph = env::var("ENTRA_GRAPH_ENDPOINT")
            .unwrap_or_else(|_| DEFAULT_GRAPH_ENDPOINT.to_string());

        let snapshot_table = env::var("EXPORT_SNAPSHOT_TABLE")
            .unwrap_or_else(|_| "tenant_user_snapshot".to_string());
        let destination_table = env::var("EXPORT_DESTINATION_TABLE")
            .unwrap_or_else(|_| "entra_user_roles".to_string());

        let tenant_workers = parse_worker_count("EXPORT_TENANT_WORKERS", DEFAULT_TENANT_WORKERS)?;
        let user_workers = parse_worker_count("EXPORT_USER_WORKERS", DEFAULT_USER_WORKERS)?;

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            credentials: GraphCredentials {
                client_id,
                client_secret: client_secret.into(),
            },
            endpoints: GraphEndpoints::new(login, graph),
            database_url,
            snapshot_table,
            destination_table,
            tenant_workers,
            user_workers,
            rust_log,
        })
    }
}

/// Parses a pool-width variable, falling back to the default when unset.
fn parse_worker_count(var: &str, default: usize) -> Result<usize, ConfigError> {
    match env::var(var) {
        Ok(raw) => match raw.parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(ConfigError::InvalidValue {
                var: var.to_string(),
                message: format!("expected a positive integer, got '{raw}'"),
            }),
        },
        Err(_) => Ok(default),
    }
}
