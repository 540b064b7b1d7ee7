//! Stateless Microsoft Graph read operations for the role report.
//!
//! Every operation takes the bearer token as a parameter; token lifecycle
//! belongs to [`crate::TokenManager`]. Per-user operations fold non-success
//! statuses into `Ok(None)` so callers can treat them as skips, while the
//! tenant-level catalog fetch propagates its failures.

use serde::Deserialize;
use std::time::Duration;
use tracing::{error, instrument, warn};

use crate::error::{ExportError, ExportResult};
use crate::model::RoleCatalog;

/// `OData` type tag marking a directory-role membership entry.
const DIRECTORY_ROLE_TYPE: &str = "#microsoft.graph.directoryRole";

/// Response wrapper for Graph collection endpoints.
#[derive(Debug, Deserialize)]
struct ODataCollection<T> {
    value: Vec<T>,
}

/// A directory role entry from `/directoryRoles`.
#[derive(Debug, Deserialize)]
struct DirectoryRole {
    id: String,
    #[serde(rename = "displayName")]
    display_name: String,
}

/// A membership entry from `/users/{id}/memberOf`. The collection mixes
/// directory roles, groups, and other directory objects.
#[derive(Debug, Deserialize)]
struct DirectoryObject {
    id: String,
    #[serde(rename = "@odata.type", default)]
    odata_type: Option<String>,
}

/// A user profile from `/users/{id}`.
#[derive(Debug, Deserialize)]
struct UserProfile {
    #[serde(rename = "displayName")]
    display_name: Option<String>,
}

/// Microsoft Graph API client.
#[derive(Debug)]
pub struct GraphClient {
    http: reqwest::Client,
    base_url: String,
}

impl GraphClient {
    /// Creates a client for the given Graph endpoint base.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(graph_endpoint: &str) -> ExportResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ExportError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: format!("{}/v1.0", graph_endpoint.trim_end_matches('/')),
        })
    }

    /// Lists the tenant's activated directory roles as an id → display-name
    /// catalog.
    ///
    /// # Errors
    ///
    /// Any non-success status propagates: the catalog is a per-tenant
    /// precondition, not a per-user skip.
    #[instrument(skip(self, token))]
    pub async fn list_directory_roles(&self, token: &str) -> ExportResult<RoleCatalog> {
        let url = format!("{}/directoryRoles?$select=id,displayName", self.base_url);

        let response = self.http.get(&url).bearer_auth(token).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExportError::GraphApi {
                status: status.as_u16(),
                message: body,
            });
        }

        let roles: ODataCollection<DirectoryRole> = response.json().await?;
        Ok(roles
            .value
            .into_iter()
            .map(|role| (role.id, role.display_name))
            .collect())
    }

    /// Lists a user's directory-role display names, resolved through the
    /// tenant catalog. Group and other membership kinds are excluded.
    ///
    /// Returns `Ok(None)` when Graph answers with a non-success status — the
    /// caller treats the user's roles as unavailable and skips the user.
    ///
    /// # Errors
    ///
    /// Transport failures (connect, timeout) are returned as errors.
    #[instrument(skip(self, token, catalog))]
    pub async fn list_user_directory_roles(
        &self,
        token: &str,
        user_id: &str,
        catalog: &RoleCatalog,
    ) -> ExportResult<Option<Vec<String>>> {
        let url = format!("{}/users/{}/memberOf", self.base_url, user_id);

        let response = self.http.get(&url).bearer_auth(token).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(
                %user_id,
                status = status.as_u16(),
                body = %body,
                "Failed to fetch role memberships"
            );
            return Ok(None);
        }

        let memberships: ODataCollection<DirectoryObject> = response.json().await?;
        Ok(Some(resolve_directory_roles(memberships.value, catalog)))
    }

    /// Fetches a user's display name.
    ///
    /// A 404 is the distinguished not-found outcome; any other non-success
    /// status also maps to `Ok(None)` but is logged at error level. A present
    /// profile with no display name yields `"Unknown"`.
    ///
    /// # Errors
    ///
    /// Transport failures (connect, timeout) are returned as errors.
    #[instrument(skip(self, token))]
    pub async fn get_user_display_name(
        &self,
        token: &str,
        user_id: &str,
    ) -> ExportResult<Option<String>> {
        let url = format!("{}/users/{}?$select=displayName", self.base_url, user_id);

        let response = self.http.get(&url).bearer_auth(token).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            warn!(%user_id, "User not found in directory");
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(
                %user_id,
                status = status.as_u16(),
                body = %body,
                "Failed to fetch user details"
            );
            return Ok(None);
        }

        let profile: UserProfile = response.json().await?;
        Ok(Some(
            profile.display_name.unwrap_or_else(|| "Unknown".to_string()),
        ))
    }
}

/// Filters membership entries to directory roles and resolves them through
/// the catalog. Ids absent from the catalog are dropped.
fn resolve_directory_roles(objects: Vec<DirectoryObject>, catalog: &RoleCatalog) -> Vec<String> {
    objects
        .into_iter()
        .filter(|object| object.odata_type.as_deref() == Some(DIRECTORY_ROLE_TYPE))
        .filter_map(|object| catalog.get(&object.id).cloned())
        .collect()
}
