//! Common test utilities: wiremock fixtures for the identity-platform and
//! Graph endpoints, plus in-memory warehouse fakes.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use entra_roles_export::{
    ExportResult, GraphCredentials, GraphEndpoints, RoleRowSink, SnapshotSource, TenantSnapshot,
    UserRoleRow,
};

/// Credentials accepted by the mock token endpoint.
pub fn test_credentials() -> Arc<GraphCredentials> {
    Arc::new(GraphCredentials {
        client_id: "test-client".to_string(),
        client_secret: "test-secret".to_string().into(),
    })
}

/// Points both the login and Graph endpoints at the mock server.
pub fn endpoints_for(server: &MockServer) -> GraphEndpoints {
    GraphEndpoints::new(server.uri(), server.uri())
}

/// Wraps items in the Graph collection response format.
pub fn odata(items: Vec<Value>) -> Value {
    json!({ "value": items })
}

/// A `memberOf` entry tagged as a directory role.
pub fn directory_role_member(id: &str) -> Value {
    json!({ "@odata.type": "#microsoft.graph.directoryRole", "id": id })
}

/// A `memberOf` entry tagged as an ordinary group.
pub fn group_member(id: &str) -> Value {
    json!({ "@odata.type": "#microsoft.graph.group", "id": id })
}

/// Mounts a tenant's token endpoint issuing the given access token.
pub async fn mount_token_endpoint(
    server: &MockServer,
    tenant_id: &str,
    access_token: &str,
    expires_in: i64,
) {
    Mock::given(method("POST"))
        .and(path(format!("/{tenant_id}/oauth2/v2.0/token")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "expires_in": expires_in,
            "access_token": access_token,
        })))
        .mount(server)
        .await;
}

/// Mounts the directory-role catalog for requests bearing the given token.
pub async fn mount_directory_roles(server: &MockServer, access_token: &str, roles: Vec<(&str, &str)>) {
    let body = odata(
        roles
            .into_iter()
            .map(|(id, name)| json!({ "id": id, "displayName": name }))
            .collect(),
    );
    Mock::given(method("GET"))
        .and(path("/v1.0/directoryRoles"))
        .and(header("Authorization", format!("Bearer {access_token}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mounts a user profile with the given display name.
pub async fn mount_user_profile(server: &MockServer, user_id: &str, display_name: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/v1.0/users/{user_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": user_id,
            "displayName": display_name,
        })))
        .mount(server)
        .await;
}

/// Mounts a user's `memberOf` collection.
pub async fn mount_member_of(server: &MockServer, user_id: &str, memberships: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/v1.0/users/{user_id}/memberOf")))
        .respond_with(ResponseTemplate::new(200).set_body_json(memberships))
        .mount(server)
        .await;
}

/// In-memory snapshot source.
pub struct MemorySource {
    pub tenants: Vec<TenantSnapshot>,
}

#[async_trait]
impl SnapshotSource for MemorySource {
    async fn load_latest(&self) -> ExportResult<Vec<TenantSnapshot>> {
        Ok(self.tenants.clone())
    }
}

/// In-memory row sink recording every flush.
#[derive(Default)]
pub struct MemorySink {
    pub writes: Mutex<Vec<(String, Vec<UserRoleRow>)>>,
}

#[async_trait]
impl RoleRowSink for MemorySink {
    async fn insert_rows(&self, tenant_id: &str, rows: &[UserRoleRow]) -> ExportResult<()> {
        self.writes
            .lock()
            .await
            .push((tenant_id.to_string(), rows.to_vec()));
        Ok(())
    }
}

/// Sink whose every insert fails, for write-error containment tests.
pub struct FailingSink;

#[async_trait]
impl RoleRowSink for FailingSink {
    async fn insert_rows(&self, _tenant_id: &str, _rows: &[UserRoleRow]) -> ExportResult<()> {
        Err(sqlx::Error::RowNotFound.into())
    }
}
