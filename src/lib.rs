//! Per-tenant Entra ID user role export.
//!
//! Reads the latest tenant/user snapshot from the warehouse, fans out over
//! tenants — and, within each tenant, over that tenant's users — against the
//! Microsoft Graph API, and appends one flattened role row per resolved user
//! to a destination table.
//!
//! Each tenant task owns a short-lived client-credentials token managed by
//! [`TokenManager`]; per-user failures are folded into skip outcomes so a bad
//! user never poisons its tenant's batch, and a failing tenant never stops
//! its siblings.

mod auth;
mod config;
mod error;
mod graph;
mod model;
mod orchestrator;
mod process;
mod tenant;
mod warehouse;

// Re-exports
pub use auth::{TokenManager, EXPIRY_SAFETY_MARGIN_SECS};
pub use config::{
    ConfigError, ExportConfig, GraphCredentials, GraphEndpoints, DEFAULT_GRAPH_ENDPOINT,
    DEFAULT_LOGIN_ENDPOINT, DEFAULT_TENANT_WORKERS, DEFAULT_USER_WORKERS,
};
pub use error::{ExportError, ExportResult};
pub use graph::GraphClient;
pub use model::{RoleCatalog, SkipReason, TenantSnapshot, UserOutcome, UserRoleRow};
pub use orchestrator::Orchestrator;
pub use process::process_user;
pub use tenant::{TenantProcessor, TenantSummary};
pub use warehouse::{PgWarehouse, RoleRowSink, SnapshotSource};
