//! Data carried through the export pipeline.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Directory-role id → display name, fetched once per tenant and shared
/// read-only across that tenant's user workers.
pub type RoleCatalog = HashMap<String, String>;

/// One tenant's slice of the ingested snapshot.
#[derive(Debug, Clone)]
pub struct TenantSnapshot {
    pub tenant_id: String,
    pub user_ids: Vec<String>,
}

/// A flattened output row: one user's directory roles on the snapshot date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRoleRow {
    pub tenant_id: String,
    pub user_id: String,
    pub display_name: String,
    /// Role display names joined with `", "`; empty when the user holds no
    /// directory roles.
    pub roles: String,
    /// The date the batch run executes, shared by every row in the run.
    pub snapshot_date: NaiveDate,
}

/// Why a user produced no output row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The profile lookup returned not-found or another failing status.
    ProfileNotFound,
    /// The membership lookup returned a failing status.
    RolesUnavailable,
    /// A request could not be completed at the transport level.
    RequestFailed,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProfileNotFound => write!(f, "user profile not found"),
            Self::RolesUnavailable => write!(f, "role memberships unavailable"),
            Self::RequestFailed => write!(f, "request failed"),
        }
    }
}

/// Terminal state of one user's processing: materialized or skipped.
#[derive(Debug)]
pub enum UserOutcome {
    Row(UserRoleRow),
    Skipped(SkipReason),
}
