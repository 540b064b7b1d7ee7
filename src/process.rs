//! Per-user processing: two directory reads folded into one outcome.

use chrono::NaiveDate;
use tracing::{error, warn};

use crate::graph::GraphClient;
use crate::model::{RoleCatalog, SkipReason, UserOutcome, UserRoleRow};

/// Resolves one user into an output row, or a skip when either read comes
/// back empty or fails. A skip never carries a partial record, and a failing
/// user never aborts its siblings.
pub async fn process_user(
    graph: &GraphClient,
    tenant_id: &str,
    user_id: &str,
    token: &str,
    catalog: &RoleCatalog,
    snapshot_date: NaiveDate,
) -> UserOutcome {
    let display_name = match graph.get_user_display_name(token, user_id).await {
        Ok(Some(name)) => name,
        Ok(None) => {
            warn!(%tenant_id, %user_id, "User details not found, skipping user");
            return UserOutcome::Skipped(SkipReason::ProfileNotFound);
        }
        Err(e) => {
            error!(%tenant_id, %user_id, error = %e, "Request failed while fetching user details");
            return UserOutcome::Skipped(SkipReason::RequestFailed);
        }
    };

    let role_names = match graph
        .list_user_directory_roles(token, user_id, catalog)
        .await
    {
        Ok(Some(names)) => names,
        Ok(None) => {
            warn!(%tenant_id, %user_id, "User roles not found, skipping user");
            return UserOutcome::Skipped(SkipReason::RolesUnavailable);
        }
        Err(e) => {
            error!(%tenant_id, %user_id, error = %e, "Request failed while fetching user roles");
            return UserOutcome::Skipped(SkipReason::RequestFailed);
        }
    };

    UserOutcome::Row(UserRoleRow {
        tenant_id: tenant_id.to_string(),
        user_id: user_id.to_string(),
        display_name,
        roles: role_names.join(", "),
        snapshot_date,
    })
}
