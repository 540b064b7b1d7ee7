//! Tenant-level processing: credential bootstrap, catalog fetch, bounded
//! user fan-out, and the per-tenant batch flush.

use chrono::NaiveDate;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument};

use crate::auth::TokenManager;
use crate::config::{GraphCredentials, GraphEndpoints};
use crate::error::ExportResult;
use crate::graph::GraphClient;
use crate::model::{TenantSnapshot, UserOutcome};
use crate::process::process_user;
use crate::warehouse::RoleRowSink;

/// Counts reported by one tenant's run.
#[derive(Debug, Clone, Copy)]
pub struct TenantSummary {
    /// Rows handed to the sink.
    pub materialized: usize,
    /// Users that produced no row.
    pub skipped: usize,
}

/// Processes one tenant at a time: owns the shared Graph client and sink,
/// and creates a fresh [`TokenManager`] per tenant.
pub struct TenantProcessor {
    graph: Arc<GraphClient>,
    sink: Arc<dyn RoleRowSink>,
    credentials: Arc<GraphCredentials>,
    endpoints: GraphEndpoints,
    user_workers: usize,
}

impl TenantProcessor {
    pub fn new(
        graph: Arc<GraphClient>,
        sink: Arc<dyn RoleRowSink>,
        credentials: Arc<GraphCredentials>,
        endpoints: GraphEndpoints,
        user_workers: usize,
    ) -> Self {
        Self {
            graph,
            sink,
            credentials,
            endpoints,
            user_workers,
        }
    }

    /// Runs the full per-tenant pipeline and flushes the resulting batch.
    ///
    /// User outcomes are collected in completion order; a user task that
    /// fails unexpectedly is logged and counted as a skip. A failed batch
    /// insert is logged and not retried — the tenant still completes.
    ///
    /// # Errors
    ///
    /// Credential bootstrap and role-catalog failures propagate; the
    /// orchestrator catches them as a tenant-level failure.
    #[instrument(skip(self, tenant), fields(tenant_id = %tenant.tenant_id))]
    pub async fn process(
        &self,
        tenant: TenantSnapshot,
        snapshot_date: NaiveDate,
    ) -> ExportResult<TenantSummary> {
        info!(users = tenant.user_ids.len(), "Processing tenant");

        let tokens =
            TokenManager::bootstrap(&self.endpoints, self.credentials.clone(), &tenant.tenant_id)
                .await?;
        tokens.ensure_valid().await?;
        let token = tokens.current_token().await;

        let catalog = Arc::new(self.graph.list_directory_roles(&token).await?);
        debug!(roles = catalog.len(), "Fetched directory role catalog");

        let semaphore = Arc::new(Semaphore::new(self.user_workers));
        let mut tasks = JoinSet::new();
        for user_id in tenant.user_ids {
            let graph = self.graph.clone();
            let semaphore = semaphore.clone();
            let catalog = catalog.clone();
            let token = token.clone();
            let tenant_id = tenant.tenant_id.clone();
            tasks.spawn(async move {
                // The semaphore is never closed; holding the permit bounds
                // concurrent Graph calls for this tenant.
                let _permit = semaphore.acquire_owned().await.ok();
                process_user(&graph, &tenant_id, &user_id, &token, &catalog, snapshot_date).await
            });
        }

        let mut batch = Vec::new();
        let mut skipped = 0usize;
        while let Some(outcome) = tasks.join_next().await {
            match outcome {
                Ok(UserOutcome::Row(row)) => {
                    debug!(user_id = %row.user_id, "Processed user");
                    batch.push(row);
                }
                Ok(UserOutcome::Skipped(_)) => skipped += 1,
                Err(e) => {
                    error!(error = %e, "User task failed unexpectedly");
                    skipped += 1;
                }
            }
        }

        let materialized = batch.len();
        if batch.is_empty() {
            info!("No rows to insert for tenant");
        } else {
            info!(rows = materialized, "Inserting tenant batch");
            if let Err(e) = self.sink.insert_rows(&tenant.tenant_id, &batch).await {
                error!(error = %e, "Failed to insert tenant batch");
            }
        }

        Ok(TenantSummary {
            materialized,
            skipped,
        })
    }
}
