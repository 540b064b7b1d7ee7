//! Top-level run loop: snapshot load and bounded tenant fan-out.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, instrument};

use crate::error::{ExportError, ExportResult};
use crate::tenant::TenantProcessor;
use crate::warehouse::SnapshotSource;

/// Drives one batch run over the latest tenant/user snapshot.
pub struct Orchestrator {
    source: Arc<dyn SnapshotSource>,
    tenants: Arc<TenantProcessor>,
    tenant_workers: usize,
}

impl Orchestrator {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        tenants: Arc<TenantProcessor>,
        tenant_workers: usize,
    ) -> Self {
        Self {
            source,
            tenants,
            tenant_workers,
        }
    }

    /// Loads the snapshot once and processes every tenant through a bounded
    /// pool. A tenant task's failure is logged and does not affect its
    /// siblings; success means every tenant was attempted.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::EmptySnapshot`] when the source yields no
    /// tenants, and propagates snapshot-load failures.
    #[instrument(skip(self))]
    pub async fn run(&self) -> ExportResult<()> {
        let snapshot = self.source.load_latest().await?;
        if snapshot.is_empty() {
            return Err(ExportError::EmptySnapshot);
        }

        let snapshot_date = Utc::now().date_naive();
        info!(
            tenants = snapshot.len(),
            %snapshot_date,
            "Starting role export for all tenants"
        );

        let semaphore = Arc::new(Semaphore::new(self.tenant_workers));
        let mut tasks = JoinSet::new();
        for tenant in snapshot {
            let processor = self.tenants.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                // Never closed; bounds how many tenants run at once.
                let _permit = semaphore.acquire_owned().await.ok();
                let tenant_id = tenant.tenant_id.clone();
                (tenant_id, processor.process(tenant, snapshot_date).await)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((tenant_id, Ok(summary))) => {
                    info!(
                        %tenant_id,
                        materialized = summary.materialized,
                        skipped = summary.skipped,
                        "Completed processing for tenant"
                    );
                }
                Ok((tenant_id, Err(e))) => {
                    error!(%tenant_id, error = %e, "Tenant processing failed");
                }
                Err(e) => {
                    error!(error = %e, "Tenant task failed unexpectedly");
                }
            }
        }

        info!("Role export completed for all tenants");
        Ok(())
    }
}
