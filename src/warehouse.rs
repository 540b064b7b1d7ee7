//! Warehouse seams: the snapshot source and the destination row sink.
//!
//! Both are narrow traits so tests can substitute in-memory fakes;
//! [`PgWarehouse`] implements them against Postgres.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::debug;

use crate::error::ExportResult;
use crate::model::{TenantSnapshot, UserRoleRow};

/// Yields the most-recent-ingestion-date tenant/user snapshot.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn load_latest(&self) -> ExportResult<Vec<TenantSnapshot>>;
}

/// Appends one tenant's flattened role rows to the destination table.
#[async_trait]
pub trait RoleRowSink: Send + Sync {
    async fn insert_rows(&self, tenant_id: &str, rows: &[UserRoleRow]) -> ExportResult<()>;
}

/// Postgres-backed snapshot source and row sink.
pub struct PgWarehouse {
    pool: PgPool,
    snapshot_table: String,
    destination_table: String,
}

impl PgWarehouse {
    pub fn new(pool: PgPool, snapshot_table: String, destination_table: String) -> Self {
        Self {
            pool,
            snapshot_table,
            destination_table,
        }
    }
}

fn snapshot_query(table: &str) -> String {
    format!(
        "SELECT tenant_id, ARRAY_AGG(user_id) AS user_ids \
         FROM {table} \
         WHERE date_inserted = (SELECT MAX(date_inserted) FROM {table}) \
         GROUP BY tenant_id"
    )
}

fn insert_query(table: &str) -> String {
    format!(
        "INSERT INTO {table} (tenant_id, user_id, display_name, roles, snapshot_date) \
         SELECT * FROM UNNEST($1::text[], $2::text[], $3::text[], $4::text[], $5::date[])"
    )
}

#[async_trait]
impl SnapshotSource for PgWarehouse {
    async fn load_latest(&self) -> ExportResult<Vec<TenantSnapshot>> {
        let rows = sqlx::query(&snapshot_query(&self.snapshot_table))
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| -> ExportResult<TenantSnapshot> {
                Ok(TenantSnapshot {
                    tenant_id: row.try_get("tenant_id")?,
                    user_ids: row.try_get("user_ids")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl RoleRowSink for PgWarehouse {
    async fn insert_rows(&self, tenant_id: &str, rows: &[UserRoleRow]) -> ExportResult<()> {
        let mut tenant_ids = Vec::with_capacity(rows.len());
        let mut user_ids = Vec::with_capacity(rows.len());
        let mut display_names = Vec::with_capacity(rows.len());
        let mut roles = Vec::with_capacity(rows.len());
        let mut snapshot_dates = Vec::with_capacity(rows.len());
        for row in rows {
            tenant_ids.push(row.tenant_id.clone());
            user_ids.push(row.user_id.clone());
            display_names.push(row.display_name.clone());
            roles.push(row.roles.clone());
            snapshot_dates.push(row.snapshot_date);
        }

        sqlx::query(&insert_query(&self.destination_table))
            .bind(&tenant_ids)
            .bind(&user_ids)
            .bind(&display_names)
            .bind(&roles)
            .bind(&snapshot_dates)
            .execute(&self.pool)
            .await?;

        debug!(%tenant_id, rows = rows.len(), "Inserted tenant batch");
        Ok(())
    }
}
