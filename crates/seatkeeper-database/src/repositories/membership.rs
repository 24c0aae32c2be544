//! Workspace membership repository.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use seatkeeper_core::error::{AppError, ErrorKind};
use seatkeeper_core::result::AppResult;
use seatkeeper_entity::license::{PlanStatus, SeatStatus};
use seatkeeper_entity::workspace::{MemberFilter, Membership, WorkspaceRole};

use super::map_write_error;
use crate::store::MembershipStore;

/// PostgreSQL-backed membership rows.
#[derive(Debug, Clone)]
pub struct MembershipRepository {
    pool: PgPool,
}

impl MembershipRepository {
    /// Create a new membership repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Append the `WHERE` clause selecting `filter` within one workspace.
fn push_filter(query: &mut QueryBuilder<'_, Postgres>, workspace_id: Uuid, filter: MemberFilter) {
    query.push(" WHERE m.workspace_id = ").push_bind(workspace_id);
    match filter {
        MemberFilter::All => {}
        MemberFilter::Role(role) => {
            query.push(" AND m.role = ").push_bind(role);
        }
        MemberFilter::MemberType(kind) => {
            query.push(" AND m.member_type = ").push_bind(kind);
        }
        MemberFilter::Product(product) => {
            query
                .push(
                    " AND EXISTS (SELECT 1 FROM license_seats s \
                     JOIN license_products p ON p.id = s.product_id \
                     JOIN license_plans pl ON pl.id = p.plan_id \
                     WHERE pl.workspace_id = m.workspace_id AND s.user_id = m.user_id \
                     AND pl.status = ",
                )
                .push_bind(PlanStatus::Active)
                .push(" AND s.status = ")
                .push_bind(SeatStatus::Use)
                .push(" AND p.product = ")
                .push_bind(product)
                .push(")");
        }
    }
}

#[async_trait]
impl MembershipStore for MembershipRepository {
    async fn find_member(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<Membership>> {
        sqlx::query_as::<_, Membership>(
            "SELECT * FROM workspace_members WHERE workspace_id = $1 AND user_id = $2",
        )
        .bind(workspace_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find member", e))
    }

    async fn list_members(
        &self,
        workspace_id: Uuid,
        filter: MemberFilter,
    ) -> AppResult<Vec<Membership>> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT m.* FROM workspace_members m");
        push_filter(&mut query, workspace_id, filter);
        query.push(" ORDER BY m.joined_at, m.user_id");

        query
            .build_query_as::<Membership>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list members", e))
    }

    async fn count_members(&self, workspace_id: Uuid, filter: MemberFilter) -> AppResult<i64> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM workspace_members m");
        push_filter(&mut query, workspace_id, filter);

        query
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count members", e))
    }

    async fn create_member(&self, member: &Membership) -> AppResult<Membership> {
        sqlx::query_as::<_, Membership>(
            "INSERT INTO workspace_members (workspace_id, user_id, role, member_type, joined_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(member.workspace_id)
        .bind(member.user_id)
        .bind(member.role)
        .bind(member.member_type)
        .bind(member.joined_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error("Failed to create membership", e))
    }

    async fn update_role(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
        role: WorkspaceRole,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE workspace_members SET role = $3 WHERE workspace_id = $1 AND user_id = $2",
        )
        .bind(workspace_id)
        .bind(user_id)
        .bind(role)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update role", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_member(&self, workspace_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let result =
            sqlx::query("DELETE FROM workspace_members WHERE workspace_id = $1 AND user_id = $2")
                .bind(workspace_id)
                .bind(user_id)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to delete member", e)
                })?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_workspace_members(&self, workspace_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM workspace_members WHERE workspace_id = $1")
            .bind(workspace_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete workspace members", e)
            })?;
        Ok(result.rows_affected())
    }

    async fn owned_workspaces(&self, user_id: Uuid) -> AppResult<Vec<Uuid>> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT workspace_id FROM workspace_members WHERE user_id = $1 AND role = $2 \
             ORDER BY joined_at",
        )
        .bind(user_id)
        .bind(WorkspaceRole::Owner)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list owned workspaces", e)
        })
    }
}
