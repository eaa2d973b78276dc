use super::*;

impl PostgresRoleRepository {
    pub(super) async fn assign_role_impl(
        &self,
        tenant_id: TenantId,
        assignment: NewRoleAssignment,
    ) -> AppResult<RoleAssignment> {
        let mut transaction = self.begin().await?;

        let role_exists = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id
            FROM roles
            WHERE id = $1 AND (tenant_id = $2 OR tenant_id IS NULL)
            FOR SHARE
            "#,
        )
        .bind(assignment.role_id)
        .bind(tenant_id.as_uuid())
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to resolve role: {error}")))?;

        if role_exists.is_none() {
            return Err(AppError::NotFound(format!(
                "role '{}' does not exist",
                assignment.role_id
            )));
        }

        let row = sqlx::query_as::<_, RoleAssignmentRow>(
            r#"
            WITH inserted AS (
                INSERT INTO role_assignments (tenant_id, user_id, role_id, assigned_by, expires_at)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING tenant_id, user_id, role_id, assigned_by, assigned_at, expires_at
            )
            SELECT
                inserted.tenant_id,
                inserted.user_id,
                inserted.role_id,
                roles.code AS role_code,
                roles.name AS role_name,
                inserted.assigned_by,
                inserted.assigned_at,
                inserted.expires_at
            FROM inserted
            INNER JOIN roles
                ON roles.id = inserted.role_id
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(assignment.user_id.as_uuid())
        .bind(assignment.role_id)
        .bind(assignment.assigned_by.as_uuid())
        .bind(assignment.expires_at)
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| match database_error_code(&error).as_deref() {
            Some("23505") => AppError::Conflict(format!(
                "user '{}' already holds role '{}'",
                assignment.user_id, assignment.role_id
            )),
            Some("23503") => {
                AppError::NotFound(format!("role '{}' does not exist", assignment.role_id))
            }
            _ => AppError::Internal(format!("failed to assign role: {error}")),
        })?;
        commit(transaction).await?;

        tracing::info!(
            tenant_id = %tenant_id,
            user_id = %assignment.user_id,
            role_id = %assignment.role_id,
            "assigned role"
        );
        Ok(RoleAssignment::from(row))
    }

    pub(super) async fn unassign_role_impl(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        role_id: Uuid,
    ) -> AppResult<()> {
        let rows_affected = sqlx::query(
            r#"
            DELETE FROM role_assignments
            WHERE tenant_id = $1
                AND user_id = $2
                AND role_id = $3
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(role_id)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to remove role assignment: {error}")))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "role assignment '{user_id}:{role_id}' was not found"
            )));
        }

        tracing::info!(
            tenant_id = %tenant_id,
            user_id = %user_id,
            role_id = %role_id,
            "removed role assignment"
        );
        Ok(())
    }

    pub(super) async fn list_role_assignments_impl(
        &self,
        tenant_id: TenantId,
        user_id: Option<UserId>,
    ) -> AppResult<Vec<RoleAssignment>> {
        let rows = sqlx::query_as::<_, RoleAssignmentRow>(
            r#"
            SELECT
                assignments.tenant_id,
                assignments.user_id,
                assignments.role_id,
                roles.code AS role_code,
                roles.name AS role_name,
                assignments.assigned_by,
                assignments.assigned_at,
                assignments.expires_at
            FROM role_assignments AS assignments
            INNER JOIN roles
                ON roles.id = assignments.role_id
            WHERE assignments.tenant_id = $1
                AND ($2::UUID IS NULL OR assignments.user_id = $2)
            ORDER BY assignments.user_id, roles.name
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(user_id.map(|user_id| user_id.as_uuid()))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list role assignments: {error}"))
        })?;

        Ok(rows.into_iter().map(RoleAssignment::from).collect())
    }
}
