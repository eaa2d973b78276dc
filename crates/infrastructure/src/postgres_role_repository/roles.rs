use super::*;

impl PostgresRoleRepository {
    pub(super) async fn create_role_impl(&self, role: NewRole) -> AppResult<RoleDefinition> {
        let mut transaction = self.begin().await?;

        let role_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO roles (tenant_id, code, name, description, is_system)
            VALUES ($1, $2, $3, $4, FALSE)
            RETURNING id
            "#,
        )
        .bind(role.tenant_id.as_uuid())
        .bind(role.code.as_str())
        .bind(role.name.as_str())
        .bind(role.description.as_deref())
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| map_role_conflict(error, role.name.as_str()))?;

        insert_grants(&mut transaction, role_id, &role.grants).await?;

        let created = fetch_roles(&mut *transaction, role.tenant_id, Some(role_id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Internal(format!("created role '{role_id}' vanished")))?;
        commit(transaction).await?;

        tracing::info!(
            tenant_id = %role.tenant_id,
            role_id = %role_id,
            role_code = %role.code,
            "created custom role"
        );
        Ok(created)
    }

    pub(super) async fn update_role_impl(
        &self,
        tenant_id: TenantId,
        role_id: Uuid,
        patch: RolePatch,
    ) -> AppResult<RoleDefinition> {
        let mut transaction = self.begin().await?;

        let updated = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE roles
            SET code = $3,
                name = $4,
                description = $5,
                version = version + 1,
                updated_at = now()
            WHERE id = $1
                AND tenant_id = $2
                AND is_system = FALSE
                AND version = $6
            RETURNING id
            "#,
        )
        .bind(role_id)
        .bind(tenant_id.as_uuid())
        .bind(patch.code.as_str())
        .bind(patch.name.as_str())
        .bind(patch.description.as_deref())
        .bind(patch.expected_version)
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| map_role_conflict(error, patch.name.as_str()))?;

        if updated.is_none() {
            let stored_version = sqlx::query_scalar::<_, i64>(
                r#"
                SELECT version
                FROM roles
                WHERE id = $1 AND tenant_id = $2
                "#,
            )
            .bind(role_id)
            .bind(tenant_id.as_uuid())
            .fetch_optional(&mut *transaction)
            .await
            .map_err(|error| AppError::Internal(format!("failed to load role version: {error}")))?;

            return Err(match stored_version {
                Some(version) => AppError::Conflict(format!(
                    "role '{role_id}' was modified concurrently (version {version}, expected {})",
                    patch.expected_version
                )),
                None => AppError::NotFound(format!("role '{role_id}' does not exist")),
            });
        }

        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
            .bind(role_id)
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to replace role grants: {error}"))
            })?;
        insert_grants(&mut transaction, role_id, &patch.grants).await?;

        let role = fetch_roles(&mut *transaction, tenant_id, Some(role_id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Internal(format!("updated role '{role_id}' vanished")))?;
        commit(transaction).await?;

        tracing::info!(
            tenant_id = %tenant_id,
            role_id = %role_id,
            version = role.version,
            "updated custom role"
        );
        Ok(role)
    }

    pub(super) async fn delete_role_impl(&self, tenant_id: TenantId, role_id: Uuid) -> AppResult<()> {
        let mut transaction = self.begin().await?;

        let is_system = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT is_system
            FROM roles
            WHERE id = $1 AND (tenant_id = $2 OR tenant_id IS NULL)
            FOR UPDATE
            "#,
        )
        .bind(role_id)
        .bind(tenant_id.as_uuid())
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to lock role: {error}")))?
        .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' does not exist")))?;

        if is_system {
            return Err(AppError::InvariantViolation(format!(
                "system role '{role_id}' cannot be deleted"
            )));
        }

        let assignment_count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM role_assignments
            WHERE role_id = $1
            "#,
        )
        .bind(role_id)
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to count role assignments: {error}")))?;

        if assignment_count > 0 {
            return Err(AppError::InvariantViolation(format!(
                "role '{role_id}' still has {assignment_count} assignment(s)"
            )));
        }

        sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(role_id)
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                if database_error_code(&error).as_deref() == Some("23503") {
                    return AppError::InvariantViolation(format!(
                        "role '{role_id}' was assigned while being deleted"
                    ));
                }
                AppError::Internal(format!("failed to delete role: {error}"))
            })?;
        commit(transaction).await?;

        tracing::info!(tenant_id = %tenant_id, role_id = %role_id, "deleted custom role");
        Ok(())
    }
}
