use super::*;

pub async fn list_roles_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthorizationContext>,
) -> ApiResult<Json<Vec<RoleResponse>>> {
    let roles = state
        .role_admin_service
        .list_roles(&context)
        .await?
        .into_iter()
        .map(RoleResponse::from)
        .collect();

    Ok(Json(roles))
}

pub async fn get_role_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthorizationContext>,
    Path(role_id): Path<String>,
) -> ApiResult<Json<RoleResponse>> {
    let role = state
        .role_admin_service
        .get_role(&context, parse_role_id(&role_id)?)
        .await?;

    Ok(Json(RoleResponse::from(role)))
}

pub async fn create_role_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthorizationContext>,
    Json(payload): Json<CreateRoleRequest>,
) -> ApiResult<(StatusCode, Json<RoleResponse>)> {
    let role = state
        .role_admin_service
        .create_role(
            &context,
            custodia_application::CreateRoleInput {
                name: payload.name,
                description: payload.description,
                permissions: payload.permissions,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(RoleResponse::from(role))))
}

pub async fn update_role_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthorizationContext>,
    Path(role_id): Path<String>,
    Json(payload): Json<UpdateRoleRequest>,
) -> ApiResult<Json<RoleResponse>> {
    let role = state
        .role_admin_service
        .update_role(
            &context,
            parse_role_id(&role_id)?,
            custodia_application::UpdateRoleInput {
                name: payload.name,
                description: payload.description,
                permissions: payload.permissions,
                expected_version: payload.expected_version,
            },
        )
        .await?;

    Ok(Json(RoleResponse::from(role)))
}

pub async fn delete_role_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthorizationContext>,
    Path(role_id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .role_admin_service
        .delete_role(&context, parse_role_id(&role_id)?)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
