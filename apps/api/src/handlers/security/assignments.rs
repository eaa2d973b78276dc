use super::*;

pub async fn list_role_assignments_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthorizationContext>,
    Query(query): Query<RoleAssignmentQuery>,
) -> ApiResult<Json<Vec<RoleAssignmentResponse>>> {
    let user_id = query
        .user_id
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::parse::<UserId>)
        .transpose()?;

    let assignments = state
        .role_admin_service
        .list_role_assignments(&context, user_id)
        .await?
        .into_iter()
        .map(RoleAssignmentResponse::from)
        .collect();

    Ok(Json(assignments))
}

pub async fn assign_role_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthorizationContext>,
    Json(payload): Json<AssignRoleRequest>,
) -> ApiResult<(StatusCode, Json<RoleAssignmentResponse>)> {
    let user_id = payload.user_id.parse::<UserId>()?;
    let role_id = parse_role_id(&payload.role_id)?;
    let expires_at = parse_expiry(payload.expires_at.as_deref())?;

    let assignment = state
        .role_admin_service
        .assign_role(&context, user_id, role_id, expires_at)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RoleAssignmentResponse::from(assignment)),
    ))
}

pub async fn unassign_role_handler(
    State(state): State<AppState>,
    Extension(context): Extension<AuthorizationContext>,
    Path((user_id, role_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    state
        .role_admin_service
        .unassign_role(&context, user_id.parse::<UserId>()?, parse_role_id(&role_id)?)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
