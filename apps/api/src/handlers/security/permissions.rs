use super::*;

pub async fn permission_catalog_handler(
    State(state): State<AppState>,
) -> Json<Vec<PermissionResponse>> {
    Json(
        state
            .role_admin_service
            .permission_catalog()
            .into_iter()
            .map(PermissionResponse::from)
            .collect(),
    )
}

pub async fn my_permissions_handler(
    Extension(identity): Extension<UserIdentity>,
    Extension(context): Extension<AuthorizationContext>,
) -> Json<EffectivePermissionsResponse> {
    Json(EffectivePermissionsResponse::from_context(
        &context,
        identity.display_name(),
    ))
}
