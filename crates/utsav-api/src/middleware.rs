use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};

use utsav_db::models::ProfileRow;
use utsav_types::api::Claims;

use crate::{ApiError, AppState, run_db};

/// Extract and validate JWT from Authorization header.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthenticated("Authorization header required.".into()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthenticated("Authorization header required.".into()))?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthenticated("Unauthorized".into()))?;

    req.extensions_mut().insert(token_data.claims);
    Ok(next.run(req).await)
}

/// Re-reads the caller's profile and requires the admin role.
/// A role cached on the client is never trusted.
pub(crate) async fn require_admin(state: &AppState, claims: &Claims) -> Result<ProfileRow, ApiError> {
    let user_id = claims.sub.to_string();
    let profile = run_db(state, move |db| db.get_profile(&user_id)).await?;

    match profile {
        Some(profile) if profile.role().is_admin() => Ok(profile),
        _ => Err(ApiError::forbidden("Admin access required.")),
    }
}
