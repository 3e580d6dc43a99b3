use axum::{Extension, Json, extract::State};

use utsav_types::api::{Claims, StatusMessage, UpdateProfileRequest};
use utsav_types::models::Profile;

use crate::extract::ValidatedJson;
use crate::{ApiError, AppState, run_db};

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Profile>, ApiError> {
    let user_id = claims.sub.to_string();
    let row = run_db(&state, move |db| db.get_profile(&user_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Profile not found."))?;
    Ok(Json(row.into_profile()))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> Result<Json<StatusMessage>, ApiError> {
    let full_name = req.full_name;

    let user_id = claims.sub.to_string();
    if run_db(&state, move |db| db.update_profile_name(&user_id, &full_name)).await? == 0 {
        return Err(ApiError::not_found("Profile not found."));
    }

    Ok(Json(StatusMessage::ok("Profile updated successfully!")))
}
