use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use utsav_types::api::{Claims, StatusMessage, VolunteerApplication, VolunteerDecisionRequest};
use utsav_types::models::{Volunteer, VolunteerStatus};

use crate::auth::normalize_email;
use crate::extract::ValidatedJson;
use crate::middleware::require_admin;
use crate::{ApiError, AppState, run_db};

/// POST /api/volunteer (public)
pub async fn apply(
    State(state): State<AppState>,
    ValidatedJson(mut app): ValidatedJson<VolunteerApplication>,
) -> Result<impl IntoResponse, ApiError> {
    app.email = normalize_email(&app.email);

    let id = run_db(&state, move |db| db.insert_volunteer(&app)).await?;
    info!(volunteer_id = id, "Volunteer application received");

    Ok((
        StatusCode::CREATED,
        Json(StatusMessage::ok(
            "Thank you! Your application has been submitted successfully.",
        )),
    ))
}

pub async fn list_volunteers(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Volunteer>>, ApiError> {
    require_admin(&state, &claims).await?;
    let rows = run_db(&state, |db| db.list_volunteers()).await?;
    Ok(Json(rows.into_iter().map(|row| row.into_volunteer()).collect()))
}

pub async fn approve(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidatedJson(req): ValidatedJson<VolunteerDecisionRequest>,
) -> Result<Json<StatusMessage>, ApiError> {
    decide(&state, &claims, req.volunteer_id, VolunteerStatus::Approved).await?;
    Ok(Json(StatusMessage::ok("Volunteer approved successfully.")))
}

pub async fn reject(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidatedJson(req): ValidatedJson<VolunteerDecisionRequest>,
) -> Result<Json<StatusMessage>, ApiError> {
    decide(&state, &claims, req.volunteer_id, VolunteerStatus::Rejected).await?;
    Ok(Json(StatusMessage::ok("Volunteer rejected successfully.")))
}

async fn decide(
    state: &AppState,
    claims: &Claims,
    volunteer_id: i64,
    status: VolunteerStatus,
) -> Result<(), ApiError> {
    require_admin(state, claims).await?;

    if run_db(state, move |db| db.set_volunteer_status(volunteer_id, status)).await? == 0 {
        return Err(ApiError::not_found("Volunteer not found."));
    }

    info!(volunteer_id, status = status.as_str(), admin = %claims.sub, "Volunteer application decided");
    Ok(())
}
