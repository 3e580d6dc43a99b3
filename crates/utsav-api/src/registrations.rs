use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use utsav_db::models::{Insert, parse_date};
use utsav_types::api::{Claims, RegistrationSummary, RevokeRequest, StatusMessage, TicketResponse};

use crate::extract::ValidatedJson;
use crate::{ApiError, AppState, run_db};

pub async fn register_for_event(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub.to_string();

    let inserted = run_db(&state, move |db| {
        if db.get_event(event_id)?.is_none() {
            return Ok(None);
        }
        db.insert_registration(event_id, &user_id).map(Some)
    })
    .await?
    .ok_or_else(|| ApiError::not_found("Event not found."))?;

    match inserted {
        Insert::Created(row) => {
            info!(registration_id = row.id, event_id, user = %claims.sub, "Registered for event");
            Ok((StatusCode::CREATED, Json(row.into_registration())))
        }
        Insert::Duplicate => Err(ApiError::Conflict(
            "You are already registered for this event.".into(),
        )),
    }
}

/// The caller's registrations, for the dashboard.
pub async fn my_registrations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<RegistrationSummary>>, ApiError> {
    let user_id = claims.sub.to_string();
    let rows = run_db(&state, move |db| db.list_registrations_for_user(&user_id)).await?;
    Ok(Json(rows.into_iter().map(|row| row.into_summary()).collect()))
}

/// Ticket details for the owner or an admin. Anyone else gets the same 404 as
/// for a missing ticket.
pub async fn get_ticket(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<TicketResponse>, ApiError> {
    let not_found = || ApiError::not_found("Ticket not found.");
    let caller = claims.sub.to_string();

    let ticket = run_db(&state, move |db| {
        let Some(ticket) = db.get_ticket(id)? else {
            return Ok(None);
        };
        if ticket.registration.user_id == caller {
            return Ok(Some(ticket));
        }
        let is_admin = db
            .get_profile(&caller)?
            .is_some_and(|profile| profile.role().is_admin());
        Ok(is_admin.then_some(ticket))
    })
    .await?
    .ok_or_else(not_found)?;

    let registration = ticket.registration.into_registration();
    Ok(Json(TicketResponse {
        id: registration.id,
        checked_in_at: registration.checked_in_at,
        attendee_name: ticket.attendee_name,
        event: ticket.event.into_event(),
    }))
}

/// DELETE /api/registrations/revoke
///
/// Only the owner may revoke, only before the event date, and never after the
/// ticket has been checked in.
pub async fn revoke_registration(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidatedJson(req): ValidatedJson<RevokeRequest>,
) -> Result<Json<StatusMessage>, ApiError> {
    let id = req.registration_id;
    let user_id = claims.sub.to_string();
    let owned = {
        let user_id = user_id.clone();
        run_db(&state, move |db| db.get_owned_registration(id, &user_id)).await?
    };
    let Some((registration, event_date)) = owned else {
        return Err(ApiError::not_found(
            "Registration not found or you don't have permission to cancel it.",
        ));
    };

    if registration.checked_in_at.is_some() {
        return Err(ApiError::validation(
            "Cannot cancel a registration that has already been checked in.",
        ));
    }
    if !event_is_upcoming(&event_date, Utc::now()) {
        return Err(ApiError::validation(
            "Cannot cancel registration for events that have already occurred.",
        ));
    }

    if run_db(&state, move |db| db.delete_owned_registration(id, &user_id)).await? == 0 {
        // Checked in (or removed) between the read and the delete
        warn!(registration_id = id, "Revoke lost a race with another update");
        return Err(ApiError::Conflict(
            "Registration could not be cancelled. Please refresh and try again.".into(),
        ));
    }

    info!(registration_id = id, user = %claims.sub, "Registration revoked");
    Ok(Json(StatusMessage::ok("Registration cancelled successfully!")))
}

/// An event counts as upcoming until midnight UTC at the start of its date.
fn event_is_upcoming(event_date: &str, now: DateTime<Utc>) -> bool {
    match parse_date(event_date).and_then(|date| date.and_hms_opt(0, 0, 0)) {
        Some(midnight) => midnight.and_utc() > now,
        None => {
            warn!("Corrupt event_date '{}', refusing revoke", event_date);
            false
        }
    }
}
