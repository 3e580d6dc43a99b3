use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::NaiveTime;
use tracing::info;

use utsav_db::models::EventDeletion;
use utsav_types::api::{Claims, EventRegistration, EventRequest, StatusMessage};
use utsav_types::models::Event;

use crate::extract::ValidatedJson;
use crate::middleware::require_admin;
use crate::{ApiError, AppState, run_db};

pub async fn list_events(State(state): State<AppState>) -> Result<Json<Vec<Event>>, ApiError> {
    let rows = run_db(&state, |db| db.list_events()).await?;
    Ok(Json(rows.into_iter().map(|row| row.into_event()).collect()))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Event>, ApiError> {
    let row = run_db(&state, move |db| db.get_event(id))
        .await?
        .ok_or_else(|| ApiError::not_found("Event not found."))?;
    Ok(Json(row.into_event()))
}

pub async fn create_event(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidatedJson(req): ValidatedJson<EventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&state, &claims).await?;
    let req = validate_event(req)?;

    let row = run_db(&state, move |db| {
        let id = db.insert_event(&req)?;
        db.get_event(id)?
            .ok_or_else(|| anyhow::anyhow!("Event {} vanished after insert", id))
    })
    .await?;

    info!(event_id = row.id, admin = %claims.sub, "Event created");
    Ok((StatusCode::CREATED, Json(row.into_event())))
}

pub async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(claims): Extension<Claims>,
    ValidatedJson(req): ValidatedJson<EventRequest>,
) -> Result<Json<Event>, ApiError> {
    require_admin(&state, &claims).await?;
    let req = validate_event(req)?;

    let row = run_db(&state, move |db| {
        if db.update_event(id, &req)? == 0 {
            return Ok(None);
        }
        db.get_event(id)
    })
    .await?
    .ok_or_else(|| ApiError::not_found("Event not found."))?;

    info!(event_id = id, admin = %claims.sub, "Event updated");
    Ok(Json(row.into_event()))
}

pub async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<StatusMessage>, ApiError> {
    require_admin(&state, &claims).await?;

    match run_db(&state, move |db| db.delete_event(id)).await? {
        EventDeletion::Deleted => {}
        EventDeletion::NotFound => return Err(ApiError::not_found("Event not found.")),
        EventDeletion::HasAttendance => {
            return Err(ApiError::Conflict(
                "Cannot delete an event that already has checked-in attendees.".into(),
            ));
        }
    }

    info!(event_id = id, admin = %claims.sub, "Event deleted");
    Ok(Json(StatusMessage::ok("Event deleted.")))
}

/// Admin view of everyone registered for an event, with check-in status.
pub async fn list_event_registrations(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<EventRegistration>>, ApiError> {
    require_admin(&state, &claims).await?;

    let rows = run_db(&state, move |db| {
        if db.get_event(id)?.is_none() {
            return Ok(None);
        }
        db.list_registrations_for_event(id).map(Some)
    })
    .await?
    .ok_or_else(|| ApiError::not_found("Event not found."))?;

    Ok(Json(rows.into_iter().map(|row| row.into_event_registration()).collect()))
}

/// Times are optional but must be `HH:MM` when present.
fn validate_event(req: EventRequest) -> Result<EventRequest, ApiError> {
    for (label, time) in [("Start time", &req.start_time), ("End time", &req.end_time)] {
        if let Some(time) = time {
            if NaiveTime::parse_from_str(time, "%H:%M").is_err() {
                return Err(ApiError::validation(format!("{label} must be in HH:MM format.")));
            }
        }
    }

    Ok(req)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn request(title: &str, start: Option<&str>) -> EventRequest {
        EventRequest {
            title_en: title.into(),
            title_hi: None,
            description_en: None,
            description_hi: None,
            rules_en: None,
            rules_hi: None,
            venue_en: None,
            venue_hi: None,
            event_date: NaiveDate::from_ymd_opt(2030, 3, 1).unwrap(),
            start_time: start.map(str::to_string),
            end_time: None,
            category: None,
            image_url: None,
        }
    }

    #[test]
    fn title_is_required() {
        use validator::Validate;

        assert!(request("Nritya", None).validate().is_ok());
        let errors = request("", None).validate().unwrap_err();
        assert!(errors.field_errors().contains_key("title_en"));
    }

    #[test]
    fn times_must_be_clock_times() {
        assert!(validate_event(request("Nritya", Some("18:30"))).is_ok());
        assert!(validate_event(request("Nritya", Some("6pm"))).is_err());
        assert!(validate_event(request("Nritya", Some("25:00"))).is_err());
    }
}
