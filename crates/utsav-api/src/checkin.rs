//! Ticket check-in: the only code path allowed to stamp `checked_in_at`.
//!
//! Every call re-verifies the acting user's role against the profile store,
//! parses the scanned payload, and flips the registration with a single
//! conditional write. Concurrent scans of the same ticket are settled by the
//! store's affected-row count: exactly one caller sees `Success`, every other
//! caller sees `AlreadyCheckedIn` carrying the winner's timestamp.

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, FixedOffset, SubsecRound, Utc};
use thiserror::Error;
use tracing::{error, info, warn};

use utsav_db::Ledger;
use utsav_db::models::RegistrationDetail;
use utsav_types::api::{AttendeeInfo, CheckInRequest, CheckInResponse, Claims, EventInfo, Participant};

use crate::AppState;

const SUCCESS_MESSAGE: &str = "Check-in Successful!";
const TICKET_NOT_FOUND_MESSAGE: &str = "Ticket Not Found.";
const UNEXPECTED_MESSAGE: &str = "An unexpected error occurred.";

#[derive(Debug, Error)]
pub enum CheckInError {
    #[error("acting user has no profile")]
    ActorNotFound,

    #[error("acting user is not an admin")]
    Unauthorized,

    #[error("payload is not a registration id")]
    InvalidPayload,

    #[error("no registration with this id")]
    TicketNotFound,

    #[error("ledger unavailable: {0:#}")]
    Infrastructure(#[from] anyhow::Error),
}

impl CheckInError {
    /// Operator-facing text. Malformed payloads and unknown ids share one
    /// message so the endpoint cannot be used to probe which ids exist.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::ActorNotFound => "User not found.",
            Self::Unauthorized => "Unauthorized.",
            Self::InvalidPayload | Self::TicketNotFound => TICKET_NOT_FOUND_MESSAGE,
            Self::Infrastructure(_) => UNEXPECTED_MESSAGE,
        }
    }
}

/// Who was checked in, and when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckInRecord {
    pub registration_id: i64,
    pub attendee_name: Option<String>,
    pub event_title: Option<String>,
    pub checked_in_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckInOutcome {
    /// This call performed the transition.
    Success(CheckInRecord),
    /// The ticket had been used before; carries the original timestamp.
    AlreadyCheckedIn(CheckInRecord),
}

impl CheckInOutcome {
    pub fn record(&self) -> &CheckInRecord {
        match self {
            Self::Success(record) | Self::AlreadyCheckedIn(record) => record,
        }
    }

    pub fn to_response(&self, display_offset: FixedOffset) -> CheckInResponse {
        let record = self.record();
        let (success, message) = match self {
            Self::Success(_) => (true, SUCCESS_MESSAGE.to_string()),
            Self::AlreadyCheckedIn(record) => (
                false,
                format!(
                    "Already Checked In at {}",
                    record.checked_in_at.with_timezone(&display_offset).format("%-I:%M %p")
                ),
            ),
        };

        CheckInResponse {
            success,
            message,
            participant: Some(Participant {
                profiles: AttendeeInfo { full_name: record.attendee_name.clone() },
                events: EventInfo { title: record.event_title.clone() },
            }),
            checked_in_at: Some(record.checked_in_at),
        }
    }
}

/// Parses a scanned QR payload into a registration id.
///
/// Accepts an optionally whitespace-padded run of ASCII digits that fits an
/// `i64` and is greater than zero. Signs, decimals, and trailing garbage are
/// rejected outright.
pub fn parse_registration_id(payload: &str) -> Result<i64, CheckInError> {
    let digits = payload.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CheckInError::InvalidPayload);
    }
    match digits.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(CheckInError::InvalidPayload),
    }
}

/// Checks a ticket in on behalf of `acting_user_id`, stamping `now` on success.
///
/// The stamp is truncated to milliseconds, the precision the ledger stores, so
/// the winner and every later scan report the same instant.
pub fn check_in_at<L: Ledger + ?Sized>(
    ledger: &L,
    payload: &str,
    acting_user_id: &str,
    now: DateTime<Utc>,
) -> Result<CheckInOutcome, CheckInError> {
    let now = now.trunc_subsecs(3);
    let actor = ledger
        .find_profile(acting_user_id)?
        .ok_or(CheckInError::ActorNotFound)?;
    if !actor.role().is_admin() {
        return Err(CheckInError::Unauthorized);
    }

    let registration_id = parse_registration_id(payload)?;

    let registration = ledger
        .find_registration(registration_id)?
        .ok_or(CheckInError::TicketNotFound)?;

    if let Some(at) = registration.checked_in_at() {
        return Ok(CheckInOutcome::AlreadyCheckedIn(record(registration, at)));
    }

    if ledger.conditional_mark_checked_in(registration_id, now)? == 1 {
        return Ok(CheckInOutcome::Success(record(registration, now)));
    }

    // Lost a race with a concurrent scan. Report the winner's stamp.
    let winner = ledger
        .find_registration(registration_id)?
        .ok_or(CheckInError::TicketNotFound)?;
    match winner.checked_in_at() {
        Some(at) => Ok(CheckInOutcome::AlreadyCheckedIn(record(winner, at))),
        None => Err(CheckInError::Infrastructure(anyhow::anyhow!(
            "conditional write on registration {} changed nothing but the row is still unchecked",
            registration_id
        ))),
    }
}

pub fn check_in_now<L: Ledger + ?Sized>(
    ledger: &L,
    payload: &str,
    acting_user_id: &str,
) -> Result<CheckInOutcome, CheckInError> {
    check_in_at(ledger, payload, acting_user_id, Utc::now())
}

fn record(detail: RegistrationDetail, at: DateTime<Utc>) -> CheckInRecord {
    CheckInRecord {
        registration_id: detail.id,
        attendee_name: detail.attendee_name,
        event_title: detail.event_title,
        checked_in_at: at,
    }
}

/// POST /api/checkin
///
/// Every handled outcome answers 200 with `success` set accordingly; only
/// store or runtime faults answer 500. A body that is not a check-in request
/// is reported like any other unreadable ticket.
pub async fn check_in(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<CheckInRequest>, JsonRejection>,
) -> Response {
    let actor = claims.sub.to_string();

    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            warn!(%actor, reason = %rejection.body_text(), "Check-in body rejected");
            return Json(CheckInResponse::failed(CheckInError::InvalidPayload.public_message())).into_response();
        }
    };

    if let Some(claimed) = req.admin_user_id.as_deref() {
        if claimed != actor {
            warn!(%actor, claimed, "Check-in actor does not match session");
            return Json(CheckInResponse::failed(CheckInError::Unauthorized.public_message())).into_response();
        }
    }

    let db_state = state.clone();
    let payload = req.registration_id;
    let result = tokio::task::spawn_blocking(move || {
        check_in_now(&db_state.db, &payload, &actor)
    })
    .await;

    match result {
        Ok(Ok(outcome)) => {
            let record = outcome.record();
            match &outcome {
                CheckInOutcome::Success(_) => {
                    info!(registration_id = record.registration_id, admin = %claims.sub, "Ticket checked in")
                }
                CheckInOutcome::AlreadyCheckedIn(_) => {
                    info!(registration_id = record.registration_id, admin = %claims.sub, "Ticket already used")
                }
            }
            Json(outcome.to_response(state.display_offset)).into_response()
        }
        Ok(Err(CheckInError::Infrastructure(e))) => {
            error!(error = ?e, "Check-in failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(CheckInResponse::failed(UNEXPECTED_MESSAGE))).into_response()
        }
        Ok(Err(e)) => {
            warn!(admin = %claims.sub, reason = %e, "Check-in rejected");
            Json(CheckInResponse::failed(e.public_message())).into_response()
        }
        Err(e) => {
            error!("spawn_blocking join error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(CheckInResponse::failed(UNEXPECTED_MESSAGE))).into_response()
        }
    }
}
