use chrono::{DateTime, NaiveDate, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::Event;

lazy_static! {
    /// Indian mobile number: ten digits, the first one 6-9.
    static ref PHONE_NUMBER: Regex = Regex::new(r"^[6-9]\d{9}$").unwrap();
}

/// Strips surrounding whitespace before validation sees the value.
fn trimmed<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(raw.trim().to_string())
}

// -- JWT Claims --

/// Session token claims. Issued by the auth endpoints and checked by the
/// API middleware; `sub` is the user id every profile lookup is keyed on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: usize,
}

// -- Generic --

/// Flat `{ success, message }` body used for every handled failure and for
/// mutations that return nothing else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusMessage {
    pub success: bool,
    pub message: String,
}

impl StatusMessage {
    pub fn ok(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into() }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into() }
    }
}

// -- Auth --

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SignupRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(email(message = "Invalid email address."))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters long."))]
    pub password: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 3, message = "Full name must be at least 3 characters long."))]
    pub full_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    #[serde(deserialize_with = "trimmed")]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub email: String,
    pub token: String,
}

// -- Check-in --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRequest {
    /// Raw scanned QR payload, validated server side.
    pub registration_id: String,
    /// Optional echo of the scanning admin's id. Must match the token subject when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendeeInfo {
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventInfo {
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub profiles: AttendeeInfo,
    pub events: EventInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant: Option<Participant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked_in_at: Option<DateTime<Utc>>,
}

impl CheckInResponse {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            participant: None,
            checked_in_at: None,
        }
    }
}

// -- Events --

/// Body of both create and update. `title_en` and `event_date` are required.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EventRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1, message = "English title is required."))]
    pub title_en: String,
    #[serde(default)]
    pub title_hi: Option<String>,
    #[serde(default)]
    pub description_en: Option<String>,
    #[serde(default)]
    pub description_hi: Option<String>,
    #[serde(default)]
    pub rules_en: Option<String>,
    #[serde(default)]
    pub rules_hi: Option<String>,
    #[serde(default)]
    pub venue_en: Option<String>,
    #[serde(default)]
    pub venue_hi: Option<String>,
    pub event_date: NaiveDate,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// One row of the admin registration list for an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRegistration {
    pub id: i64,
    pub user_id: Uuid,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// -- Registrations --

/// Dashboard entry: one of the caller's registrations with its event summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationSummary {
    pub id: i64,
    pub event_id: i64,
    pub title_en: String,
    pub title_hi: Option<String>,
    pub event_date: NaiveDate,
    pub start_time: Option<String>,
    pub checked_in_at: Option<DateTime<Utc>>,
}

/// Everything needed to render a ticket. The QR image itself is derived from
/// `id` on the viewing device and is never sent by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketResponse {
    pub id: i64,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub attendee_name: Option<String>,
    pub event: Event,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RevokeRequest {
    #[validate(range(min = 1, message = "Registration ID must be a positive integer"))]
    pub registration_id: i64,
}

// -- Profile --

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 3, message = "Full name must be at least 3 characters long."))]
    pub full_name: String,
}

// -- Volunteers --

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VolunteerApplication {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 3, message = "Name must be at least 3 characters long."))]
    pub full_name: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(email(message = "Invalid email address."))]
    pub email: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(regex(
        path = *PHONE_NUMBER,
        message = "Phone number must be 10 digits starting with 6, 7, 8, or 9."
    ))]
    pub phone_number: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 10, message = "Reason must be at least 10 characters long."))]
    pub reason: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VolunteerDecisionRequest {
    #[validate(range(min = 1, message = "Invalid volunteer ID"))]
    pub volunteer_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_in_request_uses_camel_case_and_optional_admin() {
        let req: CheckInRequest =
            serde_json::from_str(r#"{"registrationId":"42","adminUserId":"A1"}"#).unwrap();
        assert_eq!(req.registration_id, "42");
        assert_eq!(req.admin_user_id.as_deref(), Some("A1"));

        let req: CheckInRequest = serde_json::from_str(r#"{"registrationId":"7"}"#).unwrap();
        assert!(req.admin_user_id.is_none());
    }

    #[test]
    fn failed_check_in_omits_participant() {
        let body = serde_json::to_value(CheckInResponse::failed("Ticket Not Found.")).unwrap();
        assert_eq!(body, serde_json::json!({ "success": false, "message": "Ticket Not Found." }));
    }

    fn application(phone: &str, email: &str) -> VolunteerApplication {
        serde_json::from_value(serde_json::json!({
            "fullName": "  Ravi Kumar ",
            "email": email,
            "phoneNumber": phone,
            "reason": "I want to help with stage management.",
        }))
        .unwrap()
    }

    #[test]
    fn volunteer_fields_are_trimmed_then_validated() {
        let app = application(" 9876543210 ", "ravi@example.com");
        assert_eq!(app.full_name, "Ravi Kumar");
        assert_eq!(app.phone_number, "9876543210");
        assert!(app.validate().is_ok());
    }

    #[test]
    fn volunteer_phone_must_be_indian_mobile() {
        for phone in ["98765", "5876543210", "98765432101", "98765abcde"] {
            assert!(application(phone, "ravi@example.com").validate().is_err(), "accepted {phone}");
        }
    }

    #[test]
    fn malformed_emails_are_rejected() {
        for email in ["ravi", "@example.com", "ravi@b..c", "ra vi@example.com"] {
            let errors = application("9876543210", email).validate().unwrap_err();
            assert!(errors.field_errors().contains_key("email"), "accepted {email}");
        }
    }

    #[test]
    fn blank_names_fail_after_trimming() {
        let req: UpdateProfileRequest = serde_json::from_str(r#"{"fullName":"     "}"#).unwrap();
        assert!(req.validate().is_err());

        let req: SignupRequest =
            serde_json::from_str(r#"{"email":" asha@example.com ","password":"correct-horse","fullName":"Asha"}"#)
                .unwrap();
        assert_eq!(req.email, "asha@example.com");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn ids_must_be_positive() {
        assert!(RevokeRequest { registration_id: 0 }.validate().is_err());
        assert!(VolunteerDecisionRequest { volunteer_id: -4 }.validate().is_err());
        assert!(VolunteerDecisionRequest { volunteer_id: 4 }.validate().is_ok());
    }

    #[test]
    fn participant_keeps_joined_shape() {
        let p = Participant {
            profiles: AttendeeInfo { full_name: Some("Asha".into()) },
            events: EventInfo { title: Some("Kavi Sammelan".into()) },
        };
        let body = serde_json::to_value(&p).unwrap();
        assert_eq!(body["profiles"]["full_name"], "Asha");
        assert_eq!(body["events"]["title"], "Kavi Sammelan");
    }
}
