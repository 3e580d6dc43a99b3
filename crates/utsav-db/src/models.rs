//! Database row types. These map directly to SQLite rows; conversion into the
//! utsav-types API models happens through the `into_*` methods below.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use utsav_types::api::{EventRegistration, RegistrationSummary};
use utsav_types::models::{Event, Profile, Registration, Role, Volunteer, VolunteerStatus};

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
}

pub struct ProfileRow {
    pub id: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub role: String,
}

pub struct EventRow {
    pub id: i64,
    pub title_en: String,
    pub title_hi: Option<String>,
    pub description_en: Option<String>,
    pub description_hi: Option<String>,
    pub rules_en: Option<String>,
    pub rules_hi: Option<String>,
    pub venue_en: Option<String>,
    pub venue_hi: Option<String>,
    pub event_date: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

pub struct RegistrationRow {
    pub id: i64,
    pub event_id: i64,
    pub user_id: String,
    pub checked_in_at: Option<String>,
    pub created_at: String,
}

/// A registration joined with the attendee's name and the event's title,
/// the exact shape the check-in flow reports back to the scanner.
#[derive(Debug, Clone)]
pub struct RegistrationDetail {
    pub id: i64,
    pub event_id: i64,
    pub user_id: String,
    pub checked_in_at: Option<String>,
    pub attendee_name: Option<String>,
    pub event_title: Option<String>,
}

pub struct TicketRow {
    pub registration: RegistrationRow,
    pub attendee_name: Option<String>,
    pub event: EventRow,
}

pub struct RegistrationSummaryRow {
    pub id: i64,
    pub event_id: i64,
    pub title_en: String,
    pub title_hi: Option<String>,
    pub event_date: String,
    pub start_time: Option<String>,
    pub checked_in_at: Option<String>,
}

pub struct EventRegistrationRow {
    pub id: i64,
    pub user_id: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub checked_in_at: Option<String>,
    pub created_at: String,
}

pub struct VolunteerRow {
    pub id: i64,
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub reason_for_volunteering: String,
    pub status: String,
    pub created_at: String,
}

/// Result of an insert guarded by a UNIQUE constraint.
#[derive(Debug)]
pub enum Insert<T> {
    Created(T),
    Duplicate,
}

/// Result of deleting an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDeletion {
    Deleted,
    NotFound,
    /// At least one ticket was checked in; the event and its registrations stay.
    HasAttendance,
}

/// Accepts both RFC 3339 (what this crate writes) and SQLite's
/// `datetime('now')` format "YYYY-MM-DD HH:MM:SS", which carries no zone and is UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc()))
        .ok()
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

fn timestamp_or_default(raw: &str, what: &str, row_id: &str) -> DateTime<Utc> {
    parse_timestamp(raw).unwrap_or_else(|| {
        warn!("Corrupt {} '{}' on row '{}'", what, raw, row_id);
        DateTime::default()
    })
}

fn optional_timestamp(raw: Option<&str>, what: &str, row_id: &str) -> Option<DateTime<Utc>> {
    raw.and_then(|value| {
        let parsed = parse_timestamp(value);
        if parsed.is_none() {
            warn!("Corrupt {} '{}' on row '{}'", what, value, row_id);
        }
        parsed
    })
}

fn uuid_or_default(raw: &str, what: &str, row_id: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}' on row '{}': {}", what, raw, row_id, e);
        Uuid::default()
    })
}

fn date_or_default(raw: &str, row_id: &str) -> NaiveDate {
    parse_date(raw).unwrap_or_else(|| {
        warn!("Corrupt event_date '{}' on row '{}'", raw, row_id);
        NaiveDate::default()
    })
}

impl ProfileRow {
    pub fn role(&self) -> Role {
        Role::parse(&self.role)
    }

    pub fn into_profile(self) -> Profile {
        let role = self.role();
        Profile {
            id: uuid_or_default(&self.id, "profile id", &self.id),
            full_name: self.full_name,
            email: self.email,
            phone_number: self.phone_number,
            role,
        }
    }
}

impl EventRow {
    pub fn into_event(self) -> Event {
        let event_date = date_or_default(&self.event_date, &self.id.to_string());
        Event {
            id: self.id,
            title_en: self.title_en,
            title_hi: self.title_hi,
            description_en: self.description_en,
            description_hi: self.description_hi,
            rules_en: self.rules_en,
            rules_hi: self.rules_hi,
            venue_en: self.venue_en,
            venue_hi: self.venue_hi,
            event_date,
            start_time: self.start_time,
            end_time: self.end_time,
            category: self.category,
            image_url: self.image_url,
        }
    }
}

impl RegistrationRow {
    pub fn into_registration(self) -> Registration {
        let row_id = self.id.to_string();
        Registration {
            id: self.id,
            event_id: self.event_id,
            user_id: uuid_or_default(&self.user_id, "user_id", &row_id),
            checked_in_at: optional_timestamp(self.checked_in_at.as_deref(), "checked_in_at", &row_id),
            created_at: timestamp_or_default(&self.created_at, "created_at", &row_id),
        }
    }
}

impl RegistrationDetail {
    pub fn checked_in_at(&self) -> Option<DateTime<Utc>> {
        optional_timestamp(self.checked_in_at.as_deref(), "checked_in_at", &self.id.to_string())
    }
}

impl RegistrationSummaryRow {
    pub fn into_summary(self) -> RegistrationSummary {
        let row_id = self.id.to_string();
        RegistrationSummary {
            id: self.id,
            event_id: self.event_id,
            title_en: self.title_en,
            title_hi: self.title_hi,
            event_date: date_or_default(&self.event_date, &row_id),
            start_time: self.start_time,
            checked_in_at: optional_timestamp(self.checked_in_at.as_deref(), "checked_in_at", &row_id),
        }
    }
}

impl EventRegistrationRow {
    pub fn into_event_registration(self) -> EventRegistration {
        let row_id = self.id.to_string();
        EventRegistration {
            id: self.id,
            user_id: uuid_or_default(&self.user_id, "user_id", &row_id),
            full_name: self.full_name,
            email: self.email,
            checked_in_at: optional_timestamp(self.checked_in_at.as_deref(), "checked_in_at", &row_id),
            created_at: timestamp_or_default(&self.created_at, "created_at", &row_id),
        }
    }
}

impl VolunteerRow {
    pub fn into_volunteer(self) -> Volunteer {
        let row_id = self.id.to_string();
        let status = VolunteerStatus::parse(&self.status).unwrap_or_else(|| {
            warn!("Unknown volunteer status '{}' on row '{}'", self.status, row_id);
            VolunteerStatus::Pending
        });
        Volunteer {
            id: self.id,
            full_name: self.full_name,
            email: self.email,
            phone_number: self.phone_number,
            reason_for_volunteering: self.reason_for_volunteering,
            status,
            created_at: timestamp_or_default(&self.created_at, "created_at", &row_id),
        }
    }
}
