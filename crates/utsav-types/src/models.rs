use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    /// Anything other than `"admin"` (including an empty or unknown value) is a plain user.
    pub fn parse(value: &str) -> Self {
        if value == "admin" { Self::Admin } else { Self::User }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub role: Role,
}

/// Festival event. Text fields come in English (`_en`) and Hindi (`_hi`) variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub title_en: String,
    pub title_hi: Option<String>,
    pub description_en: Option<String>,
    pub description_hi: Option<String>,
    pub rules_en: Option<String>,
    pub rules_hi: Option<String>,
    pub venue_en: Option<String>,
    pub venue_hi: Option<String>,
    pub event_date: NaiveDate,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub id: i64,
    pub event_id: i64,
    pub user_id: Uuid,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolunteerStatus {
    Pending,
    Approved,
    Rejected,
}

impl VolunteerStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Volunteer {
    pub id: i64,
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub reason_for_volunteering: String,
    pub status: VolunteerStatus,
    pub created_at: DateTime<Utc>,
}
