use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};

use crate::Database;
use crate::models::{ProfileRow, RegistrationDetail};
use crate::queries::{OptionalExt, query_profile};

/// The slice of the registration store the check-in flow is allowed to touch.
///
/// `conditional_mark_checked_in` must be a single conditional write that only
/// succeeds while `checked_in_at` is still null, and must report how many rows
/// it changed. Callers decide the winner of concurrent scans from that count,
/// so no implementation may emulate it with a read followed by a write.
pub trait Ledger: Send + Sync {
    fn find_profile(&self, user_id: &str) -> Result<Option<ProfileRow>>;

    fn find_registration(&self, id: i64) -> Result<Option<RegistrationDetail>>;

    fn conditional_mark_checked_in(&self, id: i64, at: DateTime<Utc>) -> Result<usize>;
}

impl Ledger for Database {
    fn find_profile(&self, user_id: &str) -> Result<Option<ProfileRow>> {
        self.with_conn(|conn| query_profile(conn, user_id))
    }

    fn find_registration(&self, id: i64) -> Result<Option<RegistrationDetail>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT r.id, r.event_id, r.user_id, r.checked_in_at, p.full_name, e.title_en
                 FROM registrations r
                 LEFT JOIN profiles p ON r.user_id = p.id
                 LEFT JOIN events e ON r.event_id = e.id
                 WHERE r.id = ?1",
                [id],
                |row| {
                    Ok(RegistrationDetail {
                        id: row.get(0)?,
                        event_id: row.get(1)?,
                        user_id: row.get(2)?,
                        checked_in_at: row.get(3)?,
                        attendee_name: row.get(4)?,
                        event_title: row.get(5)?,
                    })
                },
            )
            .optional()
        })
    }

    fn conditional_mark_checked_in(&self, id: i64, at: DateTime<Utc>) -> Result<usize> {
        let stamp = at.to_rfc3339_opts(SecondsFormat::Millis, true);
        self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE registrations SET checked_in_at = ?2 WHERE id = ?1 AND checked_in_at IS NULL",
                (id, &stamp),
            )?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Insert;
    use chrono::{NaiveDate, TimeZone};
    use utsav_types::api::EventRequest;
    use utsav_types::models::Role;

    fn seeded() -> (Database, i64) {
        let db = Database::open_in_memory().unwrap();
        db.create_account("u1", "asha@example.com", "hash", "Asha Verma", Role::User).unwrap();
        let event_id = db
            .insert_event(&EventRequest {
                title_en: "Kavi Sammelan".into(),
                title_hi: Some("कवि सम्मेलन".into()),
                description_en: None,
                description_hi: None,
                rules_en: None,
                rules_hi: None,
                venue_en: None,
                venue_hi: None,
                event_date: NaiveDate::from_ymd_opt(2030, 3, 1).unwrap(),
                start_time: None,
                end_time: None,
                category: None,
                image_url: None,
            })
            .unwrap();
        let Insert::Created(reg) = db.insert_registration(event_id, "u1").unwrap() else {
            panic!("expected insert")
        };
        (db, reg.id)
    }

    #[test]
    fn registration_detail_joins_name_and_title() {
        let (db, id) = seeded();
        let detail = db.find_registration(id).unwrap().unwrap();
        assert_eq!(detail.attendee_name.as_deref(), Some("Asha Verma"));
        assert_eq!(detail.event_title.as_deref(), Some("Kavi Sammelan"));
        assert!(detail.checked_in_at().is_none());
        assert!(db.find_registration(id + 1000).unwrap().is_none());
    }

    #[test]
    fn conditional_write_succeeds_exactly_once() {
        let (db, id) = seeded();
        let first = Utc.with_ymd_and_hms(2030, 3, 1, 10, 42, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2030, 3, 1, 11, 0, 0).unwrap();

        assert_eq!(db.conditional_mark_checked_in(id, first).unwrap(), 1);
        assert_eq!(db.conditional_mark_checked_in(id, later).unwrap(), 0);

        let detail = db.find_registration(id).unwrap().unwrap();
        assert_eq!(detail.checked_in_at(), Some(first));
    }

    #[test]
    fn conditional_write_on_missing_row_changes_nothing() {
        let (db, id) = seeded();
        assert_eq!(db.conditional_mark_checked_in(id + 1, Utc::now()).unwrap(), 0);
    }
}
