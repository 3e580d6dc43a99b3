use crate::models::{
    EventDeletion, EventRegistrationRow, EventRow, Insert, ProfileRow, RegistrationRow, RegistrationSummaryRow,
    TicketRow, UserRow, VolunteerRow,
};
use crate::Database;
use anyhow::Result;
use rusqlite::{Connection, Row};
use tracing::info;
use utsav_types::api::{EventRequest, VolunteerApplication};
use utsav_types::models::{Role, VolunteerStatus};

const EVENT_COLUMNS: &str = "e.id, e.title_en, e.title_hi, e.description_en, e.description_hi, \
     e.rules_en, e.rules_hi, e.venue_en, e.venue_hi, e.event_date, e.start_time, e.end_time, \
     e.category, e.image_url";

impl Database {
    // -- Accounts --

    /// Creates the identity record and its profile in one transaction.
    pub fn create_account(
        &self,
        id: &str,
        email: &str,
        password_hash: &str,
        full_name: &str,
        role: Role,
    ) -> Result<Insert<()>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let inserted = tx.execute(
                "INSERT INTO users (id, email, password) VALUES (?1, ?2, ?3)",
                (id, email, password_hash),
            );
            match inserted {
                Ok(_) => {}
                Err(e) if is_unique_violation(&e) => return Ok(Insert::Duplicate),
                Err(e) => return Err(e.into()),
            }
            tx.execute(
                "INSERT INTO profiles (id, full_name, email, role) VALUES (?1, ?2, ?3, ?4)",
                (id, full_name, email, role.as_str()),
            )?;
            tx.commit()?;
            Ok(Insert::Created(()))
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, email, password, created_at FROM users WHERE email = ?1",
                [email],
                |row| {
                    Ok(UserRow {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        password: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                },
            )
            .optional()
        })
    }

    // -- Profiles --

    pub fn get_profile(&self, id: &str) -> Result<Option<ProfileRow>> {
        self.with_conn(|conn| query_profile(conn, id))
    }

    pub fn update_profile_name(&self, id: &str, full_name: &str) -> Result<usize> {
        self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE profiles SET full_name = ?2 WHERE id = ?1",
                (id, full_name),
            )?)
        })
    }

    /// Grants the admin role to every existing profile whose email is listed.
    pub fn promote_admins(&self, emails: &[String]) -> Result<usize> {
        if emails.is_empty() {
            return Ok(0);
        }

        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("UPDATE profiles SET role = 'admin' WHERE email = ?1 AND role <> 'admin'")?;
            let mut promoted = 0;
            for email in emails {
                promoted += stmt.execute([email])?;
            }
            if promoted > 0 {
                info!("Promoted {} profile(s) to admin", promoted);
            }
            Ok(promoted)
        })
    }

    // -- Events --

    pub fn list_events(&self) -> Result<Vec<EventRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {EVENT_COLUMNS} FROM events e ORDER BY e.event_date, e.id");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], |row| event_from_row(row, 0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_event(&self, id: i64) -> Result<Option<EventRow>> {
        self.with_conn(|conn| query_event(conn, id))
    }

    pub fn insert_event(&self, event: &EventRequest) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO events (title_en, title_hi, description_en, description_hi, rules_en, rules_hi,
                                     venue_en, venue_hi, event_date, start_time, end_time, category, image_url)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                rusqlite::params![
                    event.title_en,
                    event.title_hi,
                    event.description_en,
                    event.description_hi,
                    event.rules_en,
                    event.rules_hi,
                    event.venue_en,
                    event.venue_hi,
                    event.event_date.format("%Y-%m-%d").to_string(),
                    event.start_time,
                    event.end_time,
                    event.category,
                    event.image_url,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn update_event(&self, id: i64, event: &EventRequest) -> Result<usize> {
        self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE events SET title_en = ?2, title_hi = ?3, description_en = ?4, description_hi = ?5,
                                   rules_en = ?6, rules_hi = ?7, venue_en = ?8, venue_hi = ?9, event_date = ?10,
                                   start_time = ?11, end_time = ?12, category = ?13, image_url = ?14
                 WHERE id = ?1",
                rusqlite::params![
                    id,
                    event.title_en,
                    event.title_hi,
                    event.description_en,
                    event.description_hi,
                    event.rules_en,
                    event.rules_hi,
                    event.venue_en,
                    event.venue_hi,
                    event.event_date.format("%Y-%m-%d").to_string(),
                    event.start_time,
                    event.end_time,
                    event.category,
                    event.image_url,
                ],
            )?)
        })
    }

    /// Deletes an event and its registrations, unless any ticket for it has
    /// already been checked in. Attendance records are never cascaded away.
    pub fn delete_event(&self, id: i64) -> Result<EventDeletion> {
        self.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM events WHERE id = ?1 AND NOT EXISTS (
                     SELECT 1 FROM registrations WHERE event_id = ?1 AND checked_in_at IS NOT NULL
                 )",
                [id],
            )?;
            if deleted > 0 {
                return Ok(EventDeletion::Deleted);
            }

            let exists = conn
                .query_row("SELECT 1 FROM events WHERE id = ?1", [id], |_| Ok(()))
                .optional()?
                .is_some();
            Ok(if exists { EventDeletion::HasAttendance } else { EventDeletion::NotFound })
        })
    }

    // -- Registrations --

    /// Inserts a registration, relying on UNIQUE(event_id, user_id) to reject repeats.
    pub fn insert_registration(&self, event_id: i64, user_id: &str) -> Result<Insert<RegistrationRow>> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO registrations (event_id, user_id) VALUES (?1, ?2)",
                (event_id, user_id),
            );
            match inserted {
                Ok(_) => {}
                Err(e) if is_unique_violation(&e) => return Ok(Insert::Duplicate),
                Err(e) => return Err(e.into()),
            }
            let id = conn.last_insert_rowid();
            let row = query_registration(conn, id)?
                .ok_or_else(|| anyhow::anyhow!("Registration {} vanished after insert", id))?;
            Ok(Insert::Created(row))
        })
    }

    pub fn get_registration(&self, id: i64) -> Result<Option<RegistrationRow>> {
        self.with_conn(|conn| query_registration(conn, id))
    }

    /// Registration plus attendee name and full event, for rendering a ticket.
    pub fn get_ticket(&self, id: i64) -> Result<Option<TicketRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT r.id, r.event_id, r.user_id, r.checked_in_at, r.created_at, p.full_name, {EVENT_COLUMNS}
                 FROM registrations r
                 JOIN events e ON r.event_id = e.id
                 LEFT JOIN profiles p ON r.user_id = p.id
                 WHERE r.id = ?1"
            );
            conn.query_row(&sql, [id], |row| {
                Ok(TicketRow {
                    registration: RegistrationRow {
                        id: row.get(0)?,
                        event_id: row.get(1)?,
                        user_id: row.get(2)?,
                        checked_in_at: row.get(3)?,
                        created_at: row.get(4)?,
                    },
                    attendee_name: row.get(5)?,
                    event: event_from_row(row, 6)?,
                })
            })
            .optional()
        })
    }

    pub fn list_registrations_for_user(&self, user_id: &str) -> Result<Vec<RegistrationSummaryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT r.id, r.event_id, e.title_en, e.title_hi, e.event_date, e.start_time, r.checked_in_at
                 FROM registrations r
                 JOIN events e ON r.event_id = e.id
                 WHERE r.user_id = ?1
                 ORDER BY e.event_date, r.id",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(RegistrationSummaryRow {
                        id: row.get(0)?,
                        event_id: row.get(1)?,
                        title_en: row.get(2)?,
                        title_hi: row.get(3)?,
                        event_date: row.get(4)?,
                        start_time: row.get(5)?,
                        checked_in_at: row.get(6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_registrations_for_event(&self, event_id: i64) -> Result<Vec<EventRegistrationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT r.id, r.user_id, p.full_name, p.email, r.checked_in_at, r.created_at
                 FROM registrations r
                 LEFT JOIN profiles p ON r.user_id = p.id
                 WHERE r.event_id = ?1
                 ORDER BY r.created_at, r.id",
            )?;
            let rows = stmt
                .query_map([event_id], |row| {
                    Ok(EventRegistrationRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        full_name: row.get(2)?,
                        email: row.get(3)?,
                        checked_in_at: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Looks up a registration only if `user_id` owns it, returning it with its event date.
    pub fn get_owned_registration(&self, id: i64, user_id: &str) -> Result<Option<(RegistrationRow, String)>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT r.id, r.event_id, r.user_id, r.checked_in_at, r.created_at, e.event_date
                 FROM registrations r
                 JOIN events e ON r.event_id = e.id
                 WHERE r.id = ?1 AND r.user_id = ?2",
                (id, user_id),
                |row| {
                    Ok((
                        RegistrationRow {
                            id: row.get(0)?,
                            event_id: row.get(1)?,
                            user_id: row.get(2)?,
                            checked_in_at: row.get(3)?,
                            created_at: row.get(4)?,
                        },
                        row.get(5)?,
                    ))
                },
            )
            .optional()
        })
    }

    /// Deletes a registration owned by `user_id` that has not been checked in.
    /// Attendance stamps are permanent, so a checked-in row is never removed here.
    pub fn delete_owned_registration(&self, id: i64, user_id: &str) -> Result<usize> {
        self.with_conn(|conn| {
            Ok(conn.execute(
                "DELETE FROM registrations WHERE id = ?1 AND user_id = ?2 AND checked_in_at IS NULL",
                (id, user_id),
            )?)
        })
    }

    // -- Volunteers --

    pub fn insert_volunteer(&self, app: &VolunteerApplication) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO volunteers (full_name, email, phone_number, reason_for_volunteering, status)
                 VALUES (?1, ?2, ?3, ?4, 'pending')",
                (&app.full_name, &app.email, &app.phone_number, &app.reason),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn list_volunteers(&self) -> Result<Vec<VolunteerRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, full_name, email, phone_number, reason_for_volunteering, status, created_at
                 FROM volunteers
                 ORDER BY created_at DESC, id DESC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(VolunteerRow {
                        id: row.get(0)?,
                        full_name: row.get(1)?,
                        email: row.get(2)?,
                        phone_number: row.get(3)?,
                        reason_for_volunteering: row.get(4)?,
                        status: row.get(5)?,
                        created_at: row.get(6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn set_volunteer_status(&self, id: i64, status: VolunteerStatus) -> Result<usize> {
        self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE volunteers SET status = ?2 WHERE id = ?1",
                (id, status.as_str()),
            )?)
        })
    }
}

pub(crate) fn query_profile(conn: &Connection, id: &str) -> Result<Option<ProfileRow>> {
    conn.query_row(
        "SELECT id, full_name, email, phone_number, role FROM profiles WHERE id = ?1",
        [id],
        |row| {
            Ok(ProfileRow {
                id: row.get(0)?,
                full_name: row.get(1)?,
                email: row.get(2)?,
                phone_number: row.get(3)?,
                role: row.get(4)?,
            })
        },
    )
    .optional()
}

fn query_event(conn: &Connection, id: i64) -> Result<Option<EventRow>> {
    let sql = format!("SELECT {EVENT_COLUMNS} FROM events e WHERE e.id = ?1");
    conn.query_row(&sql, [id], |row| event_from_row(row, 0)).optional()
}

fn query_registration(conn: &Connection, id: i64) -> Result<Option<RegistrationRow>> {
    conn.query_row(
        "SELECT id, event_id, user_id, checked_in_at, created_at FROM registrations WHERE id = ?1",
        [id],
        |row| {
            Ok(RegistrationRow {
                id: row.get(0)?,
                event_id: row.get(1)?,
                user_id: row.get(2)?,
                checked_in_at: row.get(3)?,
                created_at: row.get(4)?,
            })
        },
    )
    .optional()
}

/// Reads the `EVENT_COLUMNS` projection starting at column `offset`.
fn event_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<EventRow> {
    Ok(EventRow {
        id: row.get(offset)?,
        title_en: row.get(offset + 1)?,
        title_hi: row.get(offset + 2)?,
        description_en: row.get(offset + 3)?,
        description_hi: row.get(offset + 4)?,
        rules_en: row.get(offset + 5)?,
        rules_hi: row.get(offset + 6)?,
        venue_en: row.get(offset + 7)?,
        venue_hi: row.get(offset + 8)?,
        event_date: row.get(offset + 9)?,
        start_time: row.get(offset + 10)?,
        end_time: row.get(offset + 11)?,
        category: row.get(offset + 12)?,
        image_url: row.get(offset + 13)?,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn event(title: &str, date: &str) -> EventRequest {
        EventRequest {
            title_en: title.into(),
            title_hi: None,
            description_en: None,
            description_hi: None,
            rules_en: None,
            rules_hi: None,
            venue_en: Some("Main Stage".into()),
            venue_hi: None,
            event_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            start_time: Some("18:00".into()),
            end_time: None,
            category: None,
            image_url: None,
        }
    }

    fn account(db: &Database, id: &str, email: &str) {
        match db.create_account(id, email, "hash", "Test Person", Role::User).unwrap() {
            Insert::Created(()) => {}
            Insert::Duplicate => panic!("unexpected duplicate"),
        }
    }

    #[test]
    fn duplicate_email_is_reported_not_raised() {
        let db = Database::open_in_memory().unwrap();
        account(&db, "u1", "a@example.com");
        let second = db
            .create_account("u2", "a@example.com", "hash", "Other", Role::User)
            .unwrap();
        assert!(matches!(second, Insert::Duplicate));
        assert!(db.get_profile("u2").unwrap().is_none());
    }

    #[test]
    fn one_registration_per_person_per_event() {
        let db = Database::open_in_memory().unwrap();
        account(&db, "u1", "a@example.com");
        let event_id = db.insert_event(&event("Nritya", "2030-01-10")).unwrap();

        let first = db.insert_registration(event_id, "u1").unwrap();
        let Insert::Created(row) = first else { panic!("expected insert") };
        assert_eq!(row.event_id, event_id);
        assert!(row.checked_in_at.is_none());

        assert!(matches!(db.insert_registration(event_id, "u1").unwrap(), Insert::Duplicate));
    }

    #[test]
    fn owned_delete_ignores_other_users() {
        let db = Database::open_in_memory().unwrap();
        account(&db, "u1", "a@example.com");
        account(&db, "u2", "b@example.com");
        let event_id = db.insert_event(&event("Natak", "2030-01-10")).unwrap();
        let Insert::Created(row) = db.insert_registration(event_id, "u1").unwrap() else {
            panic!("expected insert")
        };

        assert!(db.get_owned_registration(row.id, "u2").unwrap().is_none());
        assert_eq!(db.delete_owned_registration(row.id, "u2").unwrap(), 0);
        assert_eq!(db.delete_owned_registration(row.id, "u1").unwrap(), 1);
    }

    #[test]
    fn checked_in_registration_cannot_be_deleted() {
        use crate::Ledger;

        let db = Database::open_in_memory().unwrap();
        account(&db, "u1", "a@example.com");
        let event_id = db.insert_event(&event("Kala", "2030-01-10")).unwrap();
        let Insert::Created(row) = db.insert_registration(event_id, "u1").unwrap() else {
            panic!("expected insert")
        };

        assert_eq!(db.conditional_mark_checked_in(row.id, chrono::Utc::now()).unwrap(), 1);
        assert_eq!(db.delete_owned_registration(row.id, "u1").unwrap(), 0);
        assert!(db.get_registration(row.id).unwrap().is_some());
    }

    #[test]
    fn deleting_event_cascades_registrations() {
        let db = Database::open_in_memory().unwrap();
        account(&db, "u1", "a@example.com");
        let event_id = db.insert_event(&event("Sangeet", "2030-01-10")).unwrap();
        let Insert::Created(row) = db.insert_registration(event_id, "u1").unwrap() else {
            panic!("expected insert")
        };

        assert_eq!(db.delete_event(event_id).unwrap(), EventDeletion::Deleted);
        assert!(db.get_registration(row.id).unwrap().is_none());
        assert_eq!(db.delete_event(event_id).unwrap(), EventDeletion::NotFound);
    }

    #[test]
    fn event_with_attendance_is_kept() {
        use crate::Ledger;

        let db = Database::open_in_memory().unwrap();
        account(&db, "u1", "a@example.com");
        account(&db, "u2", "b@example.com");
        let event_id = db.insert_event(&event("Sangeet", "2030-01-10")).unwrap();
        let Insert::Created(scanned) = db.insert_registration(event_id, "u1").unwrap() else {
            panic!("expected insert")
        };
        let Insert::Created(unscanned) = db.insert_registration(event_id, "u2").unwrap() else {
            panic!("expected insert")
        };
        db.conditional_mark_checked_in(scanned.id, chrono::Utc::now()).unwrap();

        assert_eq!(db.delete_event(event_id).unwrap(), EventDeletion::HasAttendance);
        assert!(db.get_event(event_id).unwrap().is_some());
        assert!(db.get_registration(scanned.id).unwrap().unwrap().checked_in_at.is_some());
        assert!(db.get_registration(unscanned.id).unwrap().is_some());
    }

    #[test]
    fn promote_admins_only_touches_listed_emails() {
        let db = Database::open_in_memory().unwrap();
        account(&db, "u1", "boss@example.com");
        account(&db, "u2", "guest@example.com");

        let promoted = db.promote_admins(&["boss@example.com".to_string()]).unwrap();
        assert_eq!(promoted, 1);
        assert_eq!(db.get_profile("u1").unwrap().unwrap().role(), Role::Admin);
        assert_eq!(db.get_profile("u2").unwrap().unwrap().role(), Role::User);
    }

    #[test]
    fn volunteers_list_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let app = |name: &str| VolunteerApplication {
            full_name: name.into(),
            email: "v@example.com".into(),
            phone_number: "9876543210".into(),
            reason: "I love the festival".into(),
        };
        let first = db.insert_volunteer(&app("First")).unwrap();
        let second = db.insert_volunteer(&app("Second")).unwrap();

        let rows = db.list_volunteers().unwrap();
        assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![second, first]);

        assert_eq!(db.set_volunteer_status(first, VolunteerStatus::Approved).unwrap(), 1);
        assert_eq!(db.set_volunteer_status(999, VolunteerStatus::Approved).unwrap(), 0);
    }
}
