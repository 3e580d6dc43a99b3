use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);"
    )?;

    let version: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                email       TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE profiles (
                id              TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
                full_name       TEXT,
                email           TEXT,
                phone_number    TEXT,
                role            TEXT NOT NULL DEFAULT 'user',
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE events (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                title_en        TEXT NOT NULL,
                title_hi        TEXT,
                description_en  TEXT,
                description_hi  TEXT,
                rules_en        TEXT,
                rules_hi        TEXT,
                venue_en        TEXT,
                venue_hi        TEXT,
                event_date      TEXT NOT NULL,
                start_time      TEXT,
                end_time        TEXT,
                category        TEXT,
                image_url       TEXT,
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE registrations (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                event_id        INTEGER NOT NULL REFERENCES events(id) ON DELETE CASCADE,
                user_id         TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
                checked_in_at   TEXT,
                created_at      TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(event_id, user_id)
            );

            CREATE INDEX idx_registrations_user ON registrations(user_id);

            CREATE TABLE volunteers (
                id                      INTEGER PRIMARY KEY AUTOINCREMENT,
                full_name               TEXT NOT NULL,
                email                   TEXT NOT NULL,
                phone_number            TEXT NOT NULL,
                reason_for_volunteering TEXT NOT NULL,
                status                  TEXT NOT NULL DEFAULT 'pending',
                created_at              TEXT NOT NULL DEFAULT (datetime('now'))
            );

            INSERT INTO schema_version (version) VALUES (1);
            "
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
