use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &mut Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Trip DB: running migration v1 (initial schema)");
        let tx = conn.transaction()?;
        tx.execute_batch(
            "
            CREATE TABLE students (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                name        TEXT NOT NULL,
                phone       TEXT NOT NULL,
                image       TEXT,
                status      TEXT NOT NULL DEFAULT 'inside',
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_students_status ON students(status);

            CREATE TABLE trips (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                student_id      INTEGER NOT NULL REFERENCES students(id),
                duration_secs   INTEGER NOT NULL CHECK (duration_secs > 0),
                started_at      TEXT NOT NULL,
                ended_at        TEXT,
                status          TEXT NOT NULL DEFAULT 'on-trip'
            );

            -- At most one open trip per student.
            CREATE UNIQUE INDEX uq_trips_active_student
                ON trips(student_id) WHERE ended_at IS NULL;

            CREATE TABLE extension_requests (
                id                INTEGER PRIMARY KEY AUTOINCREMENT,
                student_id        INTEGER NOT NULL REFERENCES students(id),
                trip_id           INTEGER NOT NULL REFERENCES trips(id),
                extend_minutes    INTEGER NOT NULL CHECK (extend_minutes > 0),
                personal_message  TEXT,
                status            TEXT NOT NULL DEFAULT 'pending',
                created_at        TEXT NOT NULL,
                resolved_at       TEXT
            );

            CREATE INDEX idx_extension_requests_status
                ON extension_requests(status, created_at);

            CREATE TABLE emergencies (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                student_id  INTEGER REFERENCES students(id),
                cause       TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
        tx.commit()?;
    }

    info!("Database migrations complete");
    Ok(())
}
