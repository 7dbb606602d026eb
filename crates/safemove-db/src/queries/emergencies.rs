use anyhow::Result;
use chrono::{DateTime, Utc};

use safemove_types::models::EmergencyEvent;

use crate::Database;

impl Database {
    /// Append an emergency record. `student_id` may be absent for anonymous alerts.
    pub fn insert_emergency(
        &self,
        student_id: Option<i64>,
        cause: &str,
        now: DateTime<Utc>,
    ) -> Result<EmergencyEvent> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO emergencies (student_id, cause, created_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![student_id, cause, now],
            )?;
            Ok(EmergencyEvent {
                id: conn.last_insert_rowid(),
                student_id,
                cause: cause.to_string(),
                created_at: now,
            })
        })
    }

    /// Emergency history, newest first.
    pub fn list_emergencies(&self) -> Result<Vec<EmergencyEvent>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, student_id, cause, created_at FROM emergencies
                 ORDER BY created_at DESC, id DESC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(EmergencyEvent {
                        id: row.get(0)?,
                        student_id: row.get(1)?,
                        cause: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}
