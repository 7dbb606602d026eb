use anyhow::Result;

use safemove_types::models::{DashboardStats, StudentStatus};

use crate::Database;

impl Database {
    /// Live counts for the admin dashboard.
    pub fn dashboard_stats(&self) -> Result<DashboardStats> {
        self.with_conn(|conn| {
            let stats = conn.query_row(
                "SELECT
                    (SELECT COUNT(*) FROM students WHERE status = ?1),
                    (SELECT COUNT(*) FROM students WHERE status != ?1),
                    (SELECT COUNT(*) FROM trips),
                    (SELECT COUNT(*) FROM emergencies)",
                [StudentStatus::Inside.as_str()],
                |row| {
                    Ok(DashboardStats {
                        students_in: row.get(0)?,
                        students_out: row.get(1)?,
                        total_trips: row.get(2)?,
                        emergency_count: row.get(3)?,
                    })
                },
            )?;
            Ok(stats)
        })
    }
}
