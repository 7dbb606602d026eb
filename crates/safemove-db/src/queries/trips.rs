use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, TransactionBehavior};

use safemove_types::models::{StudentStatus, Trip, TripStatus};

use super::students::student_exists;
use super::{OptionalExt, is_unique_violation, status_column};
use crate::Database;
use crate::models::{OverdueOutcome, StartTripsOutcome};

const TRIP_COLUMNS: &str = "id, student_id, duration_secs, started_at, ended_at, status";

impl Database {
    // -- Writes --

    /// Open one trip per student, all or nothing. The caller is expected to
    /// pass distinct ids; a repeated id reports `AlreadyActive`.
    pub fn start_trips(
        &self,
        student_ids: &[i64],
        duration_secs: i64,
        now: DateTime<Utc>,
    ) -> Result<StartTripsOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let mut trips = Vec::with_capacity(student_ids.len());

            for &student_id in student_ids {
                if !student_exists(&tx, student_id)? {
                    return Ok(StartTripsOutcome::UnknownStudent(student_id));
                }
                if query_active_trip(&tx, student_id)?.is_some() {
                    return Ok(StartTripsOutcome::AlreadyActive(student_id));
                }

                // The partial unique index is the last line if another
                // process raced us past the check above.
                match tx.execute(
                    "INSERT INTO trips (student_id, duration_secs, started_at, status)
                     VALUES (?1, ?2, ?3, ?4)",
                    rusqlite::params![student_id, duration_secs, now, TripStatus::OnTrip.as_str()],
                ) {
                    Ok(_) => {}
                    Err(e) if is_unique_violation(&e) => {
                        return Ok(StartTripsOutcome::AlreadyActive(student_id));
                    }
                    Err(e) => return Err(e.into()),
                }
                let trip_id = tx.last_insert_rowid();

                tx.execute(
                    "UPDATE students SET status = ?1 WHERE id = ?2",
                    rusqlite::params![StudentStatus::OnTrip.as_str(), student_id],
                )?;

                trips.push(Trip {
                    id: trip_id,
                    student_id,
                    duration_secs,
                    started_at: now,
                    ended_at: None,
                    status: TripStatus::OnTrip,
                });
            }

            tx.commit()?;
            Ok(StartTripsOutcome::Started(trips))
        })
    }

    /// Close the student's active trip. `None` if there was nothing to close.
    pub fn close_trip(&self, student_id: i64, now: DateTime<Utc>) -> Result<Option<Trip>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let Some(mut trip) = query_active_trip(&tx, student_id)? else {
                return Ok(None);
            };

            tx.execute(
                "UPDATE trips SET ended_at = ?1, status = ?2 WHERE id = ?3",
                rusqlite::params![now, TripStatus::Inside.as_str(), trip.id],
            )?;
            tx.execute(
                "UPDATE students SET status = ?1 WHERE id = ?2",
                rusqlite::params![StudentStatus::Inside.as_str(), student_id],
            )?;
            tx.commit()?;

            trip.ended_at = Some(now);
            trip.status = TripStatus::Inside;
            Ok(Some(trip))
        })
    }

    /// `on-trip -> overdue`, but only if the stored trip is still active,
    /// still `on-trip` and out of time at `now`. The trip is re-read inside
    /// the transaction, so an extension or close that committed after the
    /// caller looked wins over the caller's stale copy.
    pub fn mark_trip_overdue(&self, trip_id: i64, now: DateTime<Utc>) -> Result<OverdueOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let Some(mut trip) = query_trip(&tx, trip_id)? else {
                return Ok(OverdueOutcome::Missing);
            };
            if !trip.is_active()
                || trip.status != TripStatus::OnTrip
                || trip.remaining_secs_at(now) > 0
            {
                return Ok(OverdueOutcome::Unchanged(trip));
            }

            set_active_trip_status(&tx, &trip, TripStatus::Overdue)?;
            tx.commit()?;

            trip.status = TripStatus::Overdue;
            Ok(OverdueOutcome::Marked(trip))
        })
    }

    // -- Reads --

    pub fn get_active_trip(&self, student_id: i64) -> Result<Option<Trip>> {
        self.with_conn(|conn| query_active_trip(conn, student_id))
    }

    pub fn get_trip(&self, trip_id: i64) -> Result<Option<Trip>> {
        self.with_conn(|conn| query_trip(conn, trip_id))
    }

    /// Every open trip, ordered by student.
    pub fn list_active_trips(&self) -> Result<Vec<Trip>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TRIP_COLUMNS} FROM trips WHERE ended_at IS NULL ORDER BY student_id"
            ))?;
            let trips = stmt
                .query_map([], trip_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(trips)
        })
    }

    /// Full trip history, newest first.
    pub fn list_trips(&self) -> Result<Vec<Trip>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TRIP_COLUMNS} FROM trips ORDER BY started_at DESC, id DESC"
            ))?;
            let trips = stmt
                .query_map([], trip_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(trips)
        })
    }
}

pub(crate) fn query_active_trip(conn: &Connection, student_id: i64) -> Result<Option<Trip>> {
    conn.query_row(
        &format!("SELECT {TRIP_COLUMNS} FROM trips WHERE student_id = ?1 AND ended_at IS NULL"),
        [student_id],
        trip_from_row,
    )
    .optional()
}

pub(crate) fn query_trip(conn: &Connection, trip_id: i64) -> Result<Option<Trip>> {
    conn.query_row(
        &format!("SELECT {TRIP_COLUMNS} FROM trips WHERE id = ?1"),
        [trip_id],
        trip_from_row,
    )
    .optional()
}

/// Set an active trip's status and mirror it onto the student.
pub(crate) fn set_active_trip_status(conn: &Connection, trip: &Trip, status: TripStatus) -> Result<()> {
    let student_status = match status {
        TripStatus::Inside => StudentStatus::Inside,
        TripStatus::OnTrip => StudentStatus::OnTrip,
        TripStatus::Overdue => StudentStatus::Overdue,
    };
    conn.execute(
        "UPDATE trips SET status = ?1 WHERE id = ?2 AND ended_at IS NULL",
        rusqlite::params![status.as_str(), trip.id],
    )?;
    conn.execute(
        "UPDATE students SET status = ?1 WHERE id = ?2",
        rusqlite::params![student_status.as_str(), trip.student_id],
    )?;
    Ok(())
}

fn trip_from_row(row: &Row<'_>) -> rusqlite::Result<Trip> {
    Ok(Trip {
        id: row.get(0)?,
        student_id: row.get(1)?,
        duration_secs: row.get(2)?,
        started_at: row.get(3)?,
        ended_at: row.get(4)?,
        status: status_column(row, 5)?,
    })
}
