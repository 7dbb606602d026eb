use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, TransactionBehavior};

use safemove_types::models::{ExtensionRequest, ExtensionStatus, ReviewAction, Trip, TripStatus};

use super::students::student_exists;
use super::trips::{query_active_trip, query_trip, set_active_trip_status};
use super::{OptionalExt, status_column};
use crate::Database;
use crate::models::{ResolveOutcome, SubmitExtensionOutcome};

const REQUEST_SELECT: &str = "SELECT r.id, r.student_id, r.trip_id, s.name, r.extend_minutes,
        r.personal_message, r.status, r.created_at, r.resolved_at
     FROM extension_requests r
     LEFT JOIN students s ON s.id = r.student_id";

impl Database {
    /// Queue a pending request against the student's active trip.
    pub fn submit_extension(
        &self,
        student_id: i64,
        extend_minutes: i64,
        personal_message: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<SubmitExtensionOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            if !student_exists(&tx, student_id)? {
                return Ok(SubmitExtensionOutcome::UnknownStudent);
            }
            let Some(trip) = query_active_trip(&tx, student_id)? else {
                return Ok(SubmitExtensionOutcome::NoActiveTrip);
            };

            tx.execute(
                "INSERT INTO extension_requests
                    (student_id, trip_id, extend_minutes, personal_message, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    student_id,
                    trip.id,
                    extend_minutes,
                    personal_message,
                    ExtensionStatus::Pending.as_str(),
                    now,
                ],
            )?;
            let id = tx.last_insert_rowid();
            let request = query_request(&tx, id)?
                .ok_or_else(|| anyhow::anyhow!("extension request {} vanished after insert", id))?;
            tx.commit()?;

            Ok(SubmitExtensionOutcome::Submitted(request))
        })
    }

    /// Pending requests, oldest first.
    pub fn list_pending_extensions(&self) -> Result<Vec<ExtensionRequest>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{REQUEST_SELECT}
                 WHERE r.status = ?1
                 ORDER BY r.created_at ASC, r.id ASC"
            ))?;
            let rows = stmt
                .query_map([ExtensionStatus::Pending.as_str()], request_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_extension_request(&self, id: i64) -> Result<Option<ExtensionRequest>> {
        self.with_conn(|conn| query_request(conn, id))
    }

    /// Move a request out of `pending`.
    ///
    /// Approval adds the time to the referenced trip first and flips the
    /// request second, both in one transaction; the flip is conditional on the
    /// request still being pending, so only one resolver can ever win. An
    /// overdue trip that has time left after the extension goes back to
    /// `on-trip` in the same transaction.
    pub fn resolve_extension(
        &self,
        id: i64,
        action: ReviewAction,
        now: DateTime<Utc>,
    ) -> Result<ResolveOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let Some(mut request) = query_request(&tx, id)? else {
                return Ok(ResolveOutcome::NotFound);
            };
            if request.status != ExtensionStatus::Pending {
                return Ok(ResolveOutcome::AlreadyResolved(request.status));
            }

            let mut trip = None;
            if action == ReviewAction::Approve {
                let extra_secs = request.extend_minutes.checked_mul(60).ok_or_else(|| {
                    anyhow::anyhow!("extension of {} minutes is out of range", request.extend_minutes)
                })?;
                if let Some(mut current) = query_trip(&tx, request.trip_id)?.filter(Trip::is_active) {
                    current.duration_secs =
                        current.duration_secs.checked_add(extra_secs).ok_or_else(|| {
                            anyhow::anyhow!("trip {} duration would overflow", current.id)
                        })?;
                    tx.execute(
                        "UPDATE trips SET duration_secs = ?1 WHERE id = ?2",
                        rusqlite::params![current.duration_secs, current.id],
                    )?;
                    if current.status == TripStatus::Overdue && current.remaining_secs_at(now) > 0 {
                        set_active_trip_status(&tx, &current, TripStatus::OnTrip)?;
                        current.status = TripStatus::OnTrip;
                    }
                    trip = Some(current);
                }
            }

            let status = action.resulting_status();
            let changed = tx.execute(
                "UPDATE extension_requests SET status = ?1, resolved_at = ?2
                 WHERE id = ?3 AND status = ?4",
                rusqlite::params![status.as_str(), now, id, ExtensionStatus::Pending.as_str()],
            )?;
            if changed == 0 {
                // Dropping the transaction rolls back the trip extension.
                return Ok(ResolveOutcome::AlreadyResolved(request.status));
            }
            tx.commit()?;

            request.status = status;
            request.resolved_at = Some(now);
            Ok(ResolveOutcome::Resolved { request, trip })
        })
    }
}

fn query_request(conn: &Connection, id: i64) -> Result<Option<ExtensionRequest>> {
    conn.query_row(&format!("{REQUEST_SELECT} WHERE r.id = ?1"), [id], request_from_row)
        .optional()
}

fn request_from_row(row: &Row<'_>) -> rusqlite::Result<ExtensionRequest> {
    Ok(ExtensionRequest {
        id: row.get(0)?,
        student_id: row.get(1)?,
        trip_id: row.get(2)?,
        student_name: row.get(3)?,
        extend_minutes: row.get(4)?,
        personal_message: row.get(5)?,
        status: status_column(row, 6)?,
        created_at: row.get(7)?,
        resolved_at: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::models::StartTripsOutcome;
    use crate::testing::open_temp;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    fn submitted(outcome: SubmitExtensionOutcome) -> ExtensionRequest {
        match outcome {
            SubmitExtensionOutcome::Submitted(r) => r,
            other => panic!("expected a submitted request, got {:?}", other),
        }
    }

    #[test]
    fn submit_requires_an_active_trip() {
        let (_dir, db) = open_temp();
        let a = db.create_student("A", "1", None).unwrap();

        let outcome = db.submit_extension(a.id, 15, None, t0()).unwrap();
        assert_eq!(outcome, SubmitExtensionOutcome::NoActiveTrip);
        let outcome = db.submit_extension(42, 15, None, t0()).unwrap();
        assert_eq!(outcome, SubmitExtensionOutcome::UnknownStudent);

        db.start_trips(&[a.id], 2400, t0()).unwrap();
        let req = submitted(db.submit_extension(a.id, 15, Some("bus is late"), t0()).unwrap());
        assert_eq!(req.status, ExtensionStatus::Pending);
        assert_eq!(req.student_name.as_deref(), Some("A"));
        assert_eq!(req.personal_message.as_deref(), Some("bus is late"));
        assert_eq!(req.trip_id, db.get_active_trip(a.id).unwrap().unwrap().id);
    }

    #[test]
    fn pending_list_is_first_come_first_served() {
        let (_dir, db) = open_temp();
        let a = db.create_student("A", "1", None).unwrap();
        let b = db.create_student("B", "2", None).unwrap();
        db.start_trips(&[a.id, b.id], 2400, t0()).unwrap();

        let late = submitted(db.submit_extension(a.id, 10, None, t0() + Duration::seconds(90)).unwrap());
        let early = submitted(db.submit_extension(b.id, 20, None, t0() + Duration::seconds(30)).unwrap());

        let ids: Vec<i64> = db.list_pending_extensions().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![early.id, late.id]);
    }

    #[test]
    fn approve_extends_trip_and_leaves_queue() {
        let (_dir, db) = open_temp();
        let a = db.create_student("A", "1", None).unwrap();
        db.start_trips(&[a.id], 2400, t0()).unwrap();
        let req = submitted(db.submit_extension(a.id, 15, None, t0()).unwrap());

        let outcome = db.resolve_extension(req.id, ReviewAction::Approve, t0()).unwrap();
        let ResolveOutcome::Resolved { request, trip } = outcome else {
            panic!("expected resolution, got {:?}", outcome);
        };
        assert_eq!(request.status, ExtensionStatus::Approved);
        assert_eq!(trip.unwrap().duration_secs, 2400 + 900);
        assert_eq!(db.get_active_trip(a.id).unwrap().unwrap().duration_secs, 3300);
        assert!(db.list_pending_extensions().unwrap().is_empty());

        let again = db.resolve_extension(req.id, ReviewAction::Reject, t0()).unwrap();
        assert_eq!(again, ResolveOutcome::AlreadyResolved(ExtensionStatus::Approved));
        assert_eq!(
            db.get_extension_request(req.id).unwrap().unwrap().status,
            ExtensionStatus::Approved
        );
        assert_eq!(db.get_active_trip(a.id).unwrap().unwrap().duration_secs, 3300);
    }

    #[test]
    fn reject_leaves_trip_untouched() {
        let (_dir, db) = open_temp();
        let a = db.create_student("A", "1", None).unwrap();
        db.start_trips(&[a.id], 2400, t0()).unwrap();
        let req = submitted(db.submit_extension(a.id, 15, None, t0()).unwrap());

        let outcome = db.resolve_extension(req.id, ReviewAction::Reject, t0()).unwrap();
        let ResolveOutcome::Resolved { request, trip } = outcome else {
            panic!("expected resolution, got {:?}", outcome);
        };
        assert_eq!(request.status, ExtensionStatus::Rejected);
        assert!(trip.is_none());
        assert_eq!(db.get_active_trip(a.id).unwrap().unwrap().duration_secs, 2400);
    }

    #[test]
    fn approval_after_trip_closed_only_marks_request() {
        let (_dir, db) = open_temp();
        let a = db.create_student("A", "1", None).unwrap();
        db.start_trips(&[a.id], 2400, t0()).unwrap();
        let req = submitted(db.submit_extension(a.id, 15, None, t0()).unwrap());
        db.close_trip(a.id, t0() + Duration::minutes(5)).unwrap();
        // A newer trip must not pick up the stale extension.
        db.start_trips(&[a.id], 600, t0() + Duration::minutes(10)).unwrap();

        let outcome = db.resolve_extension(req.id, ReviewAction::Approve, t0()).unwrap();
        let ResolveOutcome::Resolved { request, trip } = outcome else {
            panic!("expected resolution, got {:?}", outcome);
        };
        assert_eq!(request.status, ExtensionStatus::Approved);
        assert!(trip.is_none());
        assert_eq!(db.get_active_trip(a.id).unwrap().unwrap().duration_secs, 600);
    }

    #[test]
    fn unknown_request_is_not_found() {
        let (_dir, db) = open_temp();
        assert_eq!(
            db.resolve_extension(9, ReviewAction::Approve, t0()).unwrap(),
            ResolveOutcome::NotFound
        );
    }

    #[test]
    fn approval_brings_overdue_trip_back_on_the_clock() {
        let (_dir, db) = open_temp();
        let a = db.create_student("A", "1", None).unwrap();
        db.start_trips(&[a.id], 60, t0()).unwrap();
        let req = submitted(db.submit_extension(a.id, 10, None, t0()).unwrap());
        let trip_id = db.get_active_trip(a.id).unwrap().unwrap().id;
        let now = t0() + Duration::seconds(120);
        db.mark_trip_overdue(trip_id, now).unwrap();

        let outcome = db.resolve_extension(req.id, ReviewAction::Approve, now).unwrap();
        let ResolveOutcome::Resolved { trip: Some(trip), .. } = outcome else {
            panic!("expected an extended trip, got {:?}", outcome);
        };
        assert_eq!(trip.status, TripStatus::OnTrip);
        assert_eq!(trip.duration_secs, 660);
        assert_eq!(db.get_active_trip(a.id).unwrap().unwrap().status, TripStatus::OnTrip);
        assert_eq!(
            db.get_student(a.id).unwrap().unwrap().status,
            safemove_types::models::StudentStatus::OnTrip
        );
    }

    #[test]
    fn oversized_extension_fails_cleanly() {
        let (_dir, db) = open_temp();
        let a = db.create_student("A", "1", None).unwrap();
        let b = db.create_student("B", "2", None).unwrap();
        db.start_trips(&[a.id], 2400, t0()).unwrap();

        for minutes in [i64::MAX / 2, i64::MAX / 60] {
            let req = submitted(db.submit_extension(a.id, minutes, None, t0()).unwrap());
            assert!(db.resolve_extension(req.id, ReviewAction::Approve, t0()).is_err());
            // Nothing from the failed approval stuck.
            assert_eq!(
                db.get_extension_request(req.id).unwrap().unwrap().status,
                ExtensionStatus::Pending
            );
            assert_eq!(db.get_active_trip(a.id).unwrap().unwrap().duration_secs, 2400);
        }

        // The writer is still usable.
        assert!(matches!(
            db.start_trips(&[b.id], 600, t0()).unwrap(),
            StartTripsOutcome::Started(_)
        ));
        db.insert_emergency(Some(b.id), "Call Police", t0()).unwrap();
    }
}
