use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use safemove_db::Database;
use safemove_db::models::{
    OverdueOutcome, ResolveOutcome, StartTripsOutcome, SubmitExtensionOutcome,
};
use safemove_types::api::{
    ActiveTripResponse, DeliveryReport, RecordEmergencyResponse, ReviewExtensionResponse,
    StaleApprovalWarning, StartTripResponse, TimerReading, TripHistoryEntry,
};
use safemove_types::models::{
    ExtensionRequest, MAX_EXTEND_MINUTES, MAX_TRIP_DURATION_SECS, ReviewAction, Student, Trip,
    TripStatus,
};

use crate::clock::Clock;
use crate::error::{LifecycleError, LifecycleResult};
use crate::notify::{NotificationContacts, Notifier, dispatch};
use crate::timer;

/// Owns every write to trips and extension requests.
///
/// Store work runs on the blocking pool and finishes before any notification
/// is awaited, so a slow messaging provider never holds the writer.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    db: Arc<Database>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    contacts: NotificationContacts,
}

impl Coordinator {
    pub fn new(
        db: Arc<Database>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        contacts: NotificationContacts,
    ) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                db,
                notifier,
                clock,
                contacts,
            }),
        }
    }

    pub fn db(&self) -> &Arc<Database> {
        &self.inner.db
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }

    /// Run blocking store work off the async runtime.
    async fn blocking<F, T>(&self, f: F) -> LifecycleResult<T>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.inner.db.clone();
        let result = tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                anyhow::anyhow!("store task failed: {}", e)
            })??;
        Ok(result)
    }

    async fn notify(&self, recipients: &[String], body: &str) -> DeliveryReport {
        dispatch(self.inner.notifier.as_ref(), recipients, body).await
    }

    // -- Trips --

    /// Start a trip for every student in the set, all or nothing, then tell
    /// the students. A failed message does not undo the trips.
    pub async fn start_trip(
        &self,
        student_ids: &[i64],
        duration_secs: i64,
    ) -> LifecycleResult<StartTripResponse> {
        let ids: Vec<i64> = student_ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        if ids.is_empty() {
            return Err(LifecycleError::Validation(
                "at least one student is required".into(),
            ));
        }
        if duration_secs <= 0 || duration_secs > MAX_TRIP_DURATION_SECS {
            return Err(LifecycleError::Validation(format!(
                "trip duration must be between 1 and {} seconds, got {}",
                MAX_TRIP_DURATION_SECS, duration_secs
            )));
        }

        let now = self.now();
        let (outcome, students) = self
            .blocking(move |db| {
                let outcome = db.start_trips(&ids, duration_secs, now)?;
                let mut students = Vec::new();
                if matches!(outcome, StartTripsOutcome::Started(_)) {
                    for id in &ids {
                        students.extend(db.get_student(*id)?);
                    }
                }
                Ok((outcome, students))
            })
            .await?;

        let trips = match outcome {
            StartTripsOutcome::Started(trips) => trips,
            StartTripsOutcome::UnknownStudent(id) => {
                return Err(LifecycleError::NotFound { entity: "student", id });
            }
            StartTripsOutcome::AlreadyActive(id) => {
                return Err(LifecycleError::Conflict(format!(
                    "student {} already has an active trip",
                    id
                )));
            }
        };
        info!(count = trips.len(), duration_secs, "Trips started");

        let phones: Vec<String> = students.into_iter().map(|s| s.phone).collect();
        let body = format!(
            "Your trip has started. You have {} to return to the hostel.",
            describe_minutes(duration_secs / 60)
        );
        let notification = self.notify(&phones, &body).await;

        Ok(StartTripResponse {
            trips,
            notification,
        })
    }

    pub async fn close_trip(&self, student_id: i64) -> LifecycleResult<Trip> {
        let now = self.now();
        let trip = self
            .blocking(move |db| db.close_trip(student_id, now))
            .await?
            .ok_or(LifecycleError::NotFound {
                entity: "active trip for student",
                id: student_id,
            })?;
        info!(student_id, trip_id = trip.id, "Trip closed");
        Ok(trip)
    }

    /// The student's active trip and its countdown.
    pub async fn active_trip(&self, student_id: i64) -> LifecycleResult<ActiveTripResponse> {
        let trip = self
            .blocking(move |db| db.get_active_trip(student_id))
            .await?
            .ok_or(LifecycleError::NotFound {
                entity: "active trip for student",
                id: student_id,
            })?;
        let (trip, timer) = self
            .observe(trip, self.now())
            .await?
            .ok_or(LifecycleError::NotFound {
                entity: "active trip for student",
                id: student_id,
            })?;
        Ok(ActiveTripResponse { trip, timer })
    }

    pub async fn student_timer(&self, student_id: i64) -> LifecycleResult<TimerReading> {
        Ok(self.active_trip(student_id).await?.timer)
    }

    /// Readings for every active trip. This is the poll path: trips whose
    /// clock ran out are moved to `overdue` here, and wardens are told once.
    pub async fn poll_timers(&self) -> LifecycleResult<Vec<TimerReading>> {
        let trips = self.blocking(|db| db.list_active_trips()).await?;
        let now = self.now();

        let mut readings = Vec::with_capacity(trips.len());
        for trip in trips {
            if let Some((_, reading)) = self.observe(trip, now).await? {
                readings.push(reading);
            }
        }
        Ok(readings)
    }

    /// Evaluate one trip at `now`, settling an expired `on-trip` trip as
    /// overdue. `trip` may be stale; the store re-checks it and only the
    /// caller whose update applies notifies. `None` once the trip has closed.
    async fn observe(
        &self,
        trip: Trip,
        now: DateTime<Utc>,
    ) -> LifecycleResult<Option<(Trip, TimerReading)>> {
        if trip.remaining_secs_at(now) > 0 || trip.status != TripStatus::OnTrip {
            let reading = timer::reading(&trip, now);
            return Ok(Some((trip, reading)));
        }

        let trip_id = trip.id;
        let student_id = trip.student_id;
        let (outcome, student) = self
            .blocking(move |db| {
                let outcome = db.mark_trip_overdue(trip_id, now)?;
                let student = match outcome {
                    OverdueOutcome::Marked(_) => db.get_student(student_id)?,
                    _ => None,
                };
                Ok((outcome, student))
            })
            .await?;

        let current = match outcome {
            OverdueOutcome::Marked(trip) => {
                warn!(student_id, trip_id, "Trip is overdue");
                let who = describe_student(student.as_ref(), student_id);
                let body = format!("{} has not returned and is now overdue.", who);
                let report = self.notify(&self.inner.contacts.wardens, &body).await;
                if !report.is_delivered() {
                    warn!(student_id, report = ?report, "Overdue notice not delivered");
                }
                trip
            }
            OverdueOutcome::Unchanged(trip) if trip.is_active() => trip,
            OverdueOutcome::Unchanged(_) | OverdueOutcome::Missing => return Ok(None),
        };

        let reading = timer::reading(&current, now);
        Ok(Some((current, reading)))
    }

    /// Every trip ever started with its elapsed time.
    pub async fn trip_history(&self) -> LifecycleResult<Vec<TripHistoryEntry>> {
        let trips = self.blocking(|db| db.list_trips()).await?;
        let now = self.now();
        Ok(trips
            .into_iter()
            .map(|trip| {
                let end = trip.ended_at.unwrap_or(now);
                let elapsed_secs = (end - trip.started_at).num_seconds().max(0);
                TripHistoryEntry { trip, elapsed_secs }
            })
            .collect())
    }

    // -- Extensions --

    pub async fn request_extension(
        &self,
        student_id: i64,
        extend_minutes: i64,
        personal_message: Option<String>,
    ) -> LifecycleResult<ExtensionRequest> {
        if extend_minutes <= 0 || extend_minutes > MAX_EXTEND_MINUTES {
            return Err(LifecycleError::Validation(format!(
                "extension must be between 1 and {} minutes, got {}",
                MAX_EXTEND_MINUTES, extend_minutes
            )));
        }
        let message = personal_message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());

        let now = self.now();
        let outcome = self
            .blocking(move |db| db.submit_extension(student_id, extend_minutes, message.as_deref(), now))
            .await?;

        match outcome {
            SubmitExtensionOutcome::Submitted(request) => {
                info!(request_id = request.id, student_id, extend_minutes, "Extension requested");
                Ok(request)
            }
            SubmitExtensionOutcome::UnknownStudent => Err(LifecycleError::NotFound {
                entity: "student",
                id: student_id,
            }),
            SubmitExtensionOutcome::NoActiveTrip => Err(LifecycleError::Validation(format!(
                "student {} has no active trip to extend",
                student_id
            ))),
        }
    }

    pub async fn pending_extensions(&self) -> LifecycleResult<Vec<ExtensionRequest>> {
        self.blocking(|db| db.list_pending_extensions()).await
    }

    /// Approve or reject a pending request. The store has committed before
    /// the student is notified, so a delivery failure cannot split the
    /// trip from the request.
    pub async fn review_extension(
        &self,
        request_id: i64,
        action: ReviewAction,
    ) -> LifecycleResult<ReviewExtensionResponse> {
        let now = self.now();
        let outcome = self
            .blocking(move |db| db.resolve_extension(request_id, action, now))
            .await?;

        let (request, trip) = match outcome {
            ResolveOutcome::Resolved { request, trip } => (request, trip),
            ResolveOutcome::NotFound => {
                return Err(LifecycleError::NotFound {
                    entity: "extension request",
                    id: request_id,
                });
            }
            ResolveOutcome::AlreadyResolved(status) => {
                return Err(LifecycleError::Conflict(format!(
                    "extension request {} is already {}",
                    request_id, status
                )));
            }
        };
        info!(request_id, action = ?action, "Extension request resolved");

        let warning = if action == ReviewAction::Approve && trip.is_none() {
            warn!(request_id, trip_id = request.trip_id, "Approved extension for a closed trip");
            Some(StaleApprovalWarning {
                request_id,
                student_id: request.student_id,
                message: format!(
                    "trip {} already closed; approval recorded but no time was added",
                    request.trip_id
                ),
            })
        } else {
            None
        };

        let notification = if warning.is_some() {
            DeliveryReport::Skipped {
                reason: "trip already closed".to_string(),
            }
        } else {
            let student_id = request.student_id;
            let student = self.blocking(move |db| db.get_student(student_id)).await?;
            let phones: Vec<String> = student.into_iter().map(|s| s.phone).collect();
            let body = match action {
                ReviewAction::Approve => format!(
                    "Your extension of {} was approved.",
                    describe_minutes(request.extend_minutes)
                ),
                ReviewAction::Reject => "Your extension request was rejected.".to_string(),
            };
            self.notify(&phones, &body).await
        };

        Ok(ReviewExtensionResponse {
            request,
            trip,
            warning,
            notification,
        })
    }

    // -- Emergencies --

    /// Record the emergency, then alert the emergency contacts. The record
    /// stands whether or not the alert goes through.
    pub async fn record_emergency(
        &self,
        student_id: Option<i64>,
        cause: &str,
    ) -> LifecycleResult<RecordEmergencyResponse> {
        let cause = cause.trim().to_string();
        if cause.is_empty() {
            return Err(LifecycleError::Validation("emergency cause is required".into()));
        }

        let now = self.now();
        let stored_cause = cause.clone();
        let recorded = self
            .blocking(move |db| {
                let student = match student_id {
                    Some(id) => match db.get_student(id)? {
                        Some(s) => Some(s),
                        None => return Ok(None),
                    },
                    None => None,
                };
                let event = db.insert_emergency(student_id, &stored_cause, now)?;
                Ok(Some((event, student)))
            })
            .await?;

        let Some((event, student)) = recorded else {
            return Err(LifecycleError::NotFound {
                entity: "student",
                id: student_id.unwrap_or_default(),
            });
        };
        warn!(event_id = event.id, student_id = ?student_id, cause = %cause, "Emergency recorded");

        let who = match (student.as_ref(), student_id) {
            (_, None) => "A student".to_string(),
            (s, Some(id)) => describe_student(s, id),
        };
        let body = format!("Emergency ({}) raised by {}. Please respond immediately.", cause, who);
        let notification = self.notify(&self.inner.contacts.emergency, &body).await;

        Ok(RecordEmergencyResponse {
            event,
            notification,
        })
    }

    /// Direct WhatsApp alert to an explicit list of numbers.
    pub async fn send_alert(
        &self,
        phone_numbers: &[String],
        message: &str,
    ) -> LifecycleResult<DeliveryReport> {
        if message.trim().is_empty() {
            return Err(LifecycleError::Validation("message is required".into()));
        }
        let recipients: Vec<String> = phone_numbers
            .iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        if recipients.is_empty() {
            return Err(LifecycleError::Validation(
                "at least one phone number is required".into(),
            ));
        }

        Ok(self.notify(&recipients, message).await)
    }
}

fn describe_minutes(minutes: i64) -> String {
    if minutes == 1 { "1 minute".to_string() } else { format!("{} minutes", minutes) }
}

fn describe_student(student: Option<&Student>, id: i64) -> String {
    match student {
        Some(s) => format!("{} ({})", s.name, s.phone),
        None => format!("Student {}", id),
    }
}
