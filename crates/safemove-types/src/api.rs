use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{
    EmergencyEvent, ExtensionRequest, ReviewAction, Student, StudentStatus, Trip, TripStatus,
};

// -- Delivery --

/// Outcome of a best-effort outbound notification. Reported next to the
/// result of the operation that triggered it, never instead of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryReport {
    Delivered { recipients: usize },
    Failed { reason: String },
    Skipped { reason: String },
}

impl DeliveryReport {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

// -- Students --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterStudentRequest {
    pub name: String,
    pub phone: String,
    pub image: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StudentQuery {
    #[serde(default)]
    pub name: String,
    pub status_not: Option<StudentStatus>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StudentList {
    pub students: Vec<Student>,
}

// -- Trips --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StartTripRequest {
    pub student_ids: Vec<i64>,
    pub duration_minutes: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartTripResponse {
    pub trips: Vec<Trip>,
    pub notification: DeliveryReport,
}

/// Countdown state of one active trip at a given instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerReading {
    pub student_id: i64,
    pub trip_id: i64,
    pub status: TripStatus,
    pub duration_secs: i64,
    pub started_at: DateTime<Utc>,
    pub remaining_seconds: i64,
    pub expired: bool,
    /// Ten minutes or less left.
    pub warning: bool,
    /// `MM:SS` rendering of `remaining_seconds`.
    pub display: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TimerList {
    pub timers: Vec<TimerReading>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActiveTripResponse {
    pub trip: Trip,
    pub timer: TimerReading,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripHistoryEntry {
    #[serde(flatten)]
    pub trip: Trip,
    /// Seconds between start and end, or start and now for active trips.
    pub elapsed_secs: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TripHistory {
    pub trips: Vec<TripHistoryEntry>,
}

// -- Extension requests --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitExtensionRequest {
    pub student_id: i64,
    pub extend_minutes: i64,
    pub personal_message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReviewExtensionRequest {
    pub request_id: i64,
    pub action: ReviewAction,
}

/// Non-fatal: the request was approved but its trip had already closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaleApprovalWarning {
    pub request_id: i64,
    pub student_id: i64,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewExtensionResponse {
    pub request: ExtensionRequest,
    /// The trip after the extension was applied, when there was one to extend.
    pub trip: Option<Trip>,
    pub warning: Option<StaleApprovalWarning>,
    pub notification: DeliveryReport,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExtensionRequestList {
    pub requests: Vec<ExtensionRequest>,
}

// -- Emergencies --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordEmergencyRequest {
    pub student_id: Option<i64>,
    pub cause: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecordEmergencyResponse {
    pub event: EmergencyEvent,
    pub notification: DeliveryReport,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EmergencyList {
    pub emergencies: Vec<EmergencyEvent>,
}

// -- Alerts --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendAlertRequest {
    pub message: String,
    #[serde(default)]
    pub phone_numbers: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendAlertResponse {
    pub notification: DeliveryReport,
}

// -- Health --

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub db_healthy: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_report_is_tagged_by_status() {
        let json = serde_json::to_value(DeliveryReport::Failed { reason: "timeout".into() }).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"], "timeout");

        let json = serde_json::to_value(DeliveryReport::Delivered { recipients: 3 }).unwrap();
        assert_eq!(json["status"], "delivered");
        assert_eq!(json["recipients"], 3);
    }

    #[test]
    fn start_trip_request_rejects_unknown_fields() {
        let ok: StartTripRequest =
            serde_json::from_str(r#"{"student_ids":[1,2],"duration_minutes":40}"#).unwrap();
        assert_eq!(ok.student_ids, vec![1, 2]);

        let err = serde_json::from_str::<StartTripRequest>(
            r#"{"student_ids":[1],"duration_minutes":40,"time":40}"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn alert_request_defaults_to_no_recipients() {
        let req: SendAlertRequest = serde_json::from_str(r#"{"message":"help"}"#).unwrap();
        assert!(req.phone_numbers.is_empty());
    }
}
