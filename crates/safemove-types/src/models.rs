use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Returned when a status column holds a value this build does not know.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown {kind} status: {value}")]
pub struct UnknownStatus {
    pub kind: &'static str,
    pub value: String,
}

/// Where a student currently is. Mirrors the status of their latest trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StudentStatus {
    Inside,
    OnTrip,
    Overdue,
}

/// Trip states. `Inside` means the trip was closed by the student returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TripStatus {
    Inside,
    OnTrip,
    Overdue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtensionStatus {
    Pending,
    Approved,
    Rejected,
}

/// Admin decision on a pending extension request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewAction {
    Approve,
    Reject,
}

impl ReviewAction {
    /// Terminal status a request ends in after this action.
    pub fn resulting_status(self) -> ExtensionStatus {
        match self {
            Self::Approve => ExtensionStatus::Approved,
            Self::Reject => ExtensionStatus::Rejected,
        }
    }
}

macro_rules! text_status {
    ($ty:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = UnknownStatus;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownStatus {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

text_status!(StudentStatus, "student", {
    Inside => "inside",
    OnTrip => "on-trip",
    Overdue => "overdue",
});

text_status!(TripStatus, "trip", {
    Inside => "inside",
    OnTrip => "on-trip",
    Overdue => "overdue",
});

text_status!(ExtensionStatus, "extension", {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

/// Longest trip that can be granted in one go.
pub const MAX_TRIP_DURATION_SECS: i64 = 24 * 60 * 60;

/// Largest single extension a student can ask for.
pub const MAX_EXTEND_MINUTES: i64 = 12 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub image: Option<String>,
    pub status: StudentStatus,
}

/// One outing. `ended_at == None` means the trip is still active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trip {
    pub id: i64,
    pub student_id: i64,
    pub duration_secs: i64,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub status: TripStatus,
}

impl Trip {
    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }

    /// `max(0, duration - floor(elapsed))` at `now`. An instant before the
    /// start counts as no time elapsed.
    pub fn remaining_secs_at(&self, now: DateTime<Utc>) -> i64 {
        let elapsed = (now - self.started_at).num_seconds().max(0);
        self.duration_secs.saturating_sub(elapsed).max(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionRequest {
    pub id: i64,
    pub student_id: i64,
    /// Trip that was active when the request was made.
    pub trip_id: i64,
    /// Joined from the student directory for display; `None` if the student row is gone.
    pub student_name: Option<String>,
    pub extend_minutes: i64,
    pub personal_message: Option<String>,
    pub status: ExtensionStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Audit record of a safety action raised during a trip. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyEvent {
    pub id: i64,
    pub student_id: Option<i64>,
    pub cause: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub students_in: i64,
    pub students_out: i64,
    pub total_trips: i64,
    pub emergency_count: i64,
}
