//! Store-level outcomes. Failures of the store itself travel as `anyhow`
//! errors; these enums carry the domain answers the caller has to act on.

use safemove_types::models::{ExtensionRequest, ExtensionStatus, Trip};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartTripsOutcome {
    Started(Vec<Trip>),
    UnknownStudent(i64),
    AlreadyActive(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitExtensionOutcome {
    Submitted(ExtensionRequest),
    UnknownStudent,
    NoActiveTrip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// `trip` is the extended trip after an approval, `None` for rejections
    /// and for approvals whose trip had already closed.
    Resolved {
        request: ExtensionRequest,
        trip: Option<Trip>,
    },
    NotFound,
    AlreadyResolved(ExtensionStatus),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverdueOutcome {
    /// The trip was out of time and is now `overdue`.
    Marked(Trip),
    /// Nothing changed; carries the trip as currently stored.
    Unchanged(Trip),
    Missing,
}
