/// Failures of a lifecycle operation.
///
/// Delivery problems of the notification side-channel are never reported
/// here; they travel in a `DeliveryReport` next to the successful result.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// Bad input; nothing was changed.
    #[error("{0}")]
    Validation(String),

    /// The change would break an invariant, e.g. a second active trip or a
    /// second resolution of the same request.
    #[error("{0}")]
    Conflict(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;
