pub mod clock;
pub mod coordinator;
pub mod error;
pub mod notify;
pub mod sweep;
pub mod timer;

pub use coordinator::Coordinator;
pub use error::{LifecycleError, LifecycleResult};
