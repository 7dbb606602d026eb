use std::time::Duration;

use tracing::{debug, warn};

use safemove_types::models::TripStatus;

use crate::coordinator::Coordinator;

/// Background task that evaluates every active trip on an interval, so an
/// expired trip turns overdue and wardens hear about it even when nobody is
/// watching the admin screen.
pub async fn run_overdue_sweep(coordinator: Coordinator, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));

    loop {
        interval.tick().await;

        match coordinator.poll_timers().await {
            Ok(readings) => {
                let overdue = readings.iter().filter(|r| r.status == TripStatus::Overdue).count();
                if overdue > 0 {
                    debug!("Sweep: {} of {} active trips overdue", overdue, readings.len());
                }
            }
            Err(e) => {
                warn!("Sweep error: {}", e);
            }
        }
    }
}
