use std::sync::Arc;

use safemove_db::Database;
use safemove_lifecycle::Coordinator;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub coordinator: Coordinator,
}

impl AppStateInner {
    pub fn new(coordinator: Coordinator) -> AppState {
        Arc::new(Self {
            db: coordinator.db().clone(),
            coordinator,
        })
    }
}
