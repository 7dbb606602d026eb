pub mod alerts;
pub mod dashboard;
pub mod emergencies;
pub mod error;
pub mod extensions;
pub mod health;
pub mod router;
pub mod state;
pub mod students;
pub mod trips;
