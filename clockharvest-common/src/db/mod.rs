//! Database layer: initialization, models, repositories

pub mod init;
pub mod models;
pub mod repository;

pub use init::init_database;
pub use models::{BatchEntry, Clock, ConnectionLogEntry};
pub use repository::{AttendanceRepository, ClockRepository};
