//! Service modules for the harvesting pipeline

pub mod batch_encoder;
pub mod device_session;
pub mod orchestrator;
pub mod record_parser;
pub mod time_window;

pub use batch_encoder::encode_batch;
pub use device_session::{DeviceSession, OpenSession, SessionTimeouts};
pub use orchestrator::{HarvestController, ProcessResult, RunSummary};
pub use record_parser::{parse_one, AttendanceMark};
pub use time_window::TimeWindowFilter;
