//! clockharvest library interface
//!
//! Harvests attendance punches from networked biometric terminal clocks and
//! lands them in the relational store for downstream payroll/HR processing.
//!
//! The per-device pipeline: registration lookup, reachability probing, scoped
//! device session, raw-record parsing, time-window filtering, batch encoding,
//! persistence. One failed device never halts the remaining devices.

pub mod device;
pub mod services;

pub use services::orchestrator::{HarvestController, ProcessResult, RunSummary};
