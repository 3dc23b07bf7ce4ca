//! # clockharvest Common Library
//!
//! Shared code for the clockharvest attendance harvester:
//! - Error taxonomy
//! - Settings loading and resolution
//! - Database initialization, models, and repositories

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
