#![forbid(unsafe_code)]

//! Progress and engagement engine for Stride.
//!
//! This crate provides:
//! - Domain types (users, craving entries, exercise sessions, stats, badges)
//! - Craving statistics over a trailing window
//! - Progression (points, levels, streaks)
//! - Badge rules
//! - A persistence port with in-memory and file-backed stores
//! - The engine that ties them together per inbound event

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod cravings;
pub mod progression;
pub mod badges;
pub mod store;
pub mod engine;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{default_catalog, Catalog, Exercise};
pub use config::Config;
pub use cravings::craving_stats;
pub use progression::level_for_points;
pub use store::{FileStore, MemoryStore, Store};
pub use engine::{CravingRecorded, Engine, Progress, SessionRecorded};
