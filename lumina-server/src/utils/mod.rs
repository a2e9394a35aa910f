//! Utility modules
//!
//! # Contents
//!
//! - [`AppError`] / [`AppResult`] - application error types (from `shared::error`)
//! - [`Clock`] - injectable time source for date-sensitive logic
//! - money rounding and logging helpers

pub mod error;
pub mod logger;
pub mod money;
pub mod time;

// Re-export error types from the error module (which re-exports from shared)
pub use error::{AppError, AppResult, ErrorCategory, ErrorCode};
pub use time::Clock;
