//! Shared types for the Lumina commerce platform
//!
//! Domain models, the unified error system and small utilities used by the
//! server crate. Database derives are feature-gated (`db`) so the models
//! stay usable without pulling in a driver.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use error::{AppError, AppResult, ErrorCategory, ErrorCode};
pub use serde::{Deserialize, Serialize};
