//! Error handling re-exports
//!
//! The canonical error types live in the `shared` crate so that every
//! component reports failures through the same banded code space. This
//! module re-exports them for convenient `crate::utils::error::` paths.

pub use shared::error::{AppError, AppResult, ErrorCategory, ErrorCode};
