//! Unified error system for the Lumina commerce platform
//!
//! - [`ErrorCode`]: standardized numeric codes for all failure modes
//! - [`ErrorCategory`]: classification of errors by domain band
//! - [`AppError`]: rich error type with code, message and details
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 1xxx: Authorization errors
//! - 2xxx: User errors
//! - 3xxx: Catalog errors
//! - 4xxx: Cart errors
//! - 5xxx: Promotion errors
//! - 6xxx: Voucher errors
//! - 9xxx: System errors
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode};
//!
//! // Default message for a code
//! let err = AppError::new(ErrorCode::PromotionNotPending);
//!
//! // Business-facing message with structured context
//! let err = AppError::with_message(ErrorCode::VoucherMinOrderNotMet, "order below minimum")
//!     .with_detail("minOrderValue", 200_000.0);
//! ```

mod category;
mod codes;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{AppError, AppResult};
