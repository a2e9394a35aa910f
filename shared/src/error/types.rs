//! Application error type

use super::codes::ErrorCode;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Platform error: an [`ErrorCode`], a message, and optional structured
/// details. Business-facing messages are Vietnamese; codes and detail keys
/// are what clients switch on.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    /// Extra context for admin tooling (conflicting names, missing ids, ...)
    pub details: Option<HashMap<String, Value>>,
}

impl AppError {
    /// Error carrying the code's default message
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.message().to_string(),
            code,
            details: None,
        }
    }

    /// Error with a caller-supplied message
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Attach one structured detail (builder style)
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    // ==================== Convenience constructors ====================

    /// [`ErrorCode::ValidationFailed`] with a message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::ValidationFailed, msg)
    }

    /// Generic [`ErrorCode::NotFound`], recording the resource name as a detail
    pub fn not_found(resource: impl Into<String>) -> Self {
        let r = resource.into();
        Self::with_message(ErrorCode::NotFound, format!("{} not found", r))
            .with_detail("resource", r)
    }

    /// [`ErrorCode::PermissionDenied`]; the message stays generic on purpose
    pub fn permission_denied() -> Self {
        Self::new(ErrorCode::PermissionDenied)
    }

    /// [`ErrorCode::AdminRequired`]
    pub fn admin_required() -> Self {
        Self::new(ErrorCode::AdminRequired)
    }

    /// [`ErrorCode::InternalError`] with a message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InternalError, msg)
    }

    /// [`ErrorCode::DatabaseError`] with a message
    pub fn database(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::DatabaseError, msg)
    }
}

/// Result alias used across the platform
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_new() {
        let err = AppError::new(ErrorCode::NotFound);
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.message, "Resource not found");
        assert!(err.details.is_none());
    }

    #[test]
    fn test_app_error_with_message() {
        let err = AppError::with_message(ErrorCode::ValidationFailed, "Invalid discount value");
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert_eq!(err.message, "Invalid discount value");
    }

    #[test]
    fn test_app_error_with_detail() {
        let err = AppError::new(ErrorCode::PromotionProductConflict)
            .with_detail("conflicts", vec!["Rust for Rustaceans"])
            .with_detail("promotionId", 7);

        assert_eq!(err.code, ErrorCode::PromotionProductConflict);
        let details = err.details.unwrap();
        assert!(details.contains_key("conflicts"));
        assert_eq!(details.get("promotionId").unwrap(), 7);
    }

    #[test]
    fn test_app_error_convenience_constructors() {
        let err = AppError::not_found("Voucher");
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.message, "Voucher not found");
        assert!(err.details.as_ref().unwrap().contains_key("resource"));

        let err = AppError::validation("Invalid input");
        assert_eq!(err.code, ErrorCode::ValidationFailed);

        let err = AppError::admin_required();
        assert_eq!(err.code, ErrorCode::AdminRequired);

        let err = AppError::permission_denied();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
        assert_eq!(err.message, "Permission denied");

        let err = AppError::database("pool timed out");
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::with_message(ErrorCode::VoucherNotFound, "Voucher SAVE10 not found");
        assert_eq!(format!("{}", err), "Voucher SAVE10 not found");
    }
}
