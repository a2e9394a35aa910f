//! Unified error codes for the Lumina commerce platform
//!
//! Error codes are organized by band:
//! - 0xxx: General errors
//! - 1xxx: Authorization errors
//! - 2xxx: User errors
//! - 3xxx: Catalog errors (products, categories)
//! - 4xxx: Cart errors
//! - 5xxx: Promotion errors
//! - 6xxx: Voucher errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric failure modes shared with the storefront clients
///
/// Serialized as bare `u16` so non-Rust clients can switch on the value
/// without knowing the variant names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,

    // ==================== 1xxx: Authorization ====================
    /// Permission denied
    PermissionDenied = 1001,
    /// Admin role required
    AdminRequired = 1002,

    // ==================== 2xxx: User ====================
    /// User not found
    UserNotFound = 2001,

    // ==================== 3xxx: Catalog ====================
    /// Product not found
    ProductNotFound = 3001,
    /// Product is out of stock
    ProductOutOfStock = 3002,
    /// Category not found
    CategoryNotFound = 3101,

    // ==================== 4xxx: Cart ====================
    /// Cart item not found
    CartItemNotFound = 4001,

    // ==================== 5xxx: Promotion ====================
    /// Promotion not found
    PromotionNotFound = 5001,
    /// Promotion code already exists
    PromotionCodeExists = 5002,
    /// Promotion is not pending approval
    PromotionNotPending = 5003,
    /// Promotion scope configuration is invalid
    InvalidPromotionScope = 5004,
    /// Target products already carry an overlapping promotion
    PromotionProductConflict = 5005,
    /// Promotion date range overlaps an existing campaign
    PromotionOverlap = 5006,

    // ==================== 6xxx: Voucher ====================
    /// Voucher not found
    VoucherNotFound = 6001,
    /// Voucher code already exists
    VoucherCodeExists = 6002,
    /// Voucher is not pending approval
    VoucherNotPending = 6003,
    /// Voucher scope configuration is invalid
    InvalidVoucherScope = 6004,
    /// Voucher already used by this user
    VoucherAlreadyUsed = 6005,
    /// Order value below the voucher minimum
    VoucherMinOrderNotMet = 6006,
    /// Order value above the voucher maximum
    VoucherMaxOrderExceeded = 6007,
    /// No cart line matches the voucher scope
    VoucherScopeEmpty = 6008,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
}

impl ErrorCode {
    /// Numeric value as it appears on the wire
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// `true` only for [`ErrorCode::Success`]
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Default developer-facing message; services override with
    /// business-facing Vietnamese where one exists
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",

            // Authorization
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::AdminRequired => "Administrator role is required",

            // User
            ErrorCode::UserNotFound => "User not found",

            // Catalog
            ErrorCode::ProductNotFound => "Product not found",
            ErrorCode::ProductOutOfStock => "Product is out of stock",
            ErrorCode::CategoryNotFound => "Category not found",

            // Cart
            ErrorCode::CartItemNotFound => "Cart item not found",

            // Promotion
            ErrorCode::PromotionNotFound => "Promotion not found",
            ErrorCode::PromotionCodeExists => "Promotion code already exists",
            ErrorCode::PromotionNotPending => "Promotion is not pending approval",
            ErrorCode::InvalidPromotionScope => "Promotion scope configuration is invalid",
            ErrorCode::PromotionProductConflict => {
                "Target products already carry an overlapping promotion"
            }
            ErrorCode::PromotionOverlap => "Promotion date range overlaps an existing campaign",

            // Voucher
            ErrorCode::VoucherNotFound => "Voucher not found",
            ErrorCode::VoucherCodeExists => "Voucher code already exists",
            ErrorCode::VoucherNotPending => "Voucher is not pending approval",
            ErrorCode::InvalidVoucherScope => "Voucher scope configuration is invalid",
            ErrorCode::VoucherAlreadyUsed => "Voucher has already been used",
            ErrorCode::VoucherMinOrderNotMet => "Order value is below the voucher minimum",
            ErrorCode::VoucherMaxOrderExceeded => "Order value is above the voucher maximum",
            ErrorCode::VoucherScopeEmpty => "No cart line matches the voucher scope",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database operation failed",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Numeric value with no matching [`ErrorCode`] variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),

            // Authorization
            1001 => Ok(ErrorCode::PermissionDenied),
            1002 => Ok(ErrorCode::AdminRequired),

            // User
            2001 => Ok(ErrorCode::UserNotFound),

            // Catalog
            3001 => Ok(ErrorCode::ProductNotFound),
            3002 => Ok(ErrorCode::ProductOutOfStock),
            3101 => Ok(ErrorCode::CategoryNotFound),

            // Cart
            4001 => Ok(ErrorCode::CartItemNotFound),

            // Promotion
            5001 => Ok(ErrorCode::PromotionNotFound),
            5002 => Ok(ErrorCode::PromotionCodeExists),
            5003 => Ok(ErrorCode::PromotionNotPending),
            5004 => Ok(ErrorCode::InvalidPromotionScope),
            5005 => Ok(ErrorCode::PromotionProductConflict),
            5006 => Ok(ErrorCode::PromotionOverlap),

            // Voucher
            6001 => Ok(ErrorCode::VoucherNotFound),
            6002 => Ok(ErrorCode::VoucherCodeExists),
            6003 => Ok(ErrorCode::VoucherNotPending),
            6004 => Ok(ErrorCode::InvalidVoucherScope),
            6005 => Ok(ErrorCode::VoucherAlreadyUsed),
            6006 => Ok(ErrorCode::VoucherMinOrderNotMet),
            6007 => Ok(ErrorCode::VoucherMaxOrderExceeded),
            6008 => Ok(ErrorCode::VoucherScopeEmpty),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
