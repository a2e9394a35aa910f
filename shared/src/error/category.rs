//! Error code bands

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Domain band an error code belongs to
///
/// The thousands digit of the code picks the band:
/// - 0xxx general
/// - 1xxx authorization
/// - 2xxx user
/// - 3xxx catalog
/// - 4xxx cart
/// - 5xxx promotion
/// - 6xxx voucher
/// - 9xxx system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    General,
    Authorization,
    User,
    Catalog,
    Cart,
    Promotion,
    Voucher,
    System,
}

impl ErrorCategory {
    /// Band for a numeric code
    pub fn from_code(code: u16) -> Self {
        match code {
            0..1000 => Self::General,
            1000..2000 => Self::Authorization,
            2000..3000 => Self::User,
            3000..4000 => Self::Catalog,
            4000..5000 => Self::Cart,
            5000..6000 => Self::Promotion,
            6000..7000 => Self::Voucher,
            _ => Self::System,
        }
    }

    /// Lowercase label, as serialized into error payloads
    pub fn name(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Authorization => "authorization",
            Self::User => "user",
            Self::Catalog => "catalog",
            Self::Cart => "cart",
            Self::Promotion => "promotion",
            Self::Voucher => "voucher",
            Self::System => "system",
        }
    }
}

impl ErrorCode {
    /// Band this code falls in
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_code() {
        assert_eq!(ErrorCategory::from_code(0), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(999), ErrorCategory::General);

        assert_eq!(ErrorCategory::from_code(1001), ErrorCategory::Authorization);
        assert_eq!(ErrorCategory::from_code(2001), ErrorCategory::User);
        assert_eq!(ErrorCategory::from_code(3101), ErrorCategory::Catalog);
        assert_eq!(ErrorCategory::from_code(4001), ErrorCategory::Cart);
        assert_eq!(ErrorCategory::from_code(5006), ErrorCategory::Promotion);
        assert_eq!(ErrorCategory::from_code(6008), ErrorCategory::Voucher);
        assert_eq!(ErrorCategory::from_code(9001), ErrorCategory::System);
        assert_eq!(ErrorCategory::from_code(10000), ErrorCategory::System);
    }

    #[test]
    fn test_error_code_category() {
        assert_eq!(ErrorCode::Success.category(), ErrorCategory::General);
        assert_eq!(
            ErrorCode::AdminRequired.category(),
            ErrorCategory::Authorization
        );
        assert_eq!(ErrorCode::UserNotFound.category(), ErrorCategory::User);
        assert_eq!(
            ErrorCode::CategoryNotFound.category(),
            ErrorCategory::Catalog
        );
        assert_eq!(ErrorCode::CartItemNotFound.category(), ErrorCategory::Cart);
        assert_eq!(
            ErrorCode::PromotionOverlap.category(),
            ErrorCategory::Promotion
        );
        assert_eq!(
            ErrorCode::VoucherAlreadyUsed.category(),
            ErrorCategory::Voucher
        );
        assert_eq!(ErrorCode::InternalError.category(), ErrorCategory::System);
    }

    #[test]
    fn test_category_serialize() {
        let json = serde_json::to_string(&ErrorCategory::Voucher).unwrap();
        assert_eq!(json, "\"voucher\"");

        let category: ErrorCategory = serde_json::from_str("\"promotion\"").unwrap();
        assert_eq!(category, ErrorCategory::Promotion);
    }
}
