//! Service layer
//!
//! # Services
//!
//! - [`PromotionService`] - campaign lifecycle and product pricing
//! - [`VoucherService`] - voucher lifecycle and redemptions
//! - [`ProductService`] - catalog submission, review and stock
//! - [`CartService`] - cart mutation and recalculation
//! - [`ExpirationService`] - hourly activation/expiration sweep

pub mod cart_service;
pub mod expiration_service;
pub mod product_service;
pub mod promotion_service;
pub mod voucher_service;

pub use cart_service::CartService;
pub use expiration_service::{ExpirationService, SweepSummary};
pub use product_service::ProductService;
pub use promotion_service::PromotionService;
pub use voucher_service::VoucherService;
