//! Data models
//!
//! Shared between the server and the admin/storefront clients (via JSON).
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (SQLite INTEGER PRIMARY KEY); timestamps are Unix
//! milliseconds (UTC). Campaign start/expiry instants are compared at date
//! granularity by the pricing logic.

pub mod archive;
pub mod cart;
pub mod category;
pub mod product;
pub mod promotion;
pub mod user;
pub mod voucher;

// Re-exports
pub use archive::*;
pub use cart::*;
pub use category::*;
pub use product::*;
pub use promotion::*;
pub use user::*;
pub use voucher::*;
