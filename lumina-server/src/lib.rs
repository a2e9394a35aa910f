//! Lumina Server - storefront pricing and promotion engine
//!
//! # Overview
//!
//! Core business engine of an e-commerce storefront:
//!
//! - **Campaigns** (`services/promotion_service`): admin-reviewed promotions
//!   whose discounts are baked into product sale prices
//! - **Vouchers** (`services/voucher_service`): order-time discount codes
//!   redeemed through the cart
//! - **Catalog** (`services/product_service`): product submission, review,
//!   pricing and stock
//! - **Carts** (`services/cart_service`): recalculation and voucher handling
//! - **Sweep** (`services/expiration_service`): hourly pass that activates
//!   due campaigns and archives expired ones
//!
//! # Module layout
//!
//! ```text
//! lumina-server/src/
//! ├── core/          # config, server state, background tasks
//! ├── db/            # SQLite pool, migrations, repositories
//! ├── pricing/       # discount and sale-price arithmetic
//! ├── services/      # business services
//! └── utils/         # errors, clock, money helpers, logging
//! ```

pub mod core;
pub mod db;
pub mod pricing;
pub mod services;
pub mod utils;

pub use core::{BackgroundTasks, Config, ServerState};
pub use services::{
    CartService, ExpirationService, ProductService, PromotionService, VoucherService,
};
pub use utils::{AppError, AppResult, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// Prepare the process environment: .env file first, then the logger
/// (both honor LOG_LEVEL / LOG_DIR).
pub fn setup_environment() {
    dotenv::dotenv().ok();

    let log_level = std::env::var("LOG_LEVEL").ok();
    let log_dir = std::env::var("LOG_DIR").ok();
    utils::logger::init_logger_with_file(log_level.as_deref(), log_dir.as_deref());
}

pub fn print_banner() {
    println!(
        r#"
    __                    _
   / /   __  ______ ___  (_)___  ____ _
  / /   / / / / __ `__ \/ / __ \/ __ `/
 / /___/ /_/ / / / / / / / / / / /_/ /
/_____/\__,_/_/ /_/ /_/_/_/ /_/\__,_/
    "#
    );
}
