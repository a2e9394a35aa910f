//! Server state
//!
//! One struct holding the configuration, the database handle and every
//! service. `Clone` is cheap (the pool is reference counted), so tasks
//! and handlers take their own copy.

use std::time::Duration;

use crate::core::config::Config;
use crate::core::tasks::BackgroundTasks;
use crate::db::DbService;
use crate::services::{
    CartService, ExpirationService, ProductService, PromotionService, VoucherService,
};
use crate::utils::{AppError, AppResult, Clock};

/// Shared server state
///
/// # Components
///
/// | Field | Purpose |
/// |-------|---------|
/// | config | immutable runtime configuration |
/// | db | SQLite pool and migrations |
/// | promotions | campaign lifecycle and pricing |
/// | vouchers | voucher lifecycle and redemptions |
/// | products | catalog submission and review |
/// | carts | cart mutation and recalculation |
/// | expiration | periodic activation/expiration sweep |
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub db: DbService,
    pub promotions: PromotionService,
    pub vouchers: VoucherService,
    pub products: ProductService,
    pub carts: CartService,
    pub expiration: ExpirationService,
}

impl ServerState {
    /// Initialize the server state in order:
    ///
    /// 1. Working directory
    /// 2. Database (pool + migrations)
    /// 3. Services, all sharing the pool and the system clock
    pub async fn initialize(config: &Config) -> AppResult<Self> {
        // 1. The work dir must exist before SQLite can create its file
        std::fs::create_dir_all(&config.work_dir).map_err(|e| {
            AppError::internal(format!(
                "Failed to create work directory {}: {e}",
                config.work_dir
            ))
        })?;

        // 2. Database
        let db = DbService::new(&config.db_path()).await?;
        let pool = db.pool().clone();

        // 3. Services
        let clock = Clock::System;
        let promotions = PromotionService::new(pool.clone(), clock);
        let vouchers = VoucherService::new(pool.clone(), clock);
        let products = ProductService::new(pool.clone(), clock, promotions.clone());
        let carts = CartService::new(pool.clone(), clock);
        let expiration = ExpirationService::new(pool, clock, promotions.clone());

        Ok(Self {
            config: config.clone(),
            db,
            promotions,
            vouchers,
            products,
            carts,
            expiration,
        })
    }

    /// Register background tasks. Call before waiting for shutdown.
    pub fn start_background_tasks(&self, tasks: &mut BackgroundTasks) {
        let sweeper = self.expiration.clone();
        let period = Duration::from_secs(self.config.sweep_interval_secs);
        let shutdown = tasks.shutdown_token();
        tasks.spawn("expiration_sweeper", async move {
            sweeper.run(period, shutdown).await;
        });

        tasks.log_summary();
    }

    /// Borrow the underlying connection pool
    pub fn pool(&self) -> &sqlx::SqlitePool {
        self.db.pool()
    }
}
