//! Expiration Sweep
//!
//! Periodic pass over campaigns and vouchers: activates future-dated
//! campaigns whose start date has arrived, and archives date-expired
//! entries into write-once snapshot tables before flipping them to
//! `EXPIRED`. Every pass carries a correlation id and per-item failures
//! are logged and skipped, so one poisoned row never blocks the rest.

use std::time::Duration;

use shared::models::{ApprovalStatus, ExpiredPromotion, ExpiredVoucher, Promotion, Voucher};
use sqlx::SqlitePool;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

use crate::db::repository::{archive, promotion, voucher};
use crate::services::promotion_service::PromotionService;
use crate::utils::{AppResult, Clock};

/// Counts reported by one sweep pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepSummary {
    pub promotions_activated: usize,
    pub vouchers_expired: usize,
    pub promotions_expired: usize,
}

/// Campaign and voucher lifecycle sweeper
#[derive(Clone)]
pub struct ExpirationService {
    pool: SqlitePool,
    clock: Clock,
    promotions: PromotionService,
}

impl ExpirationService {
    pub fn new(pool: SqlitePool, clock: Clock, promotions: PromotionService) -> Self {
        Self {
            pool,
            clock,
            promotions,
        }
    }

    /// Periodic driver. Sweeps once at startup, then on every tick until
    /// the shutdown token fires. Missed ticks are skipped so a long pass
    /// never stacks follow-ups.
    pub async fn run(self, period: Duration, shutdown: CancellationToken) {
        info!(period_secs = period.as_secs(), "Expiration sweeper started");

        self.run_sweep().await;

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await; // skip immediate, the startup pass covered it

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_sweep().await;
                }
                _ = shutdown.cancelled() => {
                    info!("Expiration sweeper received shutdown signal");
                    return;
                }
            }
        }
    }

    /// One full pass. Never fails as a whole; failed items stay untouched
    /// and are retried on the next pass.
    pub async fn run_sweep(&self) -> SweepSummary {
        let sweep_id = Uuid::new_v4();
        let today_start = self.clock.today_start_millis();
        let next_day_start = self.clock.next_day_start_millis();
        let now = self.clock.now_millis();

        let promotions_activated = self
            .activate_due_promotions(sweep_id, today_start, next_day_start)
            .await;
        let vouchers_expired = self.archive_expired_vouchers(sweep_id, today_start, now).await;
        let promotions_expired = self
            .archive_expired_promotions(sweep_id, today_start, now)
            .await;

        let summary = SweepSummary {
            promotions_activated,
            vouchers_expired,
            promotions_expired,
        };
        info!(
            sweep_id = %sweep_id,
            activated = summary.promotions_activated,
            vouchers_expired = summary.vouchers_expired,
            promotions_expired = summary.promotions_expired,
            "Expiration sweep finished"
        );
        summary
    }

    // ── Phase 1: activation ──────────────────────────────────

    async fn activate_due_promotions(
        &self,
        sweep_id: Uuid,
        today_start: i64,
        next_day_start: i64,
    ) -> usize {
        let due = match promotion::find_to_activate_as_of(&self.pool, today_start, next_day_start)
            .await
        {
            Ok(rows) => rows,
            Err(err) => {
                error!(sweep_id = %sweep_id, error = %err, "Failed to list due promotions");
                return 0;
            }
        };

        let mut activated = 0;
        for campaign in due {
            match self.activate_one(&campaign).await {
                Ok(()) => {
                    info!(
                        sweep_id = %sweep_id,
                        promotion_id = campaign.id,
                        code = %campaign.code,
                        "Promotion activated"
                    );
                    activated += 1;
                }
                Err(err) => {
                    error!(
                        sweep_id = %sweep_id,
                        promotion_id = campaign.id,
                        error = %err,
                        "Failed to activate promotion"
                    );
                }
            }
        }
        activated
    }

    async fn activate_one(&self, campaign: &Promotion) -> AppResult<()> {
        promotion::set_active(&self.pool, campaign.id, true).await?;
        self.promotions.apply_to_targets(campaign).await
    }

    // ── Phase 2: voucher archiving ───────────────────────────

    async fn archive_expired_vouchers(&self, sweep_id: Uuid, today_start: i64, now: i64) -> usize {
        let expired = match voucher::find_expired_as_of(&self.pool, today_start).await {
            Ok(rows) => rows,
            Err(err) => {
                error!(sweep_id = %sweep_id, error = %err, "Failed to list expired vouchers");
                return 0;
            }
        };

        let mut count = 0;
        for entry in expired {
            match self.expire_voucher(&entry, now).await {
                Ok(()) => {
                    info!(
                        sweep_id = %sweep_id,
                        voucher_id = entry.id,
                        code = %entry.code,
                        "Voucher expired and archived"
                    );
                    count += 1;
                }
                Err(err) => {
                    error!(
                        sweep_id = %sweep_id,
                        voucher_id = entry.id,
                        error = %err,
                        "Failed to expire voucher"
                    );
                }
            }
        }
        count
    }

    async fn expire_voucher(&self, entry: &Voucher, expired_at: i64) -> AppResult<()> {
        // An existing snapshot means a previous pass died between the
        // archive write and the status flip; only the flip re-runs.
        if !archive::voucher_exists(&self.pool, entry.id).await? {
            let category_ids = voucher::category_ids(&self.pool, entry.id).await?;
            let product_ids = voucher::product_ids(&self.pool, entry.id).await?;
            let snapshot = ExpiredVoucher::snapshot(entry, category_ids, product_ids, expired_at);
            archive::insert_voucher(&self.pool, &snapshot).await?;
        }
        voucher::set_status(&self.pool, entry.id, ApprovalStatus::Expired, false).await?;
        Ok(())
    }

    // ── Phase 3: promotion archiving ─────────────────────────

    async fn archive_expired_promotions(
        &self,
        sweep_id: Uuid,
        today_start: i64,
        now: i64,
    ) -> usize {
        let expired = match promotion::find_expired_as_of(&self.pool, today_start).await {
            Ok(rows) => rows,
            Err(err) => {
                error!(sweep_id = %sweep_id, error = %err, "Failed to list expired promotions");
                return 0;
            }
        };

        let mut count = 0;
        for campaign in expired {
            match self.expire_promotion(&campaign, now).await {
                Ok(()) => {
                    info!(
                        sweep_id = %sweep_id,
                        promotion_id = campaign.id,
                        code = %campaign.code,
                        "Promotion expired and archived"
                    );
                    count += 1;
                }
                Err(err) => {
                    error!(
                        sweep_id = %sweep_id,
                        promotion_id = campaign.id,
                        error = %err,
                        "Failed to expire promotion"
                    );
                }
            }
        }
        count
    }

    async fn expire_promotion(&self, campaign: &Promotion, expired_at: i64) -> AppResult<()> {
        if !archive::promotion_exists(&self.pool, campaign.id).await? {
            let category_ids = promotion::category_ids(&self.pool, campaign.id).await?;
            let product_ids = promotion::product_ids(&self.pool, campaign.id).await?;
            let snapshot =
                ExpiredPromotion::snapshot(campaign, category_ids, product_ids, expired_at);
            archive::insert_promotion(&self.pool, &snapshot).await?;
        }
        // Products revert to their base (or next-campaign) price before
        // the status flip
        self.promotions.detach_from_products(campaign).await?;
        promotion::set_status(&self.pool, campaign.id, ApprovalStatus::Expired, false).await?;
        Ok(())
    }
}
