//! Promotion Lifecycle Service
//!
//! Campaign create/review/update/delete plus the pricing writes that
//! bake an active campaign's discount into its target products. Every
//! pricing batch goes through the repository in one transaction.

use std::collections::HashSet;

use serde_json::json;
use shared::models::{
    ApplyScope, ApprovalAction, ApprovalRequest, ApprovalStatus, Product, Promotion,
    PromotionCreate, PromotionDetail, PromotionUpdate, User,
};
use sqlx::SqlitePool;
use tracing::{info, warn};
use validator::Validate;

use crate::db::repository::{product, promotion};
use crate::pricing::{calculator, conflict, scope};
use crate::utils::{AppError, AppResult, Clock, ErrorCode};

/// Campaign lifecycle service
#[derive(Clone)]
pub struct PromotionService {
    pool: SqlitePool,
    clock: Clock,
}

impl PromotionService {
    pub fn new(pool: SqlitePool, clock: Clock) -> Self {
        Self { pool, clock }
    }

    // ── Lifecycle operations ─────────────────────────────────

    /// Create a campaign in PENDING_APPROVAL. No pricing is touched
    /// until an admin approves it.
    pub async fn create(&self, staff: &User, data: &PromotionCreate) -> AppResult<PromotionDetail> {
        // 1. Payload validation
        data.validate()
            .map_err(|e| AppError::validation(e.to_string()))?;

        // 2. Duplicate code
        if promotion::find_by_code(&self.pool, &data.code).await?.is_some() {
            return Err(AppError::with_message(
                ErrorCode::PromotionCodeExists,
                format!("Mã khuyến mãi '{}' đã tồn tại", data.code),
            ));
        }

        // 3. Scope shape and target existence
        scope::validate_scope_targets(
            &self.pool,
            data.apply_scope,
            &data.category_ids,
            &data.product_ids,
            ErrorCode::InvalidPromotionScope,
        )
        .await?;

        // 4. Dated campaigns must not collide with pending or approved ones
        conflict::check_creation_overlap(&self.pool, data).await?;

        // 5. Insert campaign and target sets
        let detail = promotion::create(&self.pool, data, Some(staff.id)).await?;
        info!(
            promotion_id = detail.promotion.id,
            code = %detail.promotion.code,
            "promotion created"
        );
        Ok(detail)
    }

    /// Admin review. APPROVE activates immediately when the start date
    /// is open or has arrived, otherwise the sweep activates it later;
    /// REJECT stores the reason.
    pub async fn approve(
        &self,
        admin: &User,
        id: i64,
        request: &ApprovalRequest,
    ) -> AppResult<PromotionDetail> {
        // 1. Admin gate
        if !admin.is_admin() {
            return Err(AppError::admin_required());
        }

        // 2. Must exist and still be pending
        let promo = self.require(id).await?;
        if promo.status != ApprovalStatus::PendingApproval {
            return Err(AppError::with_message(
                ErrorCode::PromotionNotPending,
                "Khuyến mãi không ở trạng thái chờ duyệt",
            ));
        }

        let now = self.clock.now_millis();
        match request.action {
            ApprovalAction::Approve => {
                let starts_now = promo
                    .start_date
                    .is_none_or(|start| start < self.clock.next_day_start_millis());

                // 3. Conflict gate runs before any state lands, so a
                //    blocked approval leaves the campaign pending
                if starts_now && promo.apply_scope != ApplyScope::Order {
                    let targets = self.resolve_targets(&promo).await?;
                    self.ensure_no_product_conflicts(&promo, &targets).await?;
                }

                // 4. Persist the approval
                promotion::set_approval(
                    &self.pool,
                    id,
                    ApprovalStatus::Approved,
                    starts_now,
                    admin.id,
                    now,
                    None,
                )
                .await?;

                // 5. Bake pricing when the window is already open
                if starts_now {
                    let approved = self.require(id).await?;
                    self.apply_to_targets(&approved).await?;
                }
                info!(promotion_id = id, active = starts_now, "promotion approved");
            }
            ApprovalAction::Reject => {
                promotion::set_approval(
                    &self.pool,
                    id,
                    ApprovalStatus::Rejected,
                    false,
                    admin.id,
                    now,
                    request.reason.as_deref(),
                )
                .await?;
                info!(promotion_id = id, "promotion rejected");
            }
        }

        Ok(promotion::load_detail(&self.pool, id).await?)
    }

    /// Partial update by the submitter or an admin. A live campaign is
    /// un-priced first and re-applied after the edit; a non-admin
    /// editing a rejected campaign sends it back to review.
    pub async fn update(
        &self,
        user: &User,
        id: i64,
        data: &PromotionUpdate,
    ) -> AppResult<PromotionDetail> {
        // 1. Ownership gate
        let promo = self.require(id).await?;
        self.ensure_owner_or_admin(user, promo.submitted_by)?;

        // 2. Code change rechecks uniqueness
        if let Some(code) = &data.code
            && code != &promo.code
            && promotion::find_by_code(&self.pool, code).await?.is_some()
        {
            return Err(AppError::with_message(
                ErrorCode::PromotionCodeExists,
                format!("Mã khuyến mãi '{code}' đã tồn tại"),
            ));
        }

        // 3. Scope edits re-validate the effective shape; absent id
        //    lists mean the target set empties
        if data.touches_scope() {
            let effective_scope = data.apply_scope.unwrap_or(promo.apply_scope);
            scope::validate_scope_targets(
                &self.pool,
                effective_scope,
                data.category_ids.as_deref().unwrap_or_default(),
                data.product_ids.as_deref().unwrap_or_default(),
                ErrorCode::InvalidPromotionScope,
            )
            .await?;
        }

        // 4. Un-price a live campaign before its terms change
        let was_live = promo.status == ApprovalStatus::Approved && promo.is_active;
        if was_live {
            self.clear_pricing(&promo).await?;
        }

        // 5. Apply the field updates (and target replacement)
        promotion::update(&self.pool, id, data).await?;

        // 6. A non-admin edit of a rejected campaign resubmits it
        if !user.is_admin() && promo.status == ApprovalStatus::Rejected {
            promotion::resubmit(&self.pool, id).await?;
            info!(promotion_id = id, "promotion resubmitted for review");
        }

        // 7. Re-price under the edited terms
        if was_live {
            let updated = self.require(id).await?;
            self.apply_to_targets(&updated).await?;
        }

        Ok(promotion::load_detail(&self.pool, id).await?)
    }

    /// Delete by the submitter or an admin. Attached products fall back
    /// to the next-best campaign or their base price.
    pub async fn delete(&self, user: &User, id: i64) -> AppResult<()> {
        let promo = self.require(id).await?;
        self.ensure_owner_or_admin(user, promo.submitted_by)?;

        self.clear_pricing(&promo).await?;
        promotion::delete(&self.pool, id).await?;
        info!(promotion_id = id, code = %promo.code, "promotion deleted");
        Ok(())
    }

    /// Admin-only kill switch for an approved campaign.
    pub async fn disable(&self, admin: &User, id: i64) -> AppResult<PromotionDetail> {
        if !admin.is_admin() {
            return Err(AppError::admin_required());
        }
        let promo = self.require(id).await?;
        if promo.status != ApprovalStatus::Approved {
            return Err(AppError::with_message(
                ErrorCode::PromotionNotPending,
                "Chỉ khuyến mãi đã duyệt mới có thể vô hiệu hóa",
            ));
        }

        self.clear_pricing(&promo).await?;
        promotion::set_status(&self.pool, id, ApprovalStatus::Disabled, false).await?;
        info!(promotion_id = id, "promotion disabled");
        Ok(promotion::load_detail(&self.pool, id).await?)
    }

    // ── Reads ────────────────────────────────────────────────

    pub async fn get(&self, id: i64) -> AppResult<PromotionDetail> {
        self.require(id).await?;
        Ok(promotion::load_detail(&self.pool, id).await?)
    }

    pub async fn list_by_status(&self, status: ApprovalStatus) -> AppResult<Vec<Promotion>> {
        Ok(promotion::find_by_status(&self.pool, status).await?)
    }

    /// Campaigns pricing products as of today
    pub async fn list_active(&self) -> AppResult<Vec<Promotion>> {
        Ok(promotion::find_active_as_of(
            &self.pool,
            self.clock.today_start_millis(),
            self.clock.next_day_start_millis(),
        )
        .await?)
    }

    // ── Pricing application ──────────────────────────────────

    /// Bake the campaign discount into every target product, in one
    /// transaction. No-op for ORDER scope, unapproved campaigns and
    /// empty resolutions; conflicting targets abort the whole batch.
    pub(crate) async fn apply_to_targets(&self, promotion: &Promotion) -> AppResult<()> {
        // 1. Only approved campaigns price products; ORDER scope never does
        if promotion.status != ApprovalStatus::Approved
            || promotion.apply_scope == ApplyScope::Order
        {
            return Ok(());
        }

        // 2. Resolve the concrete products
        let targets = self.resolve_targets(promotion).await?;
        if targets.is_empty() {
            return Ok(());
        }

        // 3. All-or-nothing conflict gate
        self.ensure_no_product_conflicts(promotion, &targets).await?;

        // 4. Batch the pricing writes
        let writes: Vec<product::PricingWrite> = targets
            .iter()
            .map(|target| price_under(target, Some(promotion)))
            .collect();
        product::set_pricing_batch(&self.pool, &writes).await?;
        info!(
            promotion_id = promotion.id,
            products = writes.len(),
            "promotion applied to targets"
        );
        Ok(())
    }

    /// Un-price every attached product and deactivate the campaign.
    pub(crate) async fn detach_from_products(&self, promotion: &Promotion) -> AppResult<()> {
        self.clear_pricing(promotion).await?;
        promotion::set_active(&self.pool, promotion.id, false).await?;
        Ok(())
    }

    /// Product approval hook: price a freshly approved product under the
    /// earliest active campaign of its category.
    ///
    /// Skips silently when the product is not approved, has no category,
    /// no category campaign is active, or its current campaign is still
    /// live and date-overlaps the candidate.
    pub(crate) async fn apply_category_promotion_to_product(
        &self,
        target: &Product,
    ) -> AppResult<()> {
        if target.status != shared::models::ProductStatus::Approved {
            return Ok(());
        }
        let Some(category_id) = target.category_id else {
            return Ok(());
        };

        let today_start = self.clock.today_start_millis();
        let next_day_start = self.clock.next_day_start_millis();
        let mut candidates =
            promotion::find_active_by_category_id(&self.pool, category_id, today_start, next_day_start)
                .await?;
        sort_earliest_first(&mut candidates);
        let Some(chosen) = candidates.into_iter().next() else {
            return Ok(());
        };

        // An overlapping live campaign keeps its pricing
        if let Some(current_id) = target.promotion_id
            && current_id != chosen.id
            && let Some(current) = promotion::get(&self.pool, current_id).await?
            && conflict::is_active_in_window(&current, today_start, next_day_start)
            && conflict::dates_overlap(
                chosen.start_date,
                chosen.expiry_date,
                current.start_date,
                current.expiry_date,
            )
        {
            return Ok(());
        }

        product::set_pricing_batch(&self.pool, &[price_under(target, Some(&chosen))]).await?;
        info!(
            product_id = target.id,
            promotion_id = chosen.id,
            "category promotion applied to product"
        );
        Ok(())
    }

    /// Re-price every product attached to the campaign under its
    /// next-best active campaign, or reset it to base price.
    async fn clear_pricing(&self, promotion: &Promotion) -> AppResult<()> {
        let attached = product::find_by_promotion(&self.pool, promotion.id).await?;
        if attached.is_empty() {
            return Ok(());
        }

        let today_start = self.clock.today_start_millis();
        let next_day_start = self.clock.next_day_start_millis();
        let mut writes = Vec::with_capacity(attached.len());
        for target in &attached {
            let replacement = self
                .find_next_active_promotion(target, promotion.id, today_start, next_day_start)
                .await?;
            writes.push(price_under(target, replacement.as_ref()));
        }
        product::set_pricing_batch(&self.pool, &writes).await?;
        info!(
            promotion_id = promotion.id,
            products = writes.len(),
            "promotion pricing cleared"
        );
        Ok(())
    }

    /// Earliest-starting active campaign still covering the product,
    /// the excluded one left out; open start dates sort last.
    async fn find_next_active_promotion(
        &self,
        target: &Product,
        excluded_id: i64,
        today_start: i64,
        next_day_start: i64,
    ) -> AppResult<Option<Promotion>> {
        let mut candidates =
            promotion::find_active_by_product_id(&self.pool, target.id, today_start, next_day_start)
                .await?;
        if let Some(category_id) = target.category_id {
            candidates.extend(
                promotion::find_active_by_category_id(
                    &self.pool,
                    category_id,
                    today_start,
                    next_day_start,
                )
                .await?,
            );
        }

        let mut seen = HashSet::new();
        candidates.retain(|c| c.id != excluded_id && seen.insert(c.id));
        sort_earliest_first(&mut candidates);
        Ok(candidates.into_iter().next())
    }

    async fn resolve_targets(&self, promotion: &Promotion) -> AppResult<Vec<Product>> {
        let category_ids = promotion::category_ids(&self.pool, promotion.id).await?;
        let product_ids = promotion::product_ids(&self.pool, promotion.id).await?;
        scope::resolve_target_products(
            &self.pool,
            promotion.apply_scope,
            &category_ids,
            &product_ids,
        )
        .await
    }

    async fn ensure_no_product_conflicts(
        &self,
        promotion: &Promotion,
        targets: &[Product],
    ) -> AppResult<()> {
        let conflicted = conflict::find_conflicting_products(
            &self.pool,
            promotion,
            targets,
            self.clock.today_start_millis(),
            self.clock.next_day_start_millis(),
        )
        .await?;
        if conflicted.is_empty() {
            return Ok(());
        }

        let names: Vec<String> = conflicted.iter().map(|p| p.name.clone()).collect();
        warn!(
            promotion_id = promotion.id,
            conflicts = names.len(),
            "promotion apply blocked by conflicting products"
        );
        Err(AppError::with_message(
            ErrorCode::PromotionProductConflict,
            format!(
                "Không thể áp dụng khuyến mãi. Các sản phẩm sau đã có khuyến mãi đang hoạt động trong khoảng thời gian trùng lặp: {}. Vui lòng chọn: 'Thay đổi chương trình khuyến mãi sang chương trình mới' hoặc 'Giữ nguyên, không áp promotion mới cho sản phẩm này'",
                names.join(", ")
            ),
        )
        .with_detail("conflicts", json!(names)))
    }

    fn ensure_owner_or_admin(&self, user: &User, submitted_by: Option<i64>) -> AppResult<()> {
        if user.is_admin() || submitted_by == Some(user.id) {
            return Ok(());
        }
        Err(AppError::permission_denied())
    }

    async fn require(&self, id: i64) -> AppResult<Promotion> {
        promotion::get(&self.pool, id).await?.ok_or_else(|| {
            AppError::with_message(ErrorCode::PromotionNotFound, "Khuyến mãi không tồn tại")
        })
    }
}

/// The pricing state a product takes under a campaign (or none)
fn price_under(target: &Product, campaign: Option<&Promotion>) -> product::PricingWrite {
    let base = calculator::final_price(target.unit_price, target.tax, 0.0);
    match campaign {
        Some(promo) => {
            let discount = calculator::discount_amount(
                promo.discount_type,
                promo.discount_value,
                promo.max_discount_value,
                base,
            );
            product::PricingWrite {
                product_id: target.id,
                discount_value: discount,
                price: calculator::final_price(target.unit_price, target.tax, discount),
                promotion_id: Some(promo.id),
            }
        }
        None => product::PricingWrite {
            product_id: target.id,
            discount_value: 0.0,
            price: base,
            promotion_id: None,
        },
    }
}

/// Earliest `start_date` first, open start dates last
fn sort_earliest_first(campaigns: &mut [Promotion]) {
    campaigns.sort_by_key(|c| (c.start_date.is_none(), c.start_date));
}
