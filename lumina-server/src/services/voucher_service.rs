//! Voucher Lifecycle Service
//!
//! Same review shape as promotions, but vouchers never touch product
//! rows: the discount is computed against the cart at redemption, and
//! the date window is enforced there too. Approval therefore activates
//! immediately regardless of the start date.

use std::collections::HashSet;

use shared::models::{
    ApprovalAction, ApprovalRequest, ApprovalStatus, User, Voucher, VoucherCreate, VoucherDetail,
    VoucherUpdate,
};
use sqlx::SqlitePool;
use tracing::info;
use validator::Validate;

use crate::db::repository::{user as user_repo, voucher};
use crate::pricing::scope;
use crate::utils::{AppError, AppResult, Clock, ErrorCode};

/// Voucher lifecycle service
#[derive(Clone)]
pub struct VoucherService {
    pool: SqlitePool,
    clock: Clock,
}

impl VoucherService {
    pub fn new(pool: SqlitePool, clock: Clock) -> Self {
        Self { pool, clock }
    }

    // ── Lifecycle operations ─────────────────────────────────

    /// Create a voucher in PENDING_APPROVAL. Vouchers never collide, so
    /// there is no overlap check.
    pub async fn create(&self, staff: &User, data: &VoucherCreate) -> AppResult<VoucherDetail> {
        // 1. Payload validation
        data.validate()
            .map_err(|e| AppError::validation(e.to_string()))?;

        // 2. Duplicate code
        if voucher::find_by_code(&self.pool, &data.code).await?.is_some() {
            return Err(AppError::with_message(
                ErrorCode::VoucherCodeExists,
                format!("Mã voucher '{}' đã tồn tại", data.code),
            ));
        }

        // 3. Scope shape and target existence
        scope::validate_scope_targets(
            &self.pool,
            data.apply_scope,
            &data.category_ids,
            &data.product_ids,
            ErrorCode::InvalidVoucherScope,
        )
        .await?;

        // 4. Insert voucher and target sets
        let detail = voucher::create(&self.pool, data, Some(staff.id)).await?;
        info!(
            voucher_id = detail.voucher.id,
            code = %detail.voucher.code,
            "voucher created"
        );
        Ok(detail)
    }

    /// Admin review. APPROVE activates the voucher immediately; the
    /// date window only gates redemption.
    pub async fn approve(
        &self,
        admin: &User,
        id: i64,
        request: &ApprovalRequest,
    ) -> AppResult<VoucherDetail> {
        // 1. Admin gate
        if !admin.is_admin() {
            return Err(AppError::admin_required());
        }

        // 2. Must exist and still be pending
        let entry = self.require(id).await?;
        if entry.status != ApprovalStatus::PendingApproval {
            return Err(AppError::with_message(
                ErrorCode::VoucherNotPending,
                "Voucher không ở trạng thái chờ duyệt",
            ));
        }

        // 3. Persist the outcome
        let now = self.clock.now_millis();
        match request.action {
            ApprovalAction::Approve => {
                voucher::set_approval(&self.pool, id, ApprovalStatus::Approved, true, admin.id, now, None)
                    .await?;
                info!(voucher_id = id, "voucher approved");
            }
            ApprovalAction::Reject => {
                voucher::set_approval(
                    &self.pool,
                    id,
                    ApprovalStatus::Rejected,
                    false,
                    admin.id,
                    now,
                    request.reason.as_deref(),
                )
                .await?;
                info!(voucher_id = id, "voucher rejected");
            }
        }

        Ok(voucher::load_detail(&self.pool, id).await?)
    }

    /// Partial update by the submitter or an admin; a non-admin editing
    /// a rejected voucher sends it back to review.
    pub async fn update(
        &self,
        user: &User,
        id: i64,
        data: &VoucherUpdate,
    ) -> AppResult<VoucherDetail> {
        // 1. Ownership gate
        let entry = self.require(id).await?;
        self.ensure_owner_or_admin(user, entry.submitted_by)?;

        // 2. Code change rechecks uniqueness
        if let Some(code) = &data.code
            && code != &entry.code
            && voucher::find_by_code(&self.pool, code).await?.is_some()
        {
            return Err(AppError::with_message(
                ErrorCode::VoucherCodeExists,
                format!("Mã voucher '{code}' đã tồn tại"),
            ));
        }

        // 3. Scope edits re-validate the effective shape
        if data.touches_scope() {
            let effective_scope = data.apply_scope.unwrap_or(entry.apply_scope);
            scope::validate_scope_targets(
                &self.pool,
                effective_scope,
                data.category_ids.as_deref().unwrap_or_default(),
                data.product_ids.as_deref().unwrap_or_default(),
                ErrorCode::InvalidVoucherScope,
            )
            .await?;
        }

        // 4. Apply the field updates (and target replacement)
        voucher::update(&self.pool, id, data).await?;

        // 5. A non-admin edit of a rejected voucher resubmits it
        if !user.is_admin() && entry.status == ApprovalStatus::Rejected {
            voucher::resubmit(&self.pool, id).await?;
            info!(voucher_id = id, "voucher resubmitted for review");
        }

        Ok(voucher::load_detail(&self.pool, id).await?)
    }

    /// Delete by the submitter or an admin; the voucher also leaves
    /// every user's redemption set.
    pub async fn delete(&self, user: &User, id: i64) -> AppResult<()> {
        let entry = self.require(id).await?;
        self.ensure_owner_or_admin(user, entry.submitted_by)?;

        let unmarked = user_repo::unmark_voucher_for_all(&self.pool, id).await?;
        voucher::delete(&self.pool, id).await?;
        info!(
            voucher_id = id,
            code = %entry.code,
            redemptions_removed = unmarked,
            "voucher deleted"
        );
        Ok(())
    }

    /// Admin-only kill switch for an approved voucher.
    pub async fn disable(&self, admin: &User, id: i64) -> AppResult<VoucherDetail> {
        if !admin.is_admin() {
            return Err(AppError::admin_required());
        }
        let entry = self.require(id).await?;
        if entry.status != ApprovalStatus::Approved {
            return Err(AppError::with_message(
                ErrorCode::VoucherNotPending,
                "Chỉ voucher đã duyệt mới có thể vô hiệu hóa",
            ));
        }

        voucher::set_status(&self.pool, id, ApprovalStatus::Disabled, false).await?;
        info!(voucher_id = id, "voucher disabled");
        Ok(voucher::load_detail(&self.pool, id).await?)
    }

    // ── Reads ────────────────────────────────────────────────

    pub async fn get(&self, id: i64) -> AppResult<VoucherDetail> {
        self.require(id).await?;
        Ok(voucher::load_detail(&self.pool, id).await?)
    }

    pub async fn list_by_status(&self, status: ApprovalStatus) -> AppResult<Vec<Voucher>> {
        Ok(voucher::find_by_status(&self.pool, status).await?)
    }

    /// Vouchers redeemable as of today; with a user given, the ones
    /// that user already redeemed are filtered out.
    pub async fn list_active(&self, user: Option<&User>) -> AppResult<Vec<Voucher>> {
        let mut active = voucher::find_active_as_of(
            &self.pool,
            self.clock.today_start_millis(),
            self.clock.next_day_start_millis(),
        )
        .await?;

        if let Some(user) = user {
            let used: HashSet<i64> = user_repo::used_voucher_ids(&self.pool, user.id)
                .await?
                .into_iter()
                .collect();
            active.retain(|v| !used.contains(&v.id));
        }
        Ok(active)
    }

    // ── Redemption bookkeeping ───────────────────────────────

    /// Record that a user redeemed the voucher. Idempotent per
    /// user+voucher; the usage counter only moves on the first mark.
    pub async fn record_usage(&self, user: &User, voucher_id: i64) -> AppResult<()> {
        self.require(voucher_id).await?;
        let newly_marked =
            user_repo::mark_voucher_used(&self.pool, user.id, voucher_id, self.clock.now_millis())
                .await?;
        if newly_marked {
            voucher::increment_usage(&self.pool, voucher_id).await?;
            info!(voucher_id, user_id = user.id, "voucher usage recorded");
        }
        Ok(())
    }

    fn ensure_owner_or_admin(&self, user: &User, submitted_by: Option<i64>) -> AppResult<()> {
        if user.is_admin() || submitted_by == Some(user.id) {
            return Ok(());
        }
        Err(AppError::permission_denied())
    }

    async fn require(&self, id: i64) -> AppResult<Voucher> {
        voucher::get(&self.pool, id).await?.ok_or_else(|| {
            AppError::with_message(ErrorCode::VoucherNotFound, "Voucher không tồn tại")
        })
    }
}
