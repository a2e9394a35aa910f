//! Product Catalog Service
//!
//! Submission and review of catalog products, plus the price-relevant
//! edits. The sale price column always holds the effective price
//! (tax included, campaign discount applied); approval hooks into the
//! promotion service so a fresh product picks up the earliest active
//! campaign of its category.

use shared::models::{Product, ProductAction, ProductCreate, ProductStatus, ProductUpdate, User};
use sqlx::SqlitePool;
use tracing::{info, warn};
use validator::Validate;

use crate::db::repository::{category, product, promotion};
use crate::pricing::calculator;
use crate::services::promotion_service::PromotionService;
use crate::utils::{AppError, AppResult, Clock, ErrorCode, money};

/// Product catalog service
#[derive(Clone)]
pub struct ProductService {
    pool: SqlitePool,
    clock: Clock,
    promotions: PromotionService,
}

impl ProductService {
    pub fn new(pool: SqlitePool, clock: Clock, promotions: PromotionService) -> Self {
        Self {
            pool,
            clock,
            promotions,
        }
    }

    // ── Submission & edits ───────────────────────────────────

    /// Submit a product for review. An explicit sale price wins over the
    /// computed `unit_price * (1 + tax) - discount`.
    pub async fn create(&self, staff: &User, data: &ProductCreate) -> AppResult<Product> {
        // 1. Payload validation
        data.validate()
            .map_err(|e| AppError::validation(e.to_string()))?;
        money::require_non_negative(data.unit_price, "unit_price")?;

        // 2. Category must exist when given
        if let Some(category_id) = data.category_id {
            self.ensure_category_exists(category_id).await?;
        }

        // 3. Sale price
        let price = match data.price {
            Some(price) => {
                money::require_non_negative(price, "price")?;
                price
            }
            None => calculator::final_price(
                data.unit_price,
                data.tax.unwrap_or(0.0),
                data.discount_value.unwrap_or(0.0),
            ),
        };

        // 4. Insert in PENDING_APPROVAL
        let created = product::create(&self.pool, data, price, Some(staff.id)).await?;
        info!(product_id = created.id, name = %created.name, "product created");
        Ok(created)
    }

    /// Partial update by the submitter or an admin. Any change to the
    /// pricing inputs recomputes the sale price unless an explicit price
    /// comes along.
    pub async fn update(&self, user: &User, id: i64, data: &ProductUpdate) -> AppResult<Product> {
        // 1. Ownership gate
        let current = self.require(id).await?;
        self.ensure_owner_or_admin(user, current.submitted_by)?;

        // 2. Merge descriptive fields
        let mut merged = current;
        if let Some(name) = &data.name {
            merged.name = name.clone();
        }
        if let Some(description) = &data.description {
            merged.description = Some(description.clone());
        }
        if let Some(author) = &data.author {
            merged.author = Some(author.clone());
        }
        if let Some(publisher) = &data.publisher {
            merged.publisher = Some(publisher.clone());
        }
        if let Some(stock) = data.stock_quantity {
            merged.stock_quantity = Some(stock);
        }
        if let Some(purchase_price) = data.purchase_price {
            money::require_non_negative(purchase_price, "purchase_price")?;
            merged.purchase_price = Some(purchase_price);
        }

        // 3. Category change must point at a real category
        if let Some(category_id) = data.category_id {
            self.ensure_category_exists(category_id).await?;
            merged.category_id = Some(category_id);
        }

        // 4. Pricing inputs, then the sale price itself
        if let Some(unit_price) = data.unit_price {
            money::require_non_negative(unit_price, "unit_price")?;
            merged.unit_price = unit_price;
        }
        if let Some(tax) = data.tax {
            money::require_non_negative(tax, "tax")?;
            merged.tax = tax;
        }
        if let Some(discount_value) = data.discount_value {
            money::require_non_negative(discount_value, "discount_value")?;
            merged.discount_value = discount_value;
        }
        let inputs_changed =
            data.unit_price.is_some() || data.tax.is_some() || data.discount_value.is_some();
        if let Some(price) = data.price {
            money::require_non_negative(price, "price")?;
            merged.price = price;
        } else if inputs_changed {
            merged.price =
                calculator::final_price(merged.unit_price, merged.tax, merged.discount_value);
        }

        // 5. Campaign pointer: 0 detaches, anything else must exist
        match data.promotion_id {
            Some(0) => merged.promotion_id = None,
            Some(promotion_id) => {
                if promotion::get(&self.pool, promotion_id).await?.is_none() {
                    return Err(AppError::with_message(
                        ErrorCode::PromotionNotFound,
                        "Khuyến mãi không tồn tại",
                    ));
                }
                merged.promotion_id = Some(promotion_id);
            }
            None => {}
        }

        // 6. Write the merged row back
        product::save(&self.pool, &merged).await?;
        info!(product_id = id, "product updated");
        self.require(id).await
    }

    // ── Review ───────────────────────────────────────────────

    /// Admin review. Approval (and re-enabling) prices the product under
    /// the earliest active campaign of its category, best effort.
    pub async fn review(
        &self,
        admin: &User,
        id: i64,
        action: ProductAction,
        reason: Option<&str>,
    ) -> AppResult<Product> {
        // 1. Admin gate
        if !admin.is_admin() {
            return Err(AppError::admin_required());
        }
        let target = self.require(id).await?;
        let now = self.clock.now_millis();

        // 2. Persist the outcome
        match action {
            ProductAction::Approve => {
                product::set_status(
                    &self.pool,
                    id,
                    ProductStatus::Approved,
                    Some(admin.id),
                    Some(now),
                    None,
                )
                .await?;
                info!(product_id = id, "product approved");
                self.auto_apply_category_campaign(id).await;
            }
            ProductAction::Reject => {
                product::set_status(
                    &self.pool,
                    id,
                    ProductStatus::Rejected,
                    Some(admin.id),
                    Some(now),
                    reason,
                )
                .await?;
                info!(product_id = id, "product rejected");
            }
            ProductAction::Disable => {
                product::set_status(
                    &self.pool,
                    id,
                    ProductStatus::Disabled,
                    target.approved_by,
                    target.approved_at,
                    target.rejection_reason.as_deref(),
                )
                .await?;
                info!(product_id = id, "product disabled");
            }
            ProductAction::Enable => {
                product::set_status(
                    &self.pool,
                    id,
                    ProductStatus::Approved,
                    target.approved_by,
                    target.approved_at,
                    None,
                )
                .await?;
                info!(product_id = id, "product enabled");
                self.auto_apply_category_campaign(id).await;
            }
        }

        self.require(id).await
    }

    // ── Stock & removal ──────────────────────────────────────

    /// Add stock. Starts tracking when the product was untracked.
    pub async fn restock(&self, user: &User, id: i64, quantity: i64) -> AppResult<Product> {
        if quantity <= 0 {
            return Err(AppError::validation("Số lượng nhập kho phải lớn hơn 0"));
        }
        let current = self.require(id).await?;
        self.ensure_owner_or_admin(user, current.submitted_by)?;

        let restocked = product::add_stock(&self.pool, id, quantity).await?;
        info!(
            product_id = id,
            quantity,
            stock = ?restocked.stock_quantity,
            "product restocked"
        );
        Ok(restocked)
    }

    /// Delete a product; campaign target sets and cart lines referencing
    /// it go with it.
    pub async fn delete(&self, user: &User, id: i64) -> AppResult<()> {
        let current = self.require(id).await?;
        self.ensure_owner_or_admin(user, current.submitted_by)?;

        product::delete(&self.pool, id).await?;
        info!(product_id = id, "product deleted");
        Ok(())
    }

    pub async fn get(&self, id: i64) -> AppResult<Product> {
        self.require(id).await
    }

    // ── Internals ────────────────────────────────────────────

    /// Best-effort category auto-apply after approval; a pricing failure
    /// never takes the approval down with it.
    async fn auto_apply_category_campaign(&self, id: i64) {
        let fresh = match product::get(&self.pool, id).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return,
            Err(err) => {
                warn!(
                    product_id = id,
                    error = %err,
                    "Could not reload product for campaign auto-apply"
                );
                return;
            }
        };
        // A baked-in campaign keeps its pricing
        if fresh.promotion_id.is_some() {
            return;
        }
        if let Err(err) = self
            .promotions
            .apply_category_promotion_to_product(&fresh)
            .await
        {
            warn!(product_id = id, error = %err, "Category campaign auto-apply failed");
        }
    }

    async fn ensure_category_exists(&self, category_id: i64) -> AppResult<()> {
        if category::get(&self.pool, category_id).await?.is_none() {
            return Err(AppError::with_message(
                ErrorCode::CategoryNotFound,
                "Danh mục không tồn tại",
            ));
        }
        Ok(())
    }

    fn ensure_owner_or_admin(&self, user: &User, submitted_by: Option<i64>) -> AppResult<()> {
        if user.is_admin() || submitted_by == Some(user.id) {
            return Ok(());
        }
        Err(AppError::permission_denied())
    }

    async fn require(&self, id: i64) -> AppResult<Product> {
        product::get(&self.pool, id).await?.ok_or_else(|| {
            AppError::with_message(ErrorCode::ProductNotFound, "Sản phẩm không tồn tại")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{ApplyScope, ApprovalStatus, DiscountType, PromotionCreate, Role};
    use sqlx::sqlite::SqlitePoolOptions;

    const DAY: i64 = 86_400_000;
    const NOW: i64 = 5 * DAY + 3_600_000;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    fn service(pool: &SqlitePool) -> ProductService {
        let promotions = PromotionService::new(pool.clone(), Clock::Fixed(NOW));
        ProductService::new(pool.clone(), Clock::Fixed(NOW), promotions)
    }

    async fn seed_user(pool: &SqlitePool, email: &str, role: &str) -> User {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO app_user (email, name, role, created_at, updated_at) VALUES (?1, ?2, ?3, 0, 0) RETURNING id",
        )
        .bind(email)
        .bind("Người dùng")
        .bind(role)
        .fetch_one(pool)
        .await
        .unwrap();
        User {
            id,
            email: email.to_string(),
            name: "Người dùng".to_string(),
            role: if role == "ADMIN" { Role::Admin } else { Role::Staff },
            created_at: 0,
            updated_at: 0,
        }
    }

    async fn seed_category(pool: &SqlitePool, name: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO category (name, created_at, updated_at) VALUES (?1, 0, 0) RETURNING id",
        )
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    async fn seed_active_category_campaign(pool: &SqlitePool, code: &str, category_id: i64) -> i64 {
        let data = PromotionCreate {
            code: code.to_string(),
            name: format!("Khuyến mãi {code}"),
            description: None,
            discount_type: DiscountType::Percentage,
            discount_value: 10.0,
            max_discount_value: None,
            min_order_value: None,
            max_order_value: None,
            apply_scope: ApplyScope::Category,
            category_ids: vec![category_id],
            product_ids: Vec::new(),
            start_date: Some(NOW - DAY),
            expiry_date: Some(NOW + 5 * DAY),
        };
        let detail = promotion::create(pool, &data, None).await.unwrap();
        promotion::set_status(pool, detail.promotion.id, ApprovalStatus::Approved, true)
            .await
            .unwrap();
        detail.promotion.id
    }

    fn make_create(name: &str, category_id: Option<i64>) -> ProductCreate {
        ProductCreate {
            name: name.to_string(),
            description: None,
            author: None,
            publisher: None,
            category_id,
            tax: Some(0.1),
            unit_price: 100_000.0,
            purchase_price: None,
            discount_value: None,
            price: None,
            stock_quantity: Some(10),
        }
    }

    #[tokio::test]
    async fn test_create_computes_sale_price() {
        let pool = test_pool().await;
        let svc = service(&pool);
        let staff = seed_user(&pool, "staff@store.vn", "STAFF").await;

        let created = svc.create(&staff, &make_create("Trà sữa", None)).await.unwrap();
        assert_eq!(created.status, ProductStatus::PendingApproval);
        assert_eq!(created.price, 110_000.0);
        assert_eq!(created.submitted_by, Some(staff.id));

        // Explicit override wins over the computed price
        let mut data = make_create("Sách", None);
        data.price = Some(95_000.0);
        let overridden = svc.create(&staff, &data).await.unwrap();
        assert_eq!(overridden.price, 95_000.0);
    }

    #[tokio::test]
    async fn test_create_validates_inputs() {
        let pool = test_pool().await;
        let svc = service(&pool);
        let staff = seed_user(&pool, "staff@store.vn", "STAFF").await;

        let mut negative = make_create("Trà sữa", None);
        negative.unit_price = -1.0;
        let err = svc.create(&staff, &negative).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);

        let orphan = make_create("Trà sữa", Some(9_999));
        let err = svc.create(&staff, &orphan).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::CategoryNotFound);
    }

    #[tokio::test]
    async fn test_update_recomputes_price_from_inputs() {
        let pool = test_pool().await;
        let svc = service(&pool);
        let staff = seed_user(&pool, "staff@store.vn", "STAFF").await;
        let created = svc.create(&staff, &make_create("Trà sữa", None)).await.unwrap();

        let updated = svc
            .update(
                &staff,
                created.id,
                &ProductUpdate {
                    unit_price: Some(200_000.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.unit_price, 200_000.0);
        assert_eq!(updated.price, 220_000.0);

        // An explicit price shuts the recomputation off
        let pinned = svc
            .update(
                &staff,
                created.id,
                &ProductUpdate {
                    unit_price: Some(50_000.0),
                    price: Some(150_000.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(pinned.price, 150_000.0);
    }

    #[tokio::test]
    async fn test_update_requires_owner_or_admin() {
        let pool = test_pool().await;
        let svc = service(&pool);
        let staff = seed_user(&pool, "staff@store.vn", "STAFF").await;
        let other = seed_user(&pool, "other@store.vn", "STAFF").await;
        let admin = seed_user(&pool, "admin@store.vn", "ADMIN").await;
        let created = svc.create(&staff, &make_create("Trà sữa", None)).await.unwrap();

        let rename = ProductUpdate {
            name: Some("Trà sữa trân châu".to_string()),
            ..Default::default()
        };
        let err = svc.update(&other, created.id, &rename).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);

        let renamed = svc.update(&admin, created.id, &rename).await.unwrap();
        assert_eq!(renamed.name, "Trà sữa trân châu");
    }

    #[tokio::test]
    async fn test_update_promotion_pointer() {
        let pool = test_pool().await;
        let svc = service(&pool);
        let staff = seed_user(&pool, "staff@store.vn", "STAFF").await;
        let drinks = seed_category(&pool, "Đồ uống").await;
        let campaign = seed_active_category_campaign(&pool, "GIAM10", drinks).await;
        let created = svc.create(&staff, &make_create("Trà sữa", None)).await.unwrap();

        let err = svc
            .update(
                &staff,
                created.id,
                &ProductUpdate {
                    promotion_id: Some(9_999),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PromotionNotFound);

        let attached = svc
            .update(
                &staff,
                created.id,
                &ProductUpdate {
                    promotion_id: Some(campaign),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(attached.promotion_id, Some(campaign));

        let detached = svc
            .update(
                &staff,
                created.id,
                &ProductUpdate {
                    promotion_id: Some(0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(detached.promotion_id, None);
    }

    #[tokio::test]
    async fn test_approve_auto_applies_category_campaign() {
        let pool = test_pool().await;
        let svc = service(&pool);
        let staff = seed_user(&pool, "staff@store.vn", "STAFF").await;
        let admin = seed_user(&pool, "admin@store.vn", "ADMIN").await;
        let drinks = seed_category(&pool, "Đồ uống").await;
        let campaign = seed_active_category_campaign(&pool, "GIAM10", drinks).await;

        let created = svc
            .create(&staff, &make_create("Trà sữa", Some(drinks)))
            .await
            .unwrap();
        let approved = svc
            .review(&admin, created.id, ProductAction::Approve, None)
            .await
            .unwrap();

        assert_eq!(approved.status, ProductStatus::Approved);
        assert_eq!(approved.approved_by, Some(admin.id));
        assert_eq!(approved.promotion_id, Some(campaign));
        assert_eq!(approved.discount_value, 11_000.0);
        assert_eq!(approved.price, 99_000.0);
    }

    #[tokio::test]
    async fn test_review_reject_and_reenable() {
        let pool = test_pool().await;
        let svc = service(&pool);
        let staff = seed_user(&pool, "staff@store.vn", "STAFF").await;
        let admin = seed_user(&pool, "admin@store.vn", "ADMIN").await;
        let created = svc.create(&staff, &make_create("Trà sữa", None)).await.unwrap();

        let err = svc
            .review(&staff, created.id, ProductAction::Approve, None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::AdminRequired);

        let rejected = svc
            .review(&admin, created.id, ProductAction::Reject, Some("Thiếu mô tả"))
            .await
            .unwrap();
        assert_eq!(rejected.status, ProductStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("Thiếu mô tả"));

        let disabled = svc
            .review(&admin, created.id, ProductAction::Disable, None)
            .await
            .unwrap();
        assert_eq!(disabled.status, ProductStatus::Disabled);

        let enabled = svc
            .review(&admin, created.id, ProductAction::Enable, None)
            .await
            .unwrap();
        assert_eq!(enabled.status, ProductStatus::Approved);
        assert_eq!(enabled.rejection_reason, None);
    }

    #[tokio::test]
    async fn test_restock_gates_and_tracking() {
        let pool = test_pool().await;
        let svc = service(&pool);
        let staff = seed_user(&pool, "staff@store.vn", "STAFF").await;
        let other = seed_user(&pool, "other@store.vn", "STAFF").await;

        let mut data = make_create("Trà sữa", None);
        data.stock_quantity = None;
        let created = svc.create(&staff, &data).await.unwrap();

        let err = svc.restock(&staff, created.id, 0).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        let err = svc.restock(&other, created.id, 5).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);

        let restocked = svc.restock(&staff, created.id, 5).await.unwrap();
        assert_eq!(restocked.stock_quantity, Some(5));
    }

    #[tokio::test]
    async fn test_delete_requires_owner() {
        let pool = test_pool().await;
        let svc = service(&pool);
        let staff = seed_user(&pool, "staff@store.vn", "STAFF").await;
        let other = seed_user(&pool, "other@store.vn", "STAFF").await;
        let created = svc.create(&staff, &make_create("Trà sữa", None)).await.unwrap();

        let err = svc.delete(&other, created.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);

        svc.delete(&staff, created.id).await.unwrap();
        let err = svc.get(created.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ProductNotFound);
    }
}
