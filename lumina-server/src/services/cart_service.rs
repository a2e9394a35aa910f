//! Cart Pricing Service
//!
//! One cart per user, created on demand. Every mutation ends with a
//! full recalculation: line snapshots refresh from the current product
//! sale prices, the applied voucher is silently re-validated, and all
//! totals land in one transaction. Whole-unit rounding happens here and
//! nowhere below.

use std::collections::{HashMap, HashSet};

use shared::models::{
    ApplyScope, ApprovalStatus, Cart, CartDetail, CartItem, Product, User, Voucher,
};
use sqlx::SqlitePool;
use tracing::info;

use crate::db::repository::{cart as cart_repo, product, user as user_repo, voucher};
use crate::pricing::calculator;
use crate::utils::money::round_unit;
use crate::utils::time::millis_to_date;
use crate::utils::{AppError, AppResult, Clock, ErrorCode};

/// Cart pricing service
#[derive(Clone)]
pub struct CartService {
    pool: SqlitePool,
    clock: Clock,
}

impl CartService {
    pub fn new(pool: SqlitePool, clock: Clock) -> Self {
        Self { pool, clock }
    }

    // ── Cart mutations ───────────────────────────────────────

    /// The user's cart with fresh totals, created on first access.
    pub async fn get_cart(&self, user: &User) -> AppResult<CartDetail> {
        let cart = self.get_or_create(user.id).await?;
        let updated = self.recalculate(&cart).await?;
        self.detail(updated.id).await
    }

    /// Add units of a product. An existing line keeps its snapshot
    /// price and grows in quantity; a new line snapshots the rounded
    /// sale price.
    pub async fn add_item(
        &self,
        user: &User,
        product_id: i64,
        quantity: i64,
    ) -> AppResult<CartDetail> {
        // 1. Quantity and product gates
        if quantity <= 0 {
            return Err(out_of_stock());
        }
        let target = product::get(&self.pool, product_id).await?.ok_or_else(|| {
            AppError::with_message(ErrorCode::ProductNotFound, "Sản phẩm không tồn tại")
        })?;
        if let Some(stock) = target.stock_quantity
            && stock <= 0
        {
            return Err(out_of_stock());
        }

        let cart = self.get_or_create(user.id).await?;

        // 2. Grow an existing line or snapshot a new one
        let existing = cart_repo::find_item_by_product(&self.pool, cart.id, product_id).await?;
        let (line_quantity, unit_price) = match &existing {
            Some(line) => (line.quantity + quantity, line.unit_price),
            None => (quantity, round_unit(target.price)),
        };

        // 3. Tracked stock must cover the whole line
        if let Some(stock) = target.stock_quantity
            && line_quantity > stock
        {
            return Err(out_of_stock());
        }

        let final_price = line_quantity as f64 * unit_price;
        match existing {
            Some(line) => {
                cart_repo::set_item_quantity(&self.pool, line.id, line_quantity, final_price)
                    .await?;
            }
            None => {
                cart_repo::insert_item(
                    &self.pool,
                    cart.id,
                    product_id,
                    line_quantity,
                    unit_price,
                    final_price,
                )
                .await?;
            }
        }

        // 4. Full recalculation
        let updated = self.recalculate(&cart).await?;
        self.detail(updated.id).await
    }

    /// Set a line's quantity, keeping its snapshot price.
    pub async fn update_item_quantity(
        &self,
        user: &User,
        item_id: i64,
        quantity: i64,
    ) -> AppResult<CartDetail> {
        if quantity <= 0 {
            return Err(out_of_stock());
        }

        let cart = self.get_or_create(user.id).await?;
        let line = self.require_own_item(&cart, item_id).await?;

        // Tracked stock gates the new quantity
        if let Some(target) = product::get(&self.pool, line.product_id).await?
            && let Some(stock) = target.stock_quantity
            && quantity > stock
        {
            return Err(out_of_stock());
        }

        cart_repo::set_item_quantity(
            &self.pool,
            line.id,
            quantity,
            quantity as f64 * line.unit_price,
        )
        .await?;

        let updated = self.recalculate(&cart).await?;
        self.detail(updated.id).await
    }

    /// Remove a line the caller owns.
    pub async fn remove_item(&self, user: &User, item_id: i64) -> AppResult<CartDetail> {
        let cart = self.get_or_create(user.id).await?;
        let line = self.require_own_item(&cart, item_id).await?;
        cart_repo::delete_item(&self.pool, line.id).await?;

        let updated = self.recalculate(&cart).await?;
        self.detail(updated.id).await
    }

    // ── Voucher redemption ───────────────────────────────────

    /// Apply a voucher code to the cart. Unlike recalculation, every
    /// failure here is surfaced to the caller.
    pub async fn apply_voucher(&self, user: &User, code: &str) -> AppResult<CartDetail> {
        // 1. A voucher needs lines to discount
        let cart = self.get_or_create(user.id).await?;
        if cart_repo::items(&self.pool, cart.id).await?.is_empty() {
            return Err(AppError::with_message(
                ErrorCode::CartItemNotFound,
                "Giỏ hàng trống, không thể áp dụng voucher",
            ));
        }

        // 2. Unknown, inactive, unapproved and out-of-window codes all
        //    read as "not found"
        let entry = voucher::find_by_code(&self.pool, code)
            .await?
            .filter(|v| {
                v.is_active && v.status == ApprovalStatus::Approved && self.in_window(v)
            })
            .ok_or_else(|| {
                AppError::with_message(
                    ErrorCode::VoucherNotFound,
                    "Voucher không tồn tại hoặc không còn hiệu lực",
                )
            })?;

        // 3. One redemption per user
        if user_repo::has_used_voucher(&self.pool, user.id, entry.id).await? {
            return Err(AppError::with_message(
                ErrorCode::VoucherAlreadyUsed,
                "Bạn đã sử dụng voucher này",
            ));
        }

        // 4. Fresh totals before the bounds checks
        let cart = self.recalculate(&cart).await?;
        let applicable = self.applicable_subtotal(&cart, &entry).await?;

        // 5. Order-value bounds
        if let Some(min) = entry.min_order_value
            && min > 0.0
            && applicable < min
        {
            return Err(AppError::with_message(
                ErrorCode::VoucherMinOrderNotMet,
                format!(
                    "Voucher yêu cầu đơn hàng tối thiểu {min:.0} VND, nhưng đơn hàng hiện tại chỉ có {applicable:.0} VND"
                ),
            ));
        }
        if let Some(max) = entry.max_order_value
            && max > 0.0
            && applicable > max
        {
            return Err(AppError::with_message(
                ErrorCode::VoucherMaxOrderExceeded,
                "Giá trị đơn hàng vượt quá giá trị tối đa cho phép của voucher",
            ));
        }

        // 6. Scoped vouchers must cover at least one line
        if entry.apply_scope != ApplyScope::Order && applicable <= 0.0 {
            return Err(AppError::with_message(
                ErrorCode::VoucherScopeEmpty,
                "Không có sản phẩm nào trong giỏ hàng phù hợp với phạm vi áp dụng của voucher",
            ));
        }

        // 7. Store the code, the rounded discount and the new total
        let discount = calculator::voucher_discount(
            entry.discount_type,
            entry.discount_value,
            entry.max_discount_value,
            applicable,
        );
        let mut updated = cart;
        updated.applied_voucher_code = Some(entry.code.clone());
        updated.voucher_discount = discount;
        updated.total_amount = round_unit((updated.subtotal - discount).max(0.0));
        cart_repo::write_back(&self.pool, &updated, &[], &[]).await?;
        info!(cart_id = updated.id, voucher = %entry.code, discount, "voucher applied to cart");

        self.detail(updated.id).await
    }

    /// Drop the applied voucher.
    pub async fn clear_voucher(&self, user: &User) -> AppResult<CartDetail> {
        let cart = self.get_or_create(user.id).await?;
        let updated = self.drop_voucher_and_recalculate(cart).await?;
        self.detail(updated.id).await
    }

    // ── Order-finalization hooks ─────────────────────────────

    /// Drop the voucher from a user's cart, if any. No-op without one.
    pub async fn clear_voucher_for_user(&self, user_id: i64) -> AppResult<()> {
        let Some(cart) = cart_repo::find_by_user(&self.pool, user_id).await? else {
            return Ok(());
        };
        self.drop_voucher_and_recalculate(cart).await?;
        Ok(())
    }

    /// Remove ordered lines from a user's cart. Lines belonging to a
    /// different cart are ignored.
    pub async fn remove_items_for_order(
        &self,
        user_id: i64,
        item_ids: &[i64],
    ) -> AppResult<()> {
        if item_ids.is_empty() {
            return Ok(());
        }
        let Some(cart) = cart_repo::find_by_user(&self.pool, user_id).await? else {
            return Ok(());
        };

        let lines = cart_repo::items(&self.pool, cart.id).await?;
        let owned: Vec<i64> = lines
            .iter()
            .map(|line| line.id)
            .filter(|id| item_ids.contains(id))
            .collect();
        cart_repo::delete_items(&self.pool, &owned).await?;

        self.recalculate(&cart).await?;
        Ok(())
    }

    // ── Recalculation ────────────────────────────────────────

    /// Recompute line snapshots, the applied voucher and all totals,
    /// then persist everything in one transaction. Idempotent on an
    /// unchanged cart.
    async fn recalculate(&self, cart: &Cart) -> AppResult<Cart> {
        // 1. Re-snapshot lines from current sale prices; drop orphans
        let lines = cart_repo::items(&self.pool, cart.id).await?;
        let product_ids: Vec<i64> = lines.iter().map(|line| line.product_id).collect();
        let products: HashMap<i64, Product> = product::find_by_ids(&self.pool, &product_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut removed = Vec::new();
        let mut fresh: Vec<CartItem> = Vec::with_capacity(lines.len());
        for mut line in lines {
            match products.get(&line.product_id) {
                Some(item) => {
                    line.unit_price = round_unit(item.price);
                    line.final_price = line.quantity as f64 * line.unit_price;
                    fresh.push(line);
                }
                None => removed.push(line.id),
            }
        }

        // 2. Subtotal over the surviving lines
        let subtotal = round_unit(fresh.iter().map(|line| line.final_price).sum());

        // 3. Re-validate the applied voucher silently; any failure
        //    clears it without surfacing an error
        let mut applied_code = cart.applied_voucher_code.clone();
        let mut voucher_discount = 0.0;
        if let Some(code) = applied_code.clone() {
            match self.revalidate_voucher(&code, &fresh, subtotal).await? {
                Some(discount) => voucher_discount = discount,
                None => applied_code = None,
            }
        }

        // 4. An empty cart keeps no voucher
        if subtotal <= 0.0 {
            applied_code = None;
            voucher_discount = 0.0;
        }

        // 5. Persist lines and totals atomically
        let mut updated = cart.clone();
        updated.subtotal = subtotal;
        updated.voucher_discount = voucher_discount;
        updated.total_amount = round_unit((subtotal - voucher_discount).max(0.0));
        updated.applied_voucher_code = applied_code;
        cart_repo::write_back(&self.pool, &updated, &fresh, &removed).await?;
        Ok(updated)
    }

    /// `Some(discount)` when the applied voucher still holds, `None`
    /// when it must be dropped.
    async fn revalidate_voucher(
        &self,
        code: &str,
        lines: &[CartItem],
        subtotal: f64,
    ) -> AppResult<Option<f64>> {
        let Some(entry) = voucher::find_by_code(&self.pool, code).await? else {
            return Ok(None);
        };
        if !entry.is_active || entry.status != ApprovalStatus::Approved || !self.in_window(&entry)
        {
            return Ok(None);
        }

        let applicable = self
            .applicable_subtotal_for_lines(&entry, lines, subtotal)
            .await?;
        if let Some(min) = entry.min_order_value
            && min > 0.0
            && applicable < min
        {
            return Ok(None);
        }
        if let Some(max) = entry.max_order_value
            && max > 0.0
            && applicable > max
        {
            return Ok(None);
        }

        Ok(Some(calculator::voucher_discount(
            entry.discount_type,
            entry.discount_value,
            entry.max_discount_value,
            applicable,
        )))
    }

    async fn applicable_subtotal(&self, cart: &Cart, entry: &Voucher) -> AppResult<f64> {
        let lines = cart_repo::items(&self.pool, cart.id).await?;
        self.applicable_subtotal_for_lines(entry, &lines, cart.subtotal)
            .await
    }

    /// ORDER scope takes the full subtotal; scoped vouchers sum only
    /// the lines their target sets cover. Rounded to whole units.
    async fn applicable_subtotal_for_lines(
        &self,
        entry: &Voucher,
        lines: &[CartItem],
        subtotal: f64,
    ) -> AppResult<f64> {
        let matched: f64 = match entry.apply_scope {
            ApplyScope::Order => return Ok(round_unit(subtotal)),
            ApplyScope::Product => {
                let targets: HashSet<i64> = voucher::product_ids(&self.pool, entry.id)
                    .await?
                    .into_iter()
                    .collect();
                lines
                    .iter()
                    .filter(|line| targets.contains(&line.product_id))
                    .map(|line| line.final_price)
                    .sum()
            }
            ApplyScope::Category => {
                let targets: HashSet<i64> = voucher::category_ids(&self.pool, entry.id)
                    .await?
                    .into_iter()
                    .collect();
                let product_ids: Vec<i64> = lines.iter().map(|line| line.product_id).collect();
                let products: HashMap<i64, Product> =
                    product::find_by_ids(&self.pool, &product_ids)
                        .await?
                        .into_iter()
                        .map(|p| (p.id, p))
                        .collect();
                lines
                    .iter()
                    .filter(|line| {
                        products
                            .get(&line.product_id)
                            .and_then(|p| p.category_id)
                            .is_some_and(|category| targets.contains(&category))
                    })
                    .map(|line| line.final_price)
                    .sum()
            }
        };
        Ok(round_unit(matched))
    }

    /// Date-granularity redemption window check
    fn in_window(&self, entry: &Voucher) -> bool {
        let today = self.clock.today();
        let started = entry
            .start_date
            .is_none_or(|start| millis_to_date(start) <= today);
        let not_expired = entry
            .expiry_date
            .is_none_or(|expiry| millis_to_date(expiry) >= today);
        started && not_expired
    }

    async fn drop_voucher_and_recalculate(&self, cart: Cart) -> AppResult<Cart> {
        let mut cleared = cart;
        cleared.applied_voucher_code = None;
        cleared.voucher_discount = 0.0;
        self.recalculate(&cleared).await
    }

    async fn get_or_create(&self, user_id: i64) -> AppResult<Cart> {
        if let Some(cart) = cart_repo::find_by_user(&self.pool, user_id).await? {
            return Ok(cart);
        }
        Ok(cart_repo::create_for_user(&self.pool, user_id).await?)
    }

    async fn require_own_item(&self, cart: &Cart, item_id: i64) -> AppResult<CartItem> {
        cart_repo::find_item(&self.pool, item_id)
            .await?
            .filter(|line| line.cart_id == cart.id)
            .ok_or_else(|| {
                AppError::with_message(ErrorCode::CartItemNotFound, "Sản phẩm không có trong giỏ hàng")
            })
    }

    async fn detail(&self, cart_id: i64) -> AppResult<CartDetail> {
        let cart = cart_repo::get(&self.pool, cart_id).await?.ok_or_else(|| {
            AppError::with_message(ErrorCode::NotFound, "Giỏ hàng không tồn tại")
        })?;
        let items = cart_repo::items(&self.pool, cart_id).await?;
        Ok(CartDetail { cart, items })
    }
}

fn out_of_stock() -> AppError {
    AppError::with_message(ErrorCode::ProductOutOfStock, "Sản phẩm không đủ hàng trong kho")
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{DiscountType, ProductCreate, Role, VoucherCreate};
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

    fn service(pool: &SqlitePool) -> CartService {
        CartService::new(pool.clone(), Clock::Fixed(NOW))
    }

    async fn seed_customer(pool: &SqlitePool, email: &str) -> User {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO app_user (email, name, role, created_at, updated_at) VALUES (?1, 'Khách', 'CUSTOMER', 0, 0) RETURNING id",
        )
        .bind(email)
        .fetch_one(pool)
        .await
        .unwrap();
        User {
            id,
            email: email.to_string(),
            name: "Khách".to_string(),
            role: Role::Customer,
            created_at: 0,
            updated_at: 0,
        }
    }

    async fn seed_product(
        pool: &SqlitePool,
        name: &str,
        price: f64,
        stock: Option<i64>,
        category_id: Option<i64>,
    ) -> i64 {
        let data = ProductCreate {
            name: name.to_string(),
            description: None,
            author: None,
            publisher: None,
            category_id,
            tax: None,
            unit_price: price,
            purchase_price: None,
            discount_value: None,
            price: None,
            stock_quantity: stock,
        };
        let created = product::create(pool, &data, price, None).await.unwrap();
        sqlx::query("UPDATE product SET status = 'APPROVED' WHERE id = ?")
            .bind(created.id)
            .execute(pool)
            .await
            .unwrap();
        created.id
    }

    async fn seed_active_voucher(pool: &SqlitePool, data: &VoucherCreate) -> Voucher {
        let detail = voucher::create(pool, data, None).await.unwrap();
        voucher::set_approval(
            pool,
            detail.voucher.id,
            ApprovalStatus::Approved,
            true,
            1,
            NOW,
            None,
        )
        .await
        .unwrap();
        voucher::get(pool, detail.voucher.id).await.unwrap().unwrap()
    }

    fn make_voucher(code: &str, scope: ApplyScope) -> VoucherCreate {
        VoucherCreate {
            code: code.to_string(),
            name: format!("Voucher {code}"),
            description: None,
            discount_type: DiscountType::Percentage,
            discount_value: 10.0,
            max_discount_value: None,
            min_order_value: None,
            max_order_value: None,
            apply_scope: scope,
            category_ids: Vec::new(),
            product_ids: Vec::new(),
            start_date: None,
            expiry_date: None,
            usage_limit: None,
        }
    }

    #[tokio::test]
    async fn test_order_voucher_discounts_cart() {
        let pool = test_pool().await;
        let svc = service(&pool);
        let customer = seed_customer(&pool, "khach@store.vn").await;
        let item = seed_product(&pool, "Trà sữa", 99_000.0, Some(10), None).await;
        seed_active_voucher(&pool, &make_voucher("SAVE10", ApplyScope::Order)).await;

        let cart = svc.add_item(&customer, item, 1).await.unwrap();
        assert_eq!(cart.cart.subtotal, 99_000.0);
        assert_eq!(cart.cart.total_amount, 99_000.0);

        let discounted = svc.apply_voucher(&customer, "SAVE10").await.unwrap();
        assert_eq!(discounted.cart.voucher_discount, 9_900.0);
        assert_eq!(discounted.cart.total_amount, 89_100.0);
        assert_eq!(
            discounted.cart.applied_voucher_code.as_deref(),
            Some("SAVE10")
        );
    }

    #[tokio::test]
    async fn test_min_order_gate_leaves_cart_untouched() {
        let pool = test_pool().await;
        let svc = service(&pool);
        let customer = seed_customer(&pool, "khach@store.vn").await;
        let item = seed_product(&pool, "Trà sữa", 99_000.0, Some(10), None).await;

        let mut data = make_voucher("MIN200", ApplyScope::Order);
        data.min_order_value = Some(200_000.0);
        seed_active_voucher(&pool, &data).await;

        svc.add_item(&customer, item, 1).await.unwrap();
        let err = svc.apply_voucher(&customer, "MIN200").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::VoucherMinOrderNotMet);
        assert!(err.message.contains("200000"));

        let cart = svc.get_cart(&customer).await.unwrap();
        assert_eq!(cart.cart.voucher_discount, 0.0);
        assert_eq!(cart.cart.total_amount, 99_000.0);
        assert_eq!(cart.cart.applied_voucher_code, None);
    }

    #[tokio::test]
    async fn test_apply_voucher_failure_order() {
        let pool = test_pool().await;
        let svc = service(&pool);
        let customer = seed_customer(&pool, "khach@store.vn").await;

        // Empty cart wins over everything else
        let err = svc.apply_voucher(&customer, "SAVE10").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::CartItemNotFound);

        let item = seed_product(&pool, "Trà sữa", 99_000.0, Some(10), None).await;
        svc.add_item(&customer, item, 1).await.unwrap();

        // Unknown code
        let err = svc.apply_voucher(&customer, "KHONGCO").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::VoucherNotFound);

        // Pending voucher reads as not found
        voucher::create(&pool, &make_voucher("CHODUYET", ApplyScope::Order), None)
            .await
            .unwrap();
        let err = svc.apply_voucher(&customer, "CHODUYET").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::VoucherNotFound);

        // Out-of-window voucher reads as not found
        let mut expired = make_voucher("HETHAN", ApplyScope::Order);
        expired.start_date = Some(NOW - 20 * DAY);
        expired.expiry_date = Some(NOW - 10 * DAY);
        seed_active_voucher(&pool, &expired).await;
        let err = svc.apply_voucher(&customer, "HETHAN").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::VoucherNotFound);

        // Redeemed voucher is called out explicitly
        let redeemed = seed_active_voucher(&pool, &make_voucher("DADUNG", ApplyScope::Order)).await;
        user_repo::mark_voucher_used(&pool, customer.id, redeemed.id, NOW)
            .await
            .unwrap();
        let err = svc.apply_voucher(&customer, "DADUNG").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::VoucherAlreadyUsed);
    }

    #[tokio::test]
    async fn test_recalculate_silently_drops_dead_voucher() {
        let pool = test_pool().await;
        let svc = service(&pool);
        let customer = seed_customer(&pool, "khach@store.vn").await;
        let item = seed_product(&pool, "Trà sữa", 99_000.0, Some(10), None).await;
        let entry = seed_active_voucher(&pool, &make_voucher("SAVE10", ApplyScope::Order)).await;

        svc.add_item(&customer, item, 1).await.unwrap();
        svc.apply_voucher(&customer, "SAVE10").await.unwrap();

        // The voucher dies after application
        voucher::set_status(&pool, entry.id, ApprovalStatus::Disabled, false)
            .await
            .unwrap();

        let cart = svc.get_cart(&customer).await.unwrap();
        assert_eq!(cart.cart.applied_voucher_code, None);
        assert_eq!(cart.cart.voucher_discount, 0.0);
        assert_eq!(cart.cart.total_amount, 99_000.0);
    }

    #[tokio::test]
    async fn test_category_scope_limits_applicable_subtotal() {
        let pool = test_pool().await;
        let svc = service(&pool);
        let customer = seed_customer(&pool, "khach@store.vn").await;
        let drinks = sqlx::query_scalar::<_, i64>(
            "INSERT INTO category (name, created_at, updated_at) VALUES ('Đồ uống', 0, 0) RETURNING id",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        let in_scope = seed_product(&pool, "Trà sữa", 50_000.0, Some(10), Some(drinks)).await;
        let out_of_scope = seed_product(&pool, "Sách", 100_000.0, Some(10), None).await;

        let mut data = make_voucher("DOUONG", ApplyScope::Category);
        data.category_ids = vec![drinks];
        seed_active_voucher(&pool, &data).await;

        svc.add_item(&customer, in_scope, 2).await.unwrap();
        svc.add_item(&customer, out_of_scope, 1).await.unwrap();

        let cart = svc.apply_voucher(&customer, "DOUONG").await.unwrap();
        // 10% of the 100_000 in-scope portion, not of the 200_000 subtotal
        assert_eq!(cart.cart.subtotal, 200_000.0);
        assert_eq!(cart.cart.voucher_discount, 10_000.0);
        assert_eq!(cart.cart.total_amount, 190_000.0);
    }

    #[tokio::test]
    async fn test_scoped_voucher_with_no_matching_lines_rejected() {
        let pool = test_pool().await;
        let svc = service(&pool);
        let customer = seed_customer(&pool, "khach@store.vn").await;
        let in_cart = seed_product(&pool, "Trà sữa", 50_000.0, Some(10), None).await;
        let targeted = seed_product(&pool, "Sách", 100_000.0, Some(10), None).await;

        let mut data = make_voucher("SANPHAM", ApplyScope::Product);
        data.product_ids = vec![targeted];
        seed_active_voucher(&pool, &data).await;

        svc.add_item(&customer, in_cart, 1).await.unwrap();
        let err = svc.apply_voucher(&customer, "SANPHAM").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::VoucherScopeEmpty);
    }

    #[tokio::test]
    async fn test_stock_gates_add_and_update() {
        let pool = test_pool().await;
        let svc = service(&pool);
        let customer = seed_customer(&pool, "khach@store.vn").await;
        let item = seed_product(&pool, "Trà sữa", 50_000.0, Some(3), None).await;

        let err = svc.add_item(&customer, item, 0).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ProductOutOfStock);

        let err = svc.add_item(&customer, item, 4).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ProductOutOfStock);

        let cart = svc.add_item(&customer, item, 2).await.unwrap();
        let line_id = cart.items[0].id;

        // Growing past the stock cap fails, whether by add or update
        let err = svc.add_item(&customer, item, 2).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ProductOutOfStock);
        let err = svc
            .update_item_quantity(&customer, line_id, 4)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ProductOutOfStock);

        // Untracked stock never gates
        let untracked = seed_product(&pool, "Sách", 10_000.0, None, None).await;
        svc.add_item(&customer, untracked, 1_000).await.unwrap();
    }

    #[tokio::test]
    async fn test_item_ownership_enforced() {
        let pool = test_pool().await;
        let svc = service(&pool);
        let customer = seed_customer(&pool, "khach@store.vn").await;
        let other = seed_customer(&pool, "khac@store.vn").await;
        let item = seed_product(&pool, "Trà sữa", 50_000.0, Some(10), None).await;

        let cart = svc.add_item(&customer, item, 1).await.unwrap();
        let line_id = cart.items[0].id;

        let err = svc.remove_item(&other, line_id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::CartItemNotFound);
        let err = svc
            .update_item_quantity(&other, line_id, 2)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::CartItemNotFound);
    }

    #[tokio::test]
    async fn test_order_hooks_tolerate_missing_cart() {
        let pool = test_pool().await;
        let svc = service(&pool);
        let customer = seed_customer(&pool, "khach@store.vn").await;

        // No cart yet: both hooks are no-ops
        svc.clear_voucher_for_user(customer.id).await.unwrap();
        svc.remove_items_for_order(customer.id, &[1, 2]).await.unwrap();

        let item = seed_product(&pool, "Trà sữa", 50_000.0, Some(10), None).await;
        let cart = svc.add_item(&customer, item, 2).await.unwrap();
        let line_id = cart.items[0].id;

        svc.remove_items_for_order(customer.id, &[line_id]).await.unwrap();
        let cart = svc.get_cart(&customer).await.unwrap();
        assert!(cart.items.is_empty());
        assert_eq!(cart.cart.subtotal, 0.0);
        assert_eq!(cart.cart.total_amount, 0.0);
    }

    #[tokio::test]
    async fn test_recalculate_follows_price_change() {
        let pool = test_pool().await;
        let svc = service(&pool);
        let customer = seed_customer(&pool, "khach@store.vn").await;
        let item = seed_product(&pool, "Trà sữa", 110_000.0, Some(10), None).await;

        svc.add_item(&customer, item, 2).await.unwrap();

        // A campaign reprices the product; the next read re-snapshots
        sqlx::query("UPDATE product SET price = 99000 WHERE id = ?")
            .bind(item)
            .execute(&pool)
            .await
            .unwrap();

        let cart = svc.get_cart(&customer).await.unwrap();
        assert_eq!(cart.items[0].unit_price, 99_000.0);
        assert_eq!(cart.items[0].final_price, 198_000.0);
        assert_eq!(cart.cart.subtotal, 198_000.0);
    }
}
