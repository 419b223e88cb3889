//! Purchase repository
//!
//! Inbound boundary for completed purchases plus the settlement-facing
//! window queries.

use shared::models::{Product, Purchase};
use sqlx::SqlitePool;

use crate::comp::money;
use crate::error::{AppError, AppResult};

/// Slim purchase row used by the PV aggregator. Only completed,
/// member-owned purchases ever reach this shape.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CompletedPurchase {
    pub id: i64,
    pub member_id: i64,
    pub product_id: i64,
    pub pv_amount: f64,
}

pub async fn find_product(pool: &SqlitePool, product_id: i64) -> AppResult<Product> {
    let row: Option<Product> = sqlx::query_as(
        "SELECT id, name, price, pv, is_active, created_at FROM product WHERE id = ? AND is_active = 1",
    )
    .bind(product_id)
    .fetch_optional(pool)
    .await?;
    row.ok_or(AppError::ProductNotFound(product_id))
}

/// Record a completed purchase (called by the external checkout flow).
///
/// `member_id` is nullable: guest purchases are stored for the ledger but
/// never contribute to compensation. PV and amount derive from the
/// product's configured values.
pub async fn record_completed_purchase(
    pool: &SqlitePool,
    member_id: Option<i64>,
    product_id: i64,
    quantity: i64,
    unit_amount: Option<f64>,
    occurred_at: Option<i64>,
) -> AppResult<Purchase> {
    if quantity < 1 {
        return Err(AppError::InvalidArgument(format!(
            "quantity must be positive, got {quantity}"
        )));
    }
    let product = find_product(pool, product_id).await?;
    if let Some(mid) = member_id {
        crate::db::member::require_active(pool, mid).await?;
    }

    let unit = unit_amount.unwrap_or(product.price);
    money::require_finite(unit, "unit_amount")?;
    if unit < 0.0 {
        return Err(AppError::InvalidArgument(format!(
            "unit_amount must be non-negative, got {unit}"
        )));
    }

    let qty = money::to_decimal(quantity as f64);
    let amount = money::round(money::to_decimal(unit) * qty);
    let pv_amount = money::round(money::to_decimal(product.pv) * qty);

    let id = shared::util::snowflake_id();
    let created_at = occurred_at.unwrap_or_else(shared::util::now_millis);
    sqlx::query(
        "INSERT INTO purchase (id, member_id, product_id, quantity, amount, pv_amount, status, created_at) VALUES (?, ?, ?, ?, ?, ?, 'completed', ?)",
    )
    .bind(id)
    .bind(member_id)
    .bind(product_id)
    .bind(quantity)
    .bind(money::to_f64(amount))
    .bind(money::to_f64(pv_amount))
    .bind(created_at)
    .execute(pool)
    .await?;

    let row: Purchase = sqlx::query_as(
        "SELECT id, member_id, product_id, quantity, amount, pv_amount, status, created_at FROM purchase WHERE id = ?",
    )
    .bind(id)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// All completed, member-owned purchases inside `[start, end]`. One query
/// per settlement run; the PV aggregator indexes these in memory.
pub async fn completed_in_window(
    pool: &SqlitePool,
    start: i64,
    end: i64,
) -> AppResult<Vec<CompletedPurchase>> {
    if end < start {
        return Err(AppError::InvalidArgument(format!(
            "invalid range: end {end} < start {start}"
        )));
    }
    let rows: Vec<CompletedPurchase> = sqlx::query_as(
        "SELECT id, member_id, product_id, pv_amount FROM purchase WHERE status = 'completed' AND member_id IS NOT NULL AND created_at >= ? AND created_at <= ? ORDER BY id",
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
