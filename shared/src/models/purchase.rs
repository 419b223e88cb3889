//! Purchase Model

use serde::{Deserialize, Serialize};

/// Purchase status enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum PurchaseStatus {
    Pending,
    Completed,
    Cancelled,
}

/// Purchase entity. Immutable once completed.
///
/// `member_id` is nullable: guest purchases exist but never participate
/// in compensation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Purchase {
    pub id: i64,
    pub member_id: Option<i64>,
    pub product_id: i64,
    pub quantity: i64,
    /// Monetary total.
    pub amount: f64,
    /// Point-volume total.
    pub pv_amount: f64,
    pub status: PurchaseStatus,
    pub created_at: i64,
}
