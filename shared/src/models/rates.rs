//! Compensation rate configuration models.
//!
//! These tables are a configuration surface consumed, not produced, by
//! the compensation core. Validation (duplicate resolution, tier overlap
//! detection) happens eagerly at load time in downline-server.

use serde::{Deserialize, Serialize};

/// Commission rate type enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum RateType {
    /// Fixed amount per qualifying new downline in the period.
    DirectReferral,
    /// Percentage per unilevel depth, applied to descendant purchase PV.
    LevelCommission,
    /// Percentage or fixed-per-PV-tier applied to the weaker binary leg.
    GroupVolume,
}

/// Bonus value type for group-volume rates and performance tiers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum BonusType {
    Percentage,
    Fixed,
}

/// Per-product, per-level rebate percentage.
///
/// Level 1 is the purchaser's immediate upline; higher levels walk
/// further up the chain. Unconfigured levels contribute zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct RebateConfig {
    pub id: i64,
    pub product_id: i64,
    pub level: i64,
    pub percentage: f64,
    pub is_active: bool,
    pub created_at: i64,
}

/// Typed commission rate row.
///
/// Field use depends on `rate_type`:
/// - `direct_referral`: `amount` is the fixed bonus per qualifying sign-up.
/// - `level_commission`: `level` + `percentage`.
/// - `group_volume`: `bonus_type` percentage (`percentage`) or fixed
///   (`tier_size` PV per tier, `amount` per tier).
///
/// Only one active row per (type, level) is honored; duplicates resolve
/// most-recently-created-wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct CommissionRate {
    pub id: i64,
    pub rate_type: RateType,
    pub level: Option<i64>,
    pub bonus_type: Option<BonusType>,
    pub percentage: Option<f64>,
    pub amount: Option<f64>,
    pub tier_size: Option<f64>,
    pub is_active: bool,
    pub created_at: i64,
}

/// Performance bonus tier. Tiers must not overlap; `max_sales` null means
/// open-ended.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct PerformanceTier {
    pub id: i64,
    pub min_sales: f64,
    pub max_sales: Option<f64>,
    pub bonus_type: BonusType,
    pub value: f64,
    pub is_active: bool,
    pub created_at: i64,
}
