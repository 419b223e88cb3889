//! Monthly Performance Model

use serde::{Deserialize, Serialize};

/// One row per (member, year, month), upserted only by the settlement
/// processor. A non-null `settled_at` is the idempotency marker: the
/// period has been durably settled for this member and must never be
/// paid again.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct MonthlyPerformance {
    pub id: i64,
    pub member_id: i64,
    pub year: i64,
    pub month: i64,
    pub personal_pv: f64,
    pub left_leg_pv: f64,
    pub right_leg_pv: f64,
    pub total_group_pv: f64,
    pub direct_referral_bonus: f64,
    pub level_commissions: f64,
    pub group_volume_bonus: f64,
    pub performance_bonus: f64,
    pub total_earnings: f64,
    pub settled_at: Option<i64>,
}
