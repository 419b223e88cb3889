//! Member Model

use serde::{Deserialize, Serialize};

/// Member entity.
///
/// Carries two independent hierarchy relations over the same ID space:
/// the unilevel upline chain (`upline_id`) and the binary placement slots
/// (`left_child_id` / `right_child_id`). `sponsor_id` credits the referral
/// and may differ from `upline_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Member {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub upline_id: Option<i64>,
    pub sponsor_id: Option<i64>,
    pub left_child_id: Option<i64>,
    pub right_child_id: Option<i64>,
    /// Ordinal rank. Privilege semantics live outside this core.
    pub rank: i64,
    /// Adjusted only by ledger-confirmed credits/debits.
    pub wallet_balance: f64,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create member payload (registration itself is external; admin seeding
/// and tests go through this).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberCreate {
    pub name: String,
    pub email: Option<String>,
    pub upline_id: Option<i64>,
    pub sponsor_id: Option<i64>,
    pub rank: Option<i64>,
}

/// Binary placement update (admin hierarchy edit).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Placement {
    pub left_child_id: Option<i64>,
    pub right_child_id: Option<i64>,
}
