//! Ledger Models — rebates and wallet transactions.

use serde::{Deserialize, Serialize};

/// Rebate status enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum RebateStatus {
    Pending,
    Processed,
}

/// Immutable settlement record. Never mutated once processed; corrections
/// are new offsetting records.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Rebate {
    pub id: i64,
    pub purchase_id: i64,
    /// Member credited.
    pub receiver_id: i64,
    /// The purchaser whose activity generated the rebate.
    pub generator_id: i64,
    pub level: i64,
    pub percentage: f64,
    pub amount: f64,
    pub status: RebateStatus,
    pub processed_at: Option<i64>,
}

/// Wallet transaction kind
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum WalletTxKind {
    Commission,
    Adjustment,
}

/// Append-only record of every wallet balance change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct WalletTransaction {
    pub id: i64,
    pub member_id: i64,
    pub amount: f64,
    pub balance_after: f64,
    pub kind: WalletTxKind,
    /// Free-form reference, e.g. the settlement period "2026-08".
    pub reference: String,
    pub created_at: i64,
}
