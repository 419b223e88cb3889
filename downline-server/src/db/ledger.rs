//! Ledger repository
//!
//! Rebates, wallet transactions and monthly-performance snapshots. The
//! write helpers take `&mut SqliteConnection` so the settlement processor
//! can compose all four writes for one member inside a single transaction.

use std::collections::HashSet;

use shared::models::{MonthlyPerformance, Rebate, WalletTransaction, WalletTxKind};
use sqlx::{SqliteConnection, SqlitePool};

use crate::error::AppResult;

/// One member's settled figures, ready to persist.
#[derive(Debug, Clone)]
pub struct PerformanceUpsert {
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
}

/// Planned rebate row (status becomes `processed` on insert).
#[derive(Debug, Clone)]
pub struct RebateInsert {
    pub purchase_id: i64,
    pub receiver_id: i64,
    pub generator_id: i64,
    pub level: i64,
    pub percentage: f64,
    pub amount: f64,
}

/// Members already settled for the period (pre-filter for a run; the
/// per-member transaction re-checks before writing).
pub async fn settled_members(pool: &SqlitePool, year: i64, month: i64) -> AppResult<HashSet<i64>> {
    let rows: Vec<(i64,)> = sqlx::query_as(
        "SELECT member_id FROM monthly_performance WHERE year = ? AND month = ? AND settled_at IS NOT NULL",
    )
    .bind(year)
    .bind(month)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Idempotency check inside the settlement transaction.
pub async fn is_settled(
    conn: &mut SqliteConnection,
    member_id: i64,
    year: i64,
    month: i64,
) -> AppResult<bool> {
    let row: Option<(Option<i64>,)> = sqlx::query_as(
        "SELECT settled_at FROM monthly_performance WHERE member_id = ? AND year = ? AND month = ?",
    )
    .bind(member_id)
    .bind(year)
    .bind(month)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(matches!(row, Some((Some(_),))))
}

/// Upsert the period snapshot and stamp the idempotency marker. The
/// (member, year, month) unique key makes re-upserting inherently
/// idempotent.
pub async fn upsert_performance(
    conn: &mut SqliteConnection,
    perf: &PerformanceUpsert,
    settled_at: i64,
) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO monthly_performance (id, member_id, year, month, personal_pv, left_leg_pv, right_leg_pv, total_group_pv, direct_referral_bonus, level_commissions, group_volume_bonus, performance_bonus, total_earnings, settled_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(member_id, year, month) DO UPDATE SET \
            personal_pv = excluded.personal_pv, \
            left_leg_pv = excluded.left_leg_pv, \
            right_leg_pv = excluded.right_leg_pv, \
            total_group_pv = excluded.total_group_pv, \
            direct_referral_bonus = excluded.direct_referral_bonus, \
            level_commissions = excluded.level_commissions, \
            group_volume_bonus = excluded.group_volume_bonus, \
            performance_bonus = excluded.performance_bonus, \
            total_earnings = excluded.total_earnings, \
            settled_at = excluded.settled_at",
    )
    .bind(shared::util::snowflake_id())
    .bind(perf.member_id)
    .bind(perf.year)
    .bind(perf.month)
    .bind(perf.personal_pv)
    .bind(perf.left_leg_pv)
    .bind(perf.right_leg_pv)
    .bind(perf.total_group_pv)
    .bind(perf.direct_referral_bonus)
    .bind(perf.level_commissions)
    .bind(perf.group_volume_bonus)
    .bind(perf.performance_bonus)
    .bind(perf.total_earnings)
    .bind(settled_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Append one processed rebate row.
pub async fn insert_rebate(
    conn: &mut SqliteConnection,
    rebate: &RebateInsert,
    processed_at: i64,
) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO rebate (id, purchase_id, receiver_id, generator_id, level, percentage, amount, status, processed_at) VALUES (?, ?, ?, ?, ?, ?, ?, 'processed', ?)",
    )
    .bind(shared::util::snowflake_id())
    .bind(rebate.purchase_id)
    .bind(rebate.receiver_id)
    .bind(rebate.generator_id)
    .bind(rebate.level)
    .bind(rebate.percentage)
    .bind(rebate.amount)
    .bind(processed_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Record a wallet balance change matching an already-applied credit.
pub async fn insert_wallet_transaction(
    conn: &mut SqliteConnection,
    member_id: i64,
    amount: f64,
    balance_after: f64,
    kind: WalletTxKind,
    reference: &str,
) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO wallet_transaction (id, member_id, amount, balance_after, kind, reference, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(shared::util::snowflake_id())
    .bind(member_id)
    .bind(amount)
    .bind(balance_after)
    .bind(kind)
    .bind(reference)
    .bind(shared::util::now_millis())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn performance_for(
    pool: &SqlitePool,
    member_id: i64,
    year: i64,
    month: i64,
) -> AppResult<Option<MonthlyPerformance>> {
    let row: Option<MonthlyPerformance> = sqlx::query_as(
        "SELECT id, member_id, year, month, personal_pv, left_leg_pv, right_leg_pv, total_group_pv, direct_referral_bonus, level_commissions, group_volume_bonus, performance_bonus, total_earnings, settled_at FROM monthly_performance WHERE member_id = ? AND year = ? AND month = ?",
    )
    .bind(member_id)
    .bind(year)
    .bind(month)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Rebates credited to a member, newest first (audit surface).
pub async fn rebates_for_receiver(
    pool: &SqlitePool,
    receiver_id: i64,
    limit: i64,
) -> AppResult<Vec<Rebate>> {
    let rows: Vec<Rebate> = sqlx::query_as(
        "SELECT id, purchase_id, receiver_id, generator_id, level, percentage, amount, status, processed_at FROM rebate WHERE receiver_id = ? ORDER BY processed_at DESC, id DESC LIMIT ?",
    )
    .bind(receiver_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Wallet history, newest first.
pub async fn wallet_transactions(
    pool: &SqlitePool,
    member_id: i64,
    limit: i64,
) -> AppResult<Vec<WalletTransaction>> {
    let rows: Vec<WalletTransaction> = sqlx::query_as(
        "SELECT id, member_id, amount, balance_after, kind, reference, created_at FROM wallet_transaction WHERE member_id = ? ORDER BY created_at DESC, id DESC LIMIT ?",
    )
    .bind(member_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
