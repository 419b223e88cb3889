//! Member repository

use shared::models::{Member, MemberCreate, Placement};
use sqlx::{SqliteConnection, SqlitePool};

use crate::error::{AppError, AppResult};

const MEMBER_SELECT: &str = "SELECT id, name, email, upline_id, sponsor_id, left_child_id, right_child_id, rank, wallet_balance, is_active, created_at, updated_at FROM member";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> AppResult<Option<Member>> {
    let sql = format!("{MEMBER_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, Member>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Lookup that treats a missing or inactive member as a caller error.
pub async fn require_active(pool: &SqlitePool, id: i64) -> AppResult<Member> {
    match find_by_id(pool, id).await? {
        Some(m) if m.is_active => Ok(m),
        _ => Err(AppError::MemberNotFound(id)),
    }
}

/// Full active roster, hierarchy edges included. One query; the PV
/// aggregator builds its adjacency snapshot from this.
pub async fn active_roster(pool: &SqlitePool) -> AppResult<Vec<Member>> {
    let sql = format!("{MEMBER_SELECT} WHERE is_active = 1 ORDER BY id");
    let rows = sqlx::query_as::<_, Member>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

pub async fn create(pool: &SqlitePool, data: MemberCreate) -> AppResult<Member> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    sqlx::query(
        "INSERT INTO member (id, name, email, upline_id, sponsor_id, rank, wallet_balance, is_active, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, 0, 1, ?, ?)",
    )
    .bind(id)
    .bind(&data.name)
    .bind(&data.email)
    .bind(data.upline_id)
    .bind(data.sponsor_id)
    .bind(data.rank.unwrap_or(0))
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| AppError::Database("Failed to create member".into()))
}

/// Admin hierarchy edit: set the binary placement slots.
pub async fn set_placement(pool: &SqlitePool, id: i64, placement: Placement) -> AppResult<()> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE member SET left_child_id = ?, right_child_id = ?, updated_at = ? WHERE id = ?",
    )
    .bind(placement.left_child_id)
    .bind(placement.right_child_id)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(AppError::MemberNotFound(id));
    }
    Ok(())
}

/// Soft delete; ledger rows referencing the member stay intact.
pub async fn deactivate(pool: &SqlitePool, id: i64) -> AppResult<bool> {
    let now = shared::util::now_millis();
    let rows = sqlx::query("UPDATE member SET is_active = 0, updated_at = ? WHERE id = ? AND is_active = 1")
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}

/// Atomically credit a wallet inside the caller's transaction and return
/// the balance after the credit.
pub async fn credit_wallet(
    conn: &mut SqliteConnection,
    member_id: i64,
    amount: f64,
) -> AppResult<f64> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE member SET wallet_balance = wallet_balance + ?, updated_at = ? WHERE id = ?",
    )
    .bind(amount)
    .bind(now)
    .bind(member_id)
    .execute(&mut *conn)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(AppError::MemberNotFound(member_id));
    }
    let (balance,): (f64,) = sqlx::query_as("SELECT wallet_balance FROM member WHERE id = ?")
        .bind(member_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(balance)
}
