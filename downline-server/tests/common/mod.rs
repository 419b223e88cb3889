//! Shared fixtures: in-memory database plus raw-SQL seed helpers with
//! explicit ids, so assertions stay deterministic.

#![allow(dead_code)]

use chrono::TimeZone;
use downline_server::Config;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".into(),
        http_port: 0,
        cutoff_day: 31,
        settlement_concurrency: 4,
        max_query_depth: 10,
        rate_limit_max_requests: 0,
        rate_limit_window_secs: 60,
        cache_ttl_secs: 0,
        environment: "test".into(),
    }
}

pub fn millis(year: i32, month: u32, day: u32) -> i64 {
    chrono::Utc
        .with_ymd_and_hms(year, month, day, 12, 0, 0)
        .unwrap()
        .timestamp_millis()
}

pub async fn seed_member(
    pool: &SqlitePool,
    id: i64,
    name: &str,
    upline_id: Option<i64>,
    sponsor_id: Option<i64>,
    created_at: i64,
) {
    sqlx::query(
        "INSERT INTO member (id, name, email, upline_id, sponsor_id, rank, wallet_balance, is_active, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, 0, 0, 1, ?, ?)",
    )
    .bind(id)
    .bind(name)
    .bind(format!("{name}@example.com"))
    .bind(upline_id)
    .bind(sponsor_id)
    .bind(created_at)
    .bind(created_at)
    .execute(pool)
    .await
    .unwrap();
}

pub async fn set_rank(pool: &SqlitePool, id: i64, rank: i64) {
    sqlx::query("UPDATE member SET rank = ? WHERE id = ?")
        .bind(rank)
        .bind(id)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn place(pool: &SqlitePool, id: i64, left: Option<i64>, right: Option<i64>) {
    sqlx::query("UPDATE member SET left_child_id = ?, right_child_id = ? WHERE id = ?")
        .bind(left)
        .bind(right)
        .bind(id)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn seed_product(pool: &SqlitePool, id: i64, name: &str, price: f64, pv: f64) {
    sqlx::query("INSERT INTO product (id, name, price, pv, is_active, created_at) VALUES (?, ?, ?, ?, 1, 0)")
        .bind(id)
        .bind(name)
        .bind(price)
        .bind(pv)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn seed_completed_purchase(
    pool: &SqlitePool,
    id: i64,
    member_id: i64,
    product_id: i64,
    amount: f64,
    pv_amount: f64,
    created_at: i64,
) {
    sqlx::query(
        "INSERT INTO purchase (id, member_id, product_id, quantity, amount, pv_amount, status, created_at) \
         VALUES (?, ?, ?, 1, ?, ?, 'completed', ?)",
    )
    .bind(id)
    .bind(member_id)
    .bind(product_id)
    .bind(amount)
    .bind(pv_amount)
    .bind(created_at)
    .execute(pool)
    .await
    .unwrap();
}

pub async fn seed_rebate_config(pool: &SqlitePool, id: i64, product_id: i64, level: i64, pct: f64) {
    sqlx::query(
        "INSERT INTO rebate_config (id, product_id, level, percentage, is_active, created_at) VALUES (?, ?, ?, ?, 1, ?)",
    )
    .bind(id)
    .bind(product_id)
    .bind(level)
    .bind(pct)
    .bind(id)
    .execute(pool)
    .await
    .unwrap();
}

pub async fn seed_level_rate(pool: &SqlitePool, id: i64, level: i64, pct: f64) {
    sqlx::query(
        "INSERT INTO commission_rate (id, rate_type, level, percentage, is_active, created_at) \
         VALUES (?, 'level_commission', ?, ?, 1, ?)",
    )
    .bind(id)
    .bind(level)
    .bind(pct)
    .bind(id)
    .execute(pool)
    .await
    .unwrap();
}

pub async fn seed_direct_referral_rate(pool: &SqlitePool, id: i64, amount: f64) {
    sqlx::query(
        "INSERT INTO commission_rate (id, rate_type, amount, is_active, created_at) \
         VALUES (?, 'direct_referral', ?, 1, ?)",
    )
    .bind(id)
    .bind(amount)
    .bind(id)
    .execute(pool)
    .await
    .unwrap();
}

pub async fn seed_group_volume_pct(pool: &SqlitePool, id: i64, pct: f64) {
    sqlx::query(
        "INSERT INTO commission_rate (id, rate_type, bonus_type, percentage, is_active, created_at) \
         VALUES (?, 'group_volume', 'percentage', ?, 1, ?)",
    )
    .bind(id)
    .bind(pct)
    .bind(id)
    .execute(pool)
    .await
    .unwrap();
}

pub async fn seed_performance_tier(
    pool: &SqlitePool,
    id: i64,
    min_sales: f64,
    max_sales: Option<f64>,
    bonus_type: &str,
    value: f64,
) {
    sqlx::query(
        "INSERT INTO performance_tier (id, min_sales, max_sales, bonus_type, value, is_active, created_at) \
         VALUES (?, ?, ?, ?, ?, 1, ?)",
    )
    .bind(id)
    .bind(min_sales)
    .bind(max_sales)
    .bind(bonus_type)
    .bind(value)
    .bind(id)
    .execute(pool)
    .await
    .unwrap();
}

pub async fn wallet_balance(pool: &SqlitePool, member_id: i64) -> f64 {
    sqlx::query_scalar("SELECT wallet_balance FROM member WHERE id = ?")
        .bind(member_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn count(pool: &SqlitePool, table_where: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) {table_where}"))
        .fetch_one(pool)
        .await
        .unwrap()
}
