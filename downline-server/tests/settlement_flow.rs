//! End-to-end settlement runs against a real (in-memory) database.

mod common;

use common::*;
use downline_server::comp::settlement;
use downline_server::db::ledger;
use downline_server::error::AppError;
use rust_decimal::Decimal;

/// Three-member chain: 100 <- 200 <- 300 (upline arrows). One purchase
/// by 300 with PV 100; level 1 pays 10%, level 2 pays 5%.
async fn seed_chain(pool: &sqlx::SqlitePool) {
    let joined = millis(2026, 1, 10);
    seed_member(pool, 100, "grand", None, None, joined).await;
    seed_member(pool, 200, "upline", Some(100), Some(100), joined).await;
    seed_member(pool, 300, "buyer", Some(200), Some(200), joined).await;
    seed_product(pool, 7, "starter-pack", 150.0, 100.0).await;
    seed_completed_purchase(pool, 1, 300, 7, 150.0, 100.0, millis(2026, 7, 10)).await;
    seed_rebate_config(pool, 1, 7, 1, 10.0).await;
    seed_rebate_config(pool, 2, 7, 2, 5.0).await;
}

#[tokio::test]
async fn level_commissions_flow_up_the_chain() {
    let pool = test_pool().await;
    let config = test_config();
    seed_chain(&pool).await;

    let result = settlement::settle_period(&pool, &config, 2026, 7)
        .await
        .unwrap();

    assert_eq!(result.processed_count, 3);
    assert!(result.skipped.is_empty());
    assert!(result.failed.is_empty());
    assert!((result.total_disbursed - 15.0).abs() < 1e-9);

    // One rebate per (receiver, purchase, level), nothing for the buyer.
    let for_upline = ledger::rebates_for_receiver(&pool, 200, 10).await.unwrap();
    assert_eq!(for_upline.len(), 1);
    assert_eq!(for_upline[0].purchase_id, 1);
    assert_eq!(for_upline[0].generator_id, 300);
    assert_eq!(for_upline[0].level, 1);
    assert!((for_upline[0].amount - 10.0).abs() < 1e-9);

    let for_grand = ledger::rebates_for_receiver(&pool, 100, 10).await.unwrap();
    assert_eq!(for_grand.len(), 1);
    assert_eq!(for_grand[0].level, 2);
    assert!((for_grand[0].amount - 5.0).abs() < 1e-9);

    assert!(ledger::rebates_for_receiver(&pool, 300, 10)
        .await
        .unwrap()
        .is_empty());

    // Wallets credited once, labeled with the period.
    assert!((wallet_balance(&pool, 200).await - 10.0).abs() < 1e-9);
    assert!((wallet_balance(&pool, 100).await - 5.0).abs() < 1e-9);
    assert!(wallet_balance(&pool, 300).await.abs() < 1e-9);

    let txs = ledger::wallet_transactions(&pool, 200, 10).await.unwrap();
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0].reference, "2026-07");
    assert!((txs[0].balance_after - 10.0).abs() < 1e-9);

    // Zero-earning members still get a settled performance row but no
    // wallet transaction.
    let buyer_perf = ledger::performance_for(&pool, 300, 2026, 7)
        .await
        .unwrap()
        .unwrap();
    assert!((buyer_perf.personal_pv - 100.0).abs() < 1e-9);
    assert!(buyer_perf.total_earnings.abs() < 1e-9);
    assert!(buyer_perf.settled_at.is_some());
    assert!(ledger::wallet_transactions(&pool, 300, 10)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn settlement_is_idempotent() {
    let pool = test_pool().await;
    let config = test_config();
    seed_chain(&pool).await;

    settlement::settle_period(&pool, &config, 2026, 7)
        .await
        .unwrap();
    let second = settlement::settle_period(&pool, &config, 2026, 7)
        .await
        .unwrap();

    assert_eq!(second.processed_count, 0);
    assert_eq!(second.skipped, vec![100, 200, 300]);
    assert!(second.total_disbursed.abs() < 1e-9);

    assert!((wallet_balance(&pool, 200).await - 10.0).abs() < 1e-9);
    assert_eq!(count(&pool, "FROM rebate").await, 2);
    assert_eq!(count(&pool, "FROM wallet_transaction").await, 2);
}

#[tokio::test]
async fn interrupted_run_resumes_without_double_pay() {
    let pool = test_pool().await;
    let config = test_config();
    seed_chain(&pool).await;

    // A previous run settled 200 and then died.
    sqlx::query(
        "INSERT INTO monthly_performance (id, member_id, year, month, total_earnings, settled_at) \
         VALUES (9001, 200, 2026, 7, 10.0, 1)",
    )
    .execute(&pool)
    .await
    .unwrap();

    let result = settlement::settle_period(&pool, &config, 2026, 7)
        .await
        .unwrap();

    assert_eq!(result.skipped, vec![200]);
    assert_eq!(result.processed_count, 2);
    // The already-settled member is never re-credited.
    assert!(wallet_balance(&pool, 200).await.abs() < 1e-9);
    assert!((wallet_balance(&pool, 100).await - 5.0).abs() < 1e-9);
}

#[tokio::test]
async fn failed_members_are_reported_apart_from_skips() {
    let pool = test_pool().await;
    let config = test_config();
    seed_chain(&pool).await;
    // A corrupt self-referencing placement slot fails exactly one member's
    // computation; nobody else's legs reach it.
    seed_member(&pool, 400, "loner", None, None, millis(2026, 1, 1)).await;
    place(&pool, 400, Some(400), None).await;

    let result = settlement::settle_period(&pool, &config, 2026, 7)
        .await
        .unwrap();

    assert_eq!(result.processed_count, 3);
    assert!(result.skipped.is_empty());
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].member_id, 400);
    assert!(!result.failed[0].error.is_empty());

    // The failed member got no writes; the rest settled normally.
    assert!(wallet_balance(&pool, 400).await.abs() < 1e-9);
    assert!(ledger::performance_for(&pool, 400, 2026, 7)
        .await
        .unwrap()
        .is_none());
    assert!((wallet_balance(&pool, 200).await - 10.0).abs() < 1e-9);
}

#[tokio::test]
async fn preview_is_read_only() {
    let pool = test_pool().await;
    let config = test_config();
    seed_chain(&pool).await;

    let breakdown = settlement::preview_member(&pool, &config, 2026, 7, 200)
        .await
        .unwrap();
    assert_eq!(breakdown.level_commissions, Decimal::from(10));
    assert_eq!(breakdown.total_commission, Decimal::from(10));

    assert_eq!(count(&pool, "FROM monthly_performance").await, 0);
    assert_eq!(count(&pool, "FROM rebate").await, 0);
    assert!(wallet_balance(&pool, 200).await.abs() < 1e-9);
}

#[tokio::test]
async fn purchases_outside_the_window_pay_nothing() {
    let pool = test_pool().await;
    let config = test_config();
    seed_chain(&pool).await;
    // An extra purchase in June must not leak into July's run.
    seed_completed_purchase(&pool, 2, 300, 7, 150.0, 100.0, millis(2026, 6, 20)).await;

    settlement::settle_period(&pool, &config, 2026, 7)
        .await
        .unwrap();

    assert!((wallet_balance(&pool, 200).await - 10.0).abs() < 1e-9);
    assert_eq!(count(&pool, "FROM rebate").await, 2);
}

#[tokio::test]
async fn direct_referral_counts_window_signups_only() {
    let pool = test_pool().await;
    let config = test_config();
    seed_member(&pool, 100, "sponsor", None, None, millis(2026, 1, 1)).await;
    seed_member(&pool, 201, "july-signup", Some(100), Some(100), millis(2026, 7, 5)).await;
    seed_member(&pool, 202, "june-signup", Some(100), Some(100), millis(2026, 6, 5)).await;
    seed_direct_referral_rate(&pool, 1, 50.0).await;

    settlement::settle_period(&pool, &config, 2026, 7)
        .await
        .unwrap();

    // One qualifying signup, one fixed bonus.
    assert!((wallet_balance(&pool, 100).await - 50.0).abs() < 1e-9);
    let perf = ledger::performance_for(&pool, 100, 2026, 7)
        .await
        .unwrap()
        .unwrap();
    assert!((perf.direct_referral_bonus - 50.0).abs() < 1e-9);
}

#[tokio::test]
async fn group_volume_pays_on_the_weaker_leg() {
    let pool = test_pool().await;
    let config = test_config();
    let joined = millis(2026, 1, 1);
    seed_member(&pool, 100, "root", None, None, joined).await;
    seed_member(&pool, 200, "left", Some(100), None, joined).await;
    seed_member(&pool, 300, "right", Some(100), None, joined).await;
    place(&pool, 100, Some(200), Some(300)).await;
    seed_product(&pool, 7, "pack", 10.0, 10.0).await;
    seed_completed_purchase(&pool, 1, 200, 7, 100.0, 100.0, millis(2026, 7, 3)).await;
    seed_completed_purchase(&pool, 2, 300, 7, 40.0, 40.0, millis(2026, 7, 4)).await;
    seed_group_volume_pct(&pool, 1, 10.0).await;

    settlement::settle_period(&pool, &config, 2026, 7)
        .await
        .unwrap();

    let perf = ledger::performance_for(&pool, 100, 2026, 7)
        .await
        .unwrap()
        .unwrap();
    assert!((perf.left_leg_pv - 100.0).abs() < 1e-9);
    assert!((perf.right_leg_pv - 40.0).abs() < 1e-9);
    // 10% of the weaker leg (40).
    assert!((perf.group_volume_bonus - 4.0).abs() < 1e-9);
    assert!((wallet_balance(&pool, 100).await - 4.0).abs() < 1e-9);
}

#[tokio::test]
async fn conflicting_rate_config_aborts_before_any_write() {
    let pool = test_pool().await;
    let config = test_config();
    seed_chain(&pool).await;
    seed_performance_tier(&pool, 1, 0.0, Some(100.0), "percentage", 1.0).await;
    seed_performance_tier(&pool, 2, 100.0, None, "percentage", 2.0).await;

    let err = settlement::settle_period(&pool, &config, 2026, 7)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ConfigurationConflict(_)));
    assert_eq!(count(&pool, "FROM monthly_performance").await, 0);
    assert_eq!(count(&pool, "FROM rebate").await, 0);
}
