//! Settlement Processor
//!
//! Orchestrates the commission calculator over the active roster for one
//! cutoff period and durably credits the results. Each member is an
//! independent unit of work: compute purely from the run's snapshot, then
//! commit the four ledger writes (performance row, rebate rows, wallet
//! credit, wallet transaction) in a single transaction. One member's
//! failure never aborts the batch, and re-running a period is a no-op for
//! members already carrying the settled marker.

use futures::StreamExt;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::comp::commission::{self, CommissionBreakdown};
use crate::comp::money::to_f64;
use crate::comp::period;
use crate::comp::pv::PvSnapshot;
use crate::config::Config;
use crate::db::ledger::{self, PerformanceUpsert, RebateInsert};
use crate::db::rates;
use crate::error::{AppError, AppResult};
use shared::models::WalletTxKind;

/// Outcome of settling one period. Every active member lands in exactly
/// one bucket: `processed_count`, `skipped` or `failed`.
#[derive(Debug, Serialize)]
pub struct SettlementResult {
    pub year: i64,
    pub month: i64,
    pub processed_count: usize,
    pub total_disbursed: f64,
    /// Members skipped because the period was already settled for them.
    /// Only the settled marker puts a member here.
    pub skipped: Vec<i64>,
    /// Members whose computation or commit failed, with the reason.
    /// Failures are never folded into `skipped`; the rest of the batch
    /// ran to completion.
    pub failed: Vec<SettlementFailure>,
}

#[derive(Debug, Serialize)]
pub struct SettlementFailure {
    pub member_id: i64,
    pub error: String,
}

enum PersistOutcome {
    Committed(f64),
    AlreadySettled,
    Failed(String),
}

/// Settle one cutoff period for every active member. Safe to re-invoke:
/// members settled by a previous (possibly interrupted) run are skipped.
pub async fn settle_period(
    pool: &SqlitePool,
    config: &Config,
    year: i64,
    month: i64,
) -> AppResult<SettlementResult> {
    let (start, end) = period::cutoff_window(year, month, config.cutoff_day)?;
    // Config conflicts (overlapping tiers, malformed rates) abort the run
    // here, before any member is touched.
    let plan = rates::load_rate_plan(pool).await?;
    let snapshot = PvSnapshot::load(pool, start, end).await?;
    let already_settled = ledger::settled_members(pool, year, month).await?;

    let mut result = SettlementResult {
        year,
        month,
        processed_count: 0,
        total_disbursed: 0.0,
        skipped: Vec::new(),
        failed: Vec::new(),
    };

    // Compute every breakdown up front: the math is pure and snapshot-
    // backed, so a member's figures never depend on another member having
    // been committed first.
    let mut units = Vec::new();
    let mut roster: Vec<i64> = snapshot.member_ids().collect();
    roster.sort_unstable();
    for member_id in roster {
        if already_settled.contains(&member_id) {
            result.skipped.push(member_id);
            continue;
        }
        match commission::calculate(&snapshot, &plan, member_id) {
            Ok(breakdown) => units.push(build_unit(breakdown, year, month)),
            Err(err) => {
                warn!(
                    target: "settlement",
                    member_id,
                    error = %err,
                    "Commission computation failed; continuing batch"
                );
                result.failed.push(SettlementFailure {
                    member_id,
                    error: err.to_string(),
                });
            }
        }
    }

    // Persist on a bounded pool; units are independent.
    let reference = period::period_label(year, month);
    let outcomes: Vec<(i64, PersistOutcome)> = futures::stream::iter(units)
        .map(|unit| {
            let reference = reference.clone();
            async move {
                let member_id = unit.performance.member_id;
                (member_id, persist_member(pool, unit, &reference).await)
            }
        })
        .buffer_unordered(config.settlement_concurrency)
        .collect()
        .await;

    for (member_id, outcome) in outcomes {
        match outcome {
            PersistOutcome::Committed(total) => {
                result.processed_count += 1;
                result.total_disbursed += total;
            }
            PersistOutcome::AlreadySettled => result.skipped.push(member_id),
            PersistOutcome::Failed(error) => {
                result.failed.push(SettlementFailure { member_id, error })
            }
        }
    }
    result.skipped.sort_unstable();

    info!(
        target: "settlement",
        year,
        month,
        processed = result.processed_count,
        skipped = result.skipped.len(),
        failed = result.failed.len(),
        total_disbursed = result.total_disbursed,
        "Settlement run complete"
    );
    Ok(result)
}

/// Read-only commission preview for one member, same math as settlement.
pub async fn preview_member(
    pool: &SqlitePool,
    config: &Config,
    year: i64,
    month: i64,
    member_id: i64,
) -> AppResult<CommissionBreakdown> {
    let (start, end) = period::cutoff_window(year, month, config.cutoff_day)?;
    let plan = rates::load_rate_plan(pool).await?;
    let snapshot = PvSnapshot::load(pool, start, end).await?;
    commission::calculate(&snapshot, &plan, member_id)
}

/// One member's fully-computed unit of work, ready to commit.
struct SettlementUnit {
    performance: PerformanceUpsert,
    rebates: Vec<RebateInsert>,
    total_earnings: f64,
}

fn build_unit(breakdown: CommissionBreakdown, year: i64, month: i64) -> SettlementUnit {
    let rebates = breakdown
        .rebate_rows
        .iter()
        .map(|row| RebateInsert {
            purchase_id: row.purchase_id,
            receiver_id: breakdown.member_id,
            generator_id: row.generator_id,
            level: row.level,
            percentage: to_f64(row.percentage),
            amount: to_f64(row.amount),
        })
        .collect();
    let total_earnings = to_f64(breakdown.total_commission);
    SettlementUnit {
        performance: PerformanceUpsert {
            member_id: breakdown.member_id,
            year,
            month,
            personal_pv: to_f64(breakdown.personal_pv),
            left_leg_pv: to_f64(breakdown.legs.left_leg_pv),
            right_leg_pv: to_f64(breakdown.legs.right_leg_pv),
            total_group_pv: to_f64(breakdown.legs.total_pv),
            direct_referral_bonus: to_f64(breakdown.direct_referral_bonus),
            level_commissions: to_f64(breakdown.level_commissions),
            group_volume_bonus: to_f64(breakdown.group_volume_bonus),
            performance_bonus: to_f64(breakdown.performance_bonus),
            total_earnings,
        },
        rebates,
        total_earnings,
    }
}

/// Commit one member's settlement atomically. Either the performance row,
/// every rebate row, the wallet credit and the wallet transaction all
/// land, or none do.
async fn persist_member(
    pool: &SqlitePool,
    unit: SettlementUnit,
    reference: &str,
) -> PersistOutcome {
    match try_persist(pool, &unit, reference).await {
        Ok(true) => PersistOutcome::Committed(unit.total_earnings),
        Ok(false) => PersistOutcome::AlreadySettled,
        Err(err) => {
            let err = AppError::SettlementWriteFailure(err.to_string());
            warn!(
                target: "settlement",
                member_id = unit.performance.member_id,
                error = %err,
                "Settlement commit failed; rolled back"
            );
            PersistOutcome::Failed(err.to_string())
        }
    }
}

async fn try_persist(
    pool: &SqlitePool,
    unit: &SettlementUnit,
    reference: &str,
) -> AppResult<bool> {
    let member_id = unit.performance.member_id;
    let mut tx = pool.begin().await?;

    // Re-check under the transaction: a concurrent or interrupted run may
    // have settled this member after the roster pre-filter.
    if ledger::is_settled(&mut *tx, member_id, unit.performance.year, unit.performance.month).await? {
        tx.rollback().await?;
        return Ok(false);
    }

    let now = shared::util::now_millis();
    ledger::upsert_performance(&mut *tx, &unit.performance, now).await?;
    for rebate in &unit.rebates {
        ledger::insert_rebate(&mut *tx, rebate, now).await?;
    }
    if unit.total_earnings > 0.0 {
        let balance_after =
            crate::db::member::credit_wallet(&mut *tx, member_id, unit.total_earnings).await?;
        ledger::insert_wallet_transaction(
            &mut *tx,
            member_id,
            unit.total_earnings,
            balance_after,
            WalletTxKind::Commission,
            reference,
        )
        .await?;
    }

    tx.commit().await?;
    Ok(true)
}
