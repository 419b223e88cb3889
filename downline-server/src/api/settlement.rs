//! Settlement endpoints: run a period, preview one member's figures.

use axum::extract::{Path, State};
use serde::Serialize;

use crate::comp::money::to_f64;
use crate::comp::settlement::{self, SettlementResult};
use crate::error::ok;
use crate::state::AppState;

use super::ApiResult;

/// POST /api/settlements/{year}/{month}
pub async fn run_settlement(
    State(state): State<AppState>,
    Path((year, month)): Path<(i64, i64)>,
) -> ApiResult<SettlementResult> {
    let result = settlement::settle_period(&state.pool, &state.config, year, month).await?;
    Ok(ok(result))
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub member_id: i64,
    pub year: i64,
    pub month: i64,
    pub personal_pv: f64,
    pub left_leg_pv: f64,
    pub right_leg_pv: f64,
    pub total_group_pv: f64,
    pub direct_referral_count: i64,
    pub direct_referral_bonus: f64,
    pub level_commissions: f64,
    pub group_volume_bonus: f64,
    pub performance_bonus: f64,
    pub total_commission: f64,
    pub planned_rebates: Vec<PlannedRebateView>,
}

#[derive(Debug, Serialize)]
pub struct PlannedRebateView {
    pub purchase_id: i64,
    pub generator_id: i64,
    pub level: i64,
    pub percentage: f64,
    pub amount: f64,
}

/// GET /api/settlements/{year}/{month}/preview/{member_id}
///
/// Same math as the settlement run, no writes and no settled marker.
pub async fn preview(
    State(state): State<AppState>,
    Path((year, month, member_id)): Path<(i64, i64, i64)>,
) -> ApiResult<PreviewResponse> {
    let b =
        settlement::preview_member(&state.pool, &state.config, year, month, member_id).await?;
    Ok(ok(PreviewResponse {
        member_id: b.member_id,
        year,
        month,
        personal_pv: to_f64(b.personal_pv),
        left_leg_pv: to_f64(b.legs.left_leg_pv),
        right_leg_pv: to_f64(b.legs.right_leg_pv),
        total_group_pv: to_f64(b.legs.total_pv),
        direct_referral_count: b.direct_referral_count,
        direct_referral_bonus: to_f64(b.direct_referral_bonus),
        level_commissions: to_f64(b.level_commissions),
        group_volume_bonus: to_f64(b.group_volume_bonus),
        performance_bonus: to_f64(b.performance_bonus),
        total_commission: to_f64(b.total_commission),
        planned_rebates: b
            .rebate_rows
            .into_iter()
            .map(|row| PlannedRebateView {
                purchase_id: row.purchase_id,
                generator_id: row.generator_id,
                level: row.level,
                percentage: to_f64(row.percentage),
                amount: to_f64(row.amount),
            })
            .collect(),
    }))
}
