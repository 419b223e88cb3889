//! Roster endpoints: admin edits plus per-member ledger reads.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use shared::models::{Member, MemberCreate, Placement, Rebate, WalletTransaction};

use crate::db::{ledger, member};
use crate::error::{AppError, ok};
use crate::state::AppState;

use super::ApiResult;

/// POST /api/members
pub async fn create_member(
    State(state): State<AppState>,
    Json(data): Json<MemberCreate>,
) -> ApiResult<Member> {
    if data.name.trim().is_empty() {
        return Err(AppError::InvalidArgument("name must not be empty".into()));
    }
    if let Some(upline_id) = data.upline_id {
        member::require_active(&state.pool, upline_id).await?;
    }
    if let Some(sponsor_id) = data.sponsor_id {
        member::require_active(&state.pool, sponsor_id).await?;
    }
    let created = member::create(&state.pool, data).await?;
    Ok(ok(created))
}

/// PUT /api/members/{id}/placement
pub async fn set_placement(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(placement): Json<Placement>,
) -> ApiResult<()> {
    member::require_active(&state.pool, id).await?;
    for slot in [placement.left_child_id, placement.right_child_id] {
        if let Some(child_id) = slot {
            if child_id == id {
                return Err(AppError::InvalidArgument(
                    "a member cannot occupy its own placement slot".into(),
                ));
            }
            // Dangling slots are tolerated by the volume math, but the
            // admin surface rejects them outright.
            member::require_active(&state.pool, child_id).await?;
        }
    }
    member::set_placement(&state.pool, id, placement).await?;
    Ok(ok(()))
}

/// DELETE /api/members/{id}
pub async fn deactivate_member(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<bool> {
    let removed = member::deactivate(&state.pool, id).await?;
    if !removed {
        return Err(AppError::MemberNotFound(id));
    }
    Ok(ok(true))
}

#[derive(Debug, Deserialize)]
pub struct LedgerQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct WalletView {
    pub member_id: i64,
    pub balance: f64,
    pub transactions: Vec<WalletTransaction>,
}

/// GET /api/members/{id}/wallet?limit=
pub async fn get_wallet(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<LedgerQuery>,
) -> ApiResult<WalletView> {
    let m = member::require_active(&state.pool, id).await?;
    let transactions =
        ledger::wallet_transactions(&state.pool, id, query.limit.unwrap_or(50)).await?;
    Ok(ok(WalletView {
        member_id: id,
        balance: m.wallet_balance,
        transactions,
    }))
}

/// GET /api/members/{id}/rebates?limit=
pub async fn get_rebates(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<LedgerQuery>,
) -> ApiResult<Vec<Rebate>> {
    member::require_active(&state.pool, id).await?;
    let rebates =
        ledger::rebates_for_receiver(&state.pool, id, query.limit.unwrap_or(50)).await?;
    Ok(ok(rebates))
}

/// GET /api/members/{id}/performance/{year}/{month}
pub async fn get_performance(
    State(state): State<AppState>,
    Path((id, year, month)): Path<(i64, i64, i64)>,
) -> ApiResult<shared::models::MonthlyPerformance> {
    member::require_active(&state.pool, id).await?;
    match ledger::performance_for(&state.pool, id, year, month).await? {
        Some(row) => Ok(ok(row)),
        None => Err(AppError::InvalidArgument(format!(
            "no performance recorded for member {id} in {year}-{month:02}"
        ))),
    }
}
