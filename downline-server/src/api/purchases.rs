//! Purchase intake. Completed purchases are the only PV source; the
//! unit amount defaults to the catalog price and an explicit timestamp
//! lets back-dated imports land in the right cutoff window.

use axum::Json;
use axum::extract::State;
use serde::Deserialize;

use shared::models::Purchase;

use crate::db::{member, purchase};
use crate::error::ok;
use crate::state::AppState;

use super::ApiResult;

#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    /// Omitted for walk-in retail sales that generate no PV.
    pub member_id: Option<i64>,
    pub product_id: i64,
    pub quantity: i64,
    /// Price override; defaults to the product's list price.
    pub unit_amount: Option<f64>,
    /// Epoch millis; defaults to now.
    pub occurred_at: Option<i64>,
}

/// POST /api/purchases
pub async fn record_purchase(
    State(state): State<AppState>,
    Json(req): Json<PurchaseRequest>,
) -> ApiResult<Purchase> {
    if let Some(member_id) = req.member_id {
        member::require_active(&state.pool, member_id).await?;
    }
    let recorded = purchase::record_completed_purchase(
        &state.pool,
        req.member_id,
        req.product_id,
        req.quantity,
        req.unit_amount,
        req.occurred_at,
    )
    .await?;
    Ok(ok(recorded))
}
