//! Hierarchy read endpoints. Responses are cached briefly per request
//! fingerprint; the fingerprint is the path member plus the raw query
//! string, so identical reads within the TTL never hit the database.

use axum::extract::{Path, Query, RawQuery, State};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, ok};
use crate::network::{QueryOptions, downline, search as search_svc, stats};
use crate::state::AppState;

use super::ApiResult;

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    25
}

fn default_max_level() -> i64 {
    3
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
    #[serde(default = "default_max_level")]
    pub max_level: i64,
}

fn to_cached(value: impl Serialize) -> Result<serde_json::Value, AppError> {
    serde_json::to_value(value).map_err(|e| AppError::Internal(e.to_string()))
}

/// GET /api/network/{id}/downline
pub async fn get_downline(
    State(state): State<AppState>,
    Path(member_id): Path<i64>,
    RawQuery(raw): RawQuery,
    Query(params): Query<PageParams>,
    Query(opts): Query<QueryOptions>,
) -> ApiResult<serde_json::Value> {
    let key = format!("downline:{member_id}:{}", raw.unwrap_or_default());
    if let Some(hit) = state.query_cache.get(&key) {
        return Ok(ok(hit));
    }
    let page = downline::get_downline(
        &state.pool,
        member_id,
        &opts,
        params.page,
        params.page_size,
        params.max_level,
        state.config.max_query_depth,
    )
    .await?;
    let value = to_cached(page)?;
    state.query_cache.put(key, value.clone());
    Ok(ok(value))
}

#[derive(Debug, Deserialize)]
pub struct StatisticsParams {
    #[serde(default = "default_max_level")]
    pub max_level: i64,
}

/// GET /api/network/{id}/statistics
pub async fn get_statistics(
    State(state): State<AppState>,
    Path(member_id): Path<i64>,
    RawQuery(raw): RawQuery,
    Query(params): Query<StatisticsParams>,
) -> ApiResult<serde_json::Value> {
    let key = format!("statistics:{member_id}:{}", raw.unwrap_or_default());
    if let Some(hit) = state.query_cache.get(&key) {
        return Ok(ok(hit));
    }
    let report = stats::get_statistics(
        &state.pool,
        member_id,
        params.max_level,
        state.config.max_query_depth,
    )
    .await?;
    let value = to_cached(report)?;
    state.query_cache.put(key, value.clone());
    Ok(ok(value))
}

#[derive(Debug, Deserialize)]
pub struct LevelParams {
    pub current_level: i64,
    pub max_level: i64,
}

/// GET /api/network/{id}/levels?current_level=&max_level=
///
/// Lazy expansion of one subtree; uncached because it always follows a
/// cached listing and the fragment key space would be unbounded.
pub async fn load_levels(
    State(state): State<AppState>,
    Path(parent_id): Path<i64>,
    Query(params): Query<LevelParams>,
) -> ApiResult<Vec<downline::DownlineNode>> {
    let nodes = downline::load_additional_levels(
        &state.pool,
        parent_id,
        params.current_level,
        params.max_level,
        state.config.max_query_depth,
    )
    .await?;
    Ok(ok(nodes))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

/// GET /api/network/search?q=&page=&page_size=
pub async fn search(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
    Query(params): Query<SearchParams>,
    Query(opts): Query<QueryOptions>,
) -> ApiResult<serde_json::Value> {
    let key = format!("search:{}", raw.unwrap_or_default());
    if let Some(hit) = state.query_cache.get(&key) {
        return Ok(ok(hit));
    }
    let page =
        search_svc::search(&state.pool, &params.q, &opts, params.page, params.page_size).await?;
    let value = to_cached(page)?;
    state.query_cache.put(key, value.clone());
    Ok(ok(value))
}
