//! Hierarchy Query Service
//!
//! Read-only traversal of the member graph for display: paginated direct
//! downline listings, subtree statistics, lazy level expansion and
//! filtered search. All operations are side-effect free; reads are
//! eventually consistent with settlement, never coupled to it.

pub mod cache;
pub mod downline;
pub mod search;
pub mod stats;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

pub const MAX_PAGE_SIZE: i64 = 100;

/// Sort key whitelist; anything else never reaches the SQL layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    Name,
    #[default]
    CreatedAt,
    Rank,
    DownlineCount,
    Sales,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Options bag shared by downline listing and search. Arrives as plain
/// query-string data; unrecognized keys are ignored by deserialization,
/// not errors.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    pub filter_rank: Option<i64>,
    /// Bounds on the lifetime completed-purchase amount.
    pub filter_min_sales: Option<f64>,
    pub filter_max_sales: Option<f64>,
    /// Epoch-millis bounds on the join date.
    pub filter_joined_after: Option<i64>,
    pub filter_joined_before: Option<i64>,
    pub sort_by: SortBy,
    pub sort_direction: SortDirection,
    pub include_performance_metrics: bool,
    pub lazy_load_levels: bool,
    pub include_metadata: bool,
}

impl QueryOptions {
    /// ORDER BY clause from the whitelist, with id as the tie-break so
    /// repeated reads of unchanged data are byte-identical.
    pub(crate) fn order_clause(&self) -> String {
        let key = match self.sort_by {
            SortBy::Name => "m.name",
            SortBy::CreatedAt => "m.created_at",
            SortBy::Rank => "m.rank",
            SortBy::DownlineCount => "downline_count",
            SortBy::Sales => "sales",
        };
        let dir = match self.sort_direction {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };
        format!(" ORDER BY {key} {dir}, m.id ASC")
    }
}

/// WHERE fragment for the shared filter vocabulary. Placeholder order
/// must match `bind_filters!`.
pub(crate) fn filter_sql(opts: &QueryOptions) -> String {
    let mut sql = String::new();
    if opts.filter_rank.is_some() {
        sql.push_str(" AND m.rank = ?");
    }
    if opts.filter_min_sales.is_some() {
        sql.push_str(" AND COALESCE(s.sales, 0.0) >= ?");
    }
    if opts.filter_max_sales.is_some() {
        sql.push_str(" AND COALESCE(s.sales, 0.0) <= ?");
    }
    if opts.filter_joined_after.is_some() {
        sql.push_str(" AND m.created_at >= ?");
    }
    if opts.filter_joined_before.is_some() {
        sql.push_str(" AND m.created_at <= ?");
    }
    sql
}

/// Binds the filter values in the same order `filter_sql` emitted the
/// placeholders. A macro because query_as and query_scalar builders are
/// distinct types.
macro_rules! bind_filters {
    ($query:expr, $opts:expr) => {{
        let mut q = $query;
        if let Some(v) = $opts.filter_rank {
            q = q.bind(v);
        }
        if let Some(v) = $opts.filter_min_sales {
            q = q.bind(v);
        }
        if let Some(v) = $opts.filter_max_sales {
            q = q.bind(v);
        }
        if let Some(v) = $opts.filter_joined_after {
            q = q.bind(v);
        }
        if let Some(v) = $opts.filter_joined_before {
            q = q.bind(v);
        }
        q
    }};
}
pub(crate) use bind_filters;

/// Batch size for IN () expansions; SQLite's default variable limit is
/// 999, so stay well under it.
pub(crate) const SQL_CHUNK: usize = 500;

/// Pagination guardrails shared by every read operation.
pub fn validate_page(page: i64, page_size: i64) -> AppResult<()> {
    if page < 1 {
        return Err(AppError::InvalidArgument(format!(
            "page must be >= 1, got {page}"
        )));
    }
    if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
        return Err(AppError::InvalidArgument(format!(
            "page_size must be in 1..={MAX_PAGE_SIZE}, got {page_size}"
        )));
    }
    Ok(())
}

pub fn validate_depth(max_level: i64, cap: i64) -> AppResult<()> {
    if !(1..=cap).contains(&max_level) {
        return Err(AppError::InvalidArgument(format!(
            "max_level must be in 1..={cap}, got {max_level}"
        )));
    }
    Ok(())
}
