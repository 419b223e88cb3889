//! Roster search: free-text match on name, email or id, sharing the
//! listing's filter vocabulary, sort whitelist and pagination rules.

use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::AppResult;

use super::downline::MemberRow;
use super::{bind_filters, filter_sql, validate_page, QueryOptions};

#[derive(Debug, Serialize)]
pub struct SearchPage {
    pub items: Vec<MemberRow>,
    /// Matches across all pages.
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

const SEARCH_FROM: &str = "FROM member m \
     LEFT JOIN (SELECT member_id, SUM(amount) AS sales FROM purchase \
                WHERE status = 'completed' GROUP BY member_id) s ON s.member_id = m.id \
     WHERE m.is_active = 1";

const TEXT_MATCH: &str =
    " AND (m.name LIKE ? OR m.email LIKE ? OR CAST(m.id AS TEXT) LIKE ?)";

/// Case-insensitive substring search over the active roster. An empty
/// query degrades to a filtered listing of everyone.
pub async fn search(
    pool: &SqlitePool,
    query: &str,
    opts: &QueryOptions,
    page: i64,
    page_size: i64,
) -> AppResult<SearchPage> {
    validate_page(page, page_size)?;
    let query = query.trim();
    let pattern = format!("%{query}%");
    let text_clause = if query.is_empty() { "" } else { TEXT_MATCH };
    let filters = filter_sql(opts);

    let count_sql = format!("SELECT COUNT(*) {SEARCH_FROM}{text_clause}{filters}");
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    if !query.is_empty() {
        count_query = count_query.bind(&pattern).bind(&pattern).bind(&pattern);
    }
    let total: i64 = bind_filters!(count_query, opts).fetch_one(pool).await?;

    let sql = format!(
        "SELECT m.id, m.name, m.email, m.upline_id, m.rank, m.created_at, \
         COALESCE(s.sales, 0.0) AS sales, \
         (SELECT COUNT(*) FROM member c WHERE c.upline_id = m.id AND c.is_active = 1) AS downline_count \
         {SEARCH_FROM}{text_clause}{filters}{} LIMIT ? OFFSET ?",
        opts.order_clause(),
    );
    let mut rows_query = sqlx::query_as::<_, MemberRow>(&sql);
    if !query.is_empty() {
        rows_query = rows_query.bind(&pattern).bind(&pattern).bind(&pattern);
    }
    let items: Vec<MemberRow> = bind_filters!(rows_query, opts)
        .bind(page_size)
        .bind((page - 1) * page_size)
        .fetch_all(pool)
        .await?;

    Ok(SearchPage {
        items,
        total,
        page,
        page_size,
    })
}
