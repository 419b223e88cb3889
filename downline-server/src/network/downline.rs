//! Paginated downline listing with optional eager expansion of deeper
//! levels. Filters and sorting apply to the direct downline only; deeper
//! levels are fetched unfiltered in creation order so that lazy
//! expansion through `load_additional_levels` composes with the eager
//! path node for node.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use sqlx::SqlitePool;

use shared::models::MonthlyPerformance;

use crate::db::member;
use crate::error::{AppError, AppResult};

use super::{bind_filters, filter_sql, validate_depth, validate_page, QueryOptions, SQL_CHUNK};

/// One member as the query service reports it: hierarchy fields plus the
/// derived sales and direct-downline figures.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MemberRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub upline_id: Option<i64>,
    pub rank: i64,
    pub created_at: i64,
    /// Lifetime completed-purchase amount.
    pub sales: f64,
    /// Active direct downline count.
    pub downline_count: i64,
}

#[derive(Debug, Serialize)]
pub struct DownlineNode {
    #[serde(flatten)]
    pub member: MemberRow,
    /// Depth relative to the queried root; direct downline is level 1.
    pub level: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance: Option<MonthlyPerformance>,
    pub children: Vec<DownlineNode>,
}

#[derive(Debug, Serialize)]
pub struct DownlinePage {
    pub member_id: i64,
    pub page: i64,
    pub page_size: i64,
    pub max_level: i64,
    pub nodes: Vec<DownlineNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PageMetadata>,
}

#[derive(Debug, Serialize)]
pub struct PageMetadata {
    /// Direct downline matching the filters, across all pages.
    pub total_direct: i64,
    pub total_pages: i64,
    pub generated_at: i64,
}

/// Base projection; `sales` and `downline_count` are derived here so the
/// same row shape serves listing, search and expansion. The fallback must
/// stay `0.0`: an integer literal would make COALESCE yield an INTEGER
/// column that no longer decodes into `sales: f64`.
const ROW_SELECT: &str = "SELECT m.id, m.name, m.email, m.upline_id, m.rank, m.created_at, \
     COALESCE(s.sales, 0.0) AS sales, \
     (SELECT COUNT(*) FROM member c WHERE c.upline_id = m.id AND c.is_active = 1) AS downline_count \
     FROM member m \
     LEFT JOIN (SELECT member_id, SUM(amount) AS sales FROM purchase \
                WHERE status = 'completed' GROUP BY member_id) s ON s.member_id = m.id \
     WHERE m.is_active = 1";

/// One page of a member's direct downline, each entry carrying its
/// subtree down to `max_level` unless `lazy_load_levels` is set.
pub async fn get_downline(
    pool: &SqlitePool,
    member_id: i64,
    opts: &QueryOptions,
    page: i64,
    page_size: i64,
    max_level: i64,
    depth_cap: i64,
) -> AppResult<DownlinePage> {
    validate_page(page, page_size)?;
    validate_depth(max_level, depth_cap)?;
    member::require_active(pool, member_id).await?;

    let sql = format!(
        "{ROW_SELECT} AND m.upline_id = ?{}{} LIMIT ? OFFSET ?",
        filter_sql(opts),
        opts.order_clause(),
    );
    let query = sqlx::query_as::<_, MemberRow>(&sql).bind(member_id);
    let direct: Vec<MemberRow> = bind_filters!(query, opts)
        .bind(page_size)
        .bind((page - 1) * page_size)
        .fetch_all(pool)
        .await?;

    let mut visited: HashSet<i64> = HashSet::new();
    visited.insert(member_id);
    for row in &direct {
        if !visited.insert(row.id) {
            return Err(AppError::CorruptHierarchy(row.id));
        }
    }

    let deeper = if opts.lazy_load_levels || max_level < 2 {
        Vec::new()
    } else {
        let roots: Vec<i64> = direct.iter().map(|r| r.id).collect();
        fetch_levels(pool, &roots, max_level - 1, &mut visited).await?
    };

    let performance = if opts.include_performance_metrics {
        let mut ids: Vec<i64> = direct.iter().map(|r| r.id).collect();
        ids.extend(deeper.iter().flatten().map(|r| r.id));
        latest_performance(pool, &ids).await?
    } else {
        HashMap::new()
    };

    let nodes = assemble(direct, deeper, 1, &performance);

    let metadata = if opts.include_metadata {
        let count_sql = format!(
            "SELECT COUNT(*) FROM member m \
             LEFT JOIN (SELECT member_id, SUM(amount) AS sales FROM purchase \
                        WHERE status = 'completed' GROUP BY member_id) s ON s.member_id = m.id \
             WHERE m.is_active = 1 AND m.upline_id = ?{}",
            filter_sql(opts),
        );
        let query = sqlx::query_scalar::<_, i64>(&count_sql).bind(member_id);
        let total_direct: i64 = bind_filters!(query, opts).fetch_one(pool).await?;
        Some(PageMetadata {
            total_direct,
            total_pages: (total_direct + page_size - 1) / page_size,
            generated_at: shared::util::now_millis(),
        })
    } else {
        None
    };

    Ok(DownlinePage {
        member_id,
        page,
        page_size,
        max_level,
        nodes,
        metadata,
    })
}

/// Expand one node's subtree on demand. `current_level` is the parent's
/// depth relative to the original root; the returned nodes start at
/// `current_level + 1` and match what the eager path would have produced.
pub async fn load_additional_levels(
    pool: &SqlitePool,
    parent_id: i64,
    current_level: i64,
    max_level: i64,
    depth_cap: i64,
) -> AppResult<Vec<DownlineNode>> {
    if current_level < 1 {
        return Err(AppError::InvalidArgument(format!(
            "current_level must be >= 1, got {current_level}"
        )));
    }
    if max_level <= current_level {
        return Err(AppError::InvalidArgument(format!(
            "max_level ({max_level}) must exceed current_level ({current_level})"
        )));
    }
    validate_depth(max_level, depth_cap)?;
    member::require_active(pool, parent_id).await?;

    let mut visited: HashSet<i64> = HashSet::new();
    visited.insert(parent_id);
    let mut levels = fetch_levels(pool, &[parent_id], max_level - current_level, &mut visited).await?;
    if levels.is_empty() {
        return Ok(Vec::new());
    }
    let direct = levels.remove(0);
    Ok(assemble(direct, levels, current_level + 1, &HashMap::new()))
}

/// Breadth-first fetch of up to `depth` further levels below `roots`,
/// each level ordered by (created_at, id). A member reached twice is a
/// broken hierarchy and fails the whole read.
async fn fetch_levels(
    pool: &SqlitePool,
    roots: &[i64],
    depth: i64,
    visited: &mut HashSet<i64>,
) -> AppResult<Vec<Vec<MemberRow>>> {
    let mut levels: Vec<Vec<MemberRow>> = Vec::new();
    let mut frontier: Vec<i64> = roots.to_vec();
    for _ in 0..depth {
        if frontier.is_empty() {
            break;
        }
        let mut rows: Vec<MemberRow> = Vec::new();
        for chunk in frontier.chunks(SQL_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "{ROW_SELECT} AND m.upline_id IN ({placeholders}) \
                 ORDER BY m.created_at ASC, m.id ASC"
            );
            let mut query = sqlx::query_as::<_, MemberRow>(&sql);
            for id in chunk {
                query = query.bind(id);
            }
            rows.extend(query.fetch_all(pool).await?);
        }
        // Re-sort so chunking never changes the observable order.
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        for row in &rows {
            if !visited.insert(row.id) {
                return Err(AppError::CorruptHierarchy(row.id));
            }
        }
        frontier = rows.iter().map(|r| r.id).collect();
        levels.push(rows);
    }
    Ok(levels)
}

/// Latest settled-or-pending performance row per member.
async fn latest_performance(
    pool: &SqlitePool,
    ids: &[i64],
) -> AppResult<HashMap<i64, MonthlyPerformance>> {
    let mut out = HashMap::new();
    for chunk in ids.chunks(SQL_CHUNK) {
        if chunk.is_empty() {
            continue;
        }
        let placeholders = vec!["?"; chunk.len()].join(", ");
        let sql = format!(
            "SELECT * FROM monthly_performance WHERE member_id IN ({placeholders}) \
             ORDER BY year ASC, month ASC"
        );
        let mut query = sqlx::query_as::<_, MonthlyPerformance>(&sql);
        for id in chunk {
            query = query.bind(id);
        }
        for row in query.fetch_all(pool).await? {
            // Ascending order, so the last write wins with the newest period.
            out.insert(row.member_id, row);
        }
    }
    Ok(out)
}

/// Stitch flat per-level row lists into trees. Children attach to their
/// upline bottom-up, preserving each level's fetch order.
fn assemble(
    direct: Vec<MemberRow>,
    deeper: Vec<Vec<MemberRow>>,
    first_level: i64,
    performance: &HashMap<i64, MonthlyPerformance>,
) -> Vec<DownlineNode> {
    let make_node = |row: MemberRow, level: i64| {
        let performance = performance.get(&row.id).cloned();
        DownlineNode {
            member: row,
            level,
            performance,
            children: Vec::new(),
        }
    };

    let mut by_id: HashMap<i64, DownlineNode> = HashMap::new();
    let mut order: Vec<Vec<i64>> = Vec::new();
    let top_ids: Vec<i64> = direct.iter().map(|r| r.id).collect();
    for (offset, rows) in std::iter::once(direct).chain(deeper).enumerate() {
        let level = first_level + offset as i64;
        order.push(rows.iter().map(|r| r.id).collect());
        for row in rows {
            let id = row.id;
            by_id.insert(id, make_node(row, level));
        }
    }

    // Deepest level first so every child moves into a parent still in the map.
    for level_ids in order.iter().skip(1).rev() {
        for id in level_ids {
            if let Some(node) = by_id.remove(id) {
                let parent = node.member.upline_id.unwrap_or_default();
                if let Some(parent_node) = by_id.get_mut(&parent) {
                    parent_node.children.push(node);
                }
            }
        }
    }

    top_ids
        .into_iter()
        .filter_map(|id| by_id.remove(&id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64, upline_id: Option<i64>, created_at: i64) -> MemberRow {
        MemberRow {
            id,
            name: format!("m{id}"),
            email: format!("m{id}@example.com"),
            upline_id,
            rank: 0,
            created_at,
            sales: 0.0,
            downline_count: 0,
        }
    }

    #[test]
    fn assemble_nests_children_under_their_upline() {
        let direct = vec![row(2, Some(1), 10), row(3, Some(1), 20)];
        let deeper = vec![vec![row(4, Some(2), 30), row(5, Some(3), 40)]];
        let nodes = assemble(direct, deeper, 1, &HashMap::new());

        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].member.id, 2);
        assert_eq!(nodes[0].level, 1);
        assert_eq!(nodes[0].children.len(), 1);
        assert_eq!(nodes[0].children[0].member.id, 4);
        assert_eq!(nodes[0].children[0].level, 2);
        assert_eq!(nodes[1].children[0].member.id, 5);
    }

    #[test]
    fn assemble_preserves_level_order() {
        let direct = vec![row(2, Some(1), 10)];
        let deeper = vec![vec![
            row(6, Some(2), 5),
            row(4, Some(2), 5),
            row(5, Some(2), 7),
        ]];
        let nodes = assemble(direct, deeper, 1, &HashMap::new());
        let child_ids: Vec<i64> = nodes[0].children.iter().map(|c| c.member.id).collect();
        // Input order is the (created_at, id) fetch order and must survive.
        assert_eq!(child_ids, vec![6, 4, 5]);
    }

    #[test]
    fn assemble_offsets_levels_for_lazy_fragments() {
        let direct = vec![row(4, Some(2), 30)];
        let deeper = vec![vec![row(7, Some(4), 50)]];
        let nodes = assemble(direct, deeper, 3, &HashMap::new());
        assert_eq!(nodes[0].level, 3);
        assert_eq!(nodes[0].children[0].level, 4);
    }
}
