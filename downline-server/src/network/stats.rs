//! Subtree census: per-level counts and a 30-day activity figure.

use std::collections::HashSet;

use serde::Serialize;
use sqlx::SqlitePool;

use crate::db::member;
use crate::error::{AppError, AppResult};

use super::{validate_depth, SQL_CHUNK};

const THIRTY_DAYS_MS: i64 = 30 * 24 * 60 * 60 * 1000;

#[derive(Debug, Serialize)]
pub struct NetworkStatistics {
    pub member_id: i64,
    /// Root plus every active descendant within `max_level`.
    pub total_users: i64,
    pub level_counts: Vec<LevelCount>,
    /// Members of the census with a completed purchase in the last 30 days.
    pub active_users_last_30_days: i64,
    pub active_user_percentage: f64,
    pub generated_at: i64,
}

#[derive(Debug, Serialize)]
pub struct LevelCount {
    pub level: i64,
    pub count: i64,
}

pub async fn get_statistics(
    pool: &SqlitePool,
    member_id: i64,
    max_level: i64,
    depth_cap: i64,
) -> AppResult<NetworkStatistics> {
    validate_depth(max_level, depth_cap)?;
    member::require_active(pool, member_id).await?;

    let mut visited: HashSet<i64> = HashSet::new();
    visited.insert(member_id);
    let mut census: Vec<i64> = vec![member_id];
    let mut level_counts = Vec::new();

    let mut frontier = vec![member_id];
    for level in 1..=max_level {
        if frontier.is_empty() {
            break;
        }
        let mut next: Vec<i64> = Vec::new();
        for chunk in frontier.chunks(SQL_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "SELECT id FROM member WHERE is_active = 1 AND upline_id IN ({placeholders}) ORDER BY id"
            );
            let mut query = sqlx::query_scalar::<_, i64>(&sql);
            for id in chunk {
                query = query.bind(id);
            }
            next.extend(query.fetch_all(pool).await?);
        }
        for id in &next {
            if !visited.insert(*id) {
                return Err(AppError::CorruptHierarchy(*id));
            }
        }
        if !next.is_empty() {
            level_counts.push(LevelCount {
                level,
                count: next.len() as i64,
            });
        }
        census.extend(&next);
        frontier = next;
    }

    let now = shared::util::now_millis();
    let since = now - THIRTY_DAYS_MS;
    let mut active = 0i64;
    for chunk in census.chunks(SQL_CHUNK) {
        let placeholders = vec!["?"; chunk.len()].join(", ");
        let sql = format!(
            "SELECT COUNT(DISTINCT member_id) FROM purchase \
             WHERE status = 'completed' AND created_at >= ? AND member_id IN ({placeholders})"
        );
        let mut query = sqlx::query_scalar::<_, i64>(&sql).bind(since);
        for id in chunk {
            query = query.bind(id);
        }
        // Member ids never repeat across chunks, so the counts add up.
        active += query.fetch_one(pool).await?;
    }

    let total = census.len() as i64;
    let percentage = if total > 0 {
        ((active as f64 / total as f64) * 10_000.0).round() / 100.0
    } else {
        0.0
    };

    Ok(NetworkStatistics {
        member_id,
        total_users: total,
        level_counts,
        active_users_last_30_days: active,
        active_user_percentage: percentage,
        generated_at: now,
    })
}
