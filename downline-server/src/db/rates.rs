//! Compensation rate configuration loader.
//!
//! Reads the rate tables once per settlement run (or preview call) into a
//! validated, Decimal-typed `RatePlan`. Validation is eager: overlapping
//! performance tiers and malformed rate rows surface as
//! `ConfigurationConflict` here, never mid-settlement.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use shared::models::{BonusType, CommissionRate, PerformanceTier, RateType, RebateConfig};
use sqlx::SqlitePool;
use tracing::warn;

use crate::comp::money::to_decimal;
use crate::error::{AppError, AppResult};

/// Weaker-leg group volume rate.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupVolumeRate {
    Percentage(Decimal),
    PerTier { tier_size: Decimal, amount: Decimal },
}

/// Validated performance bonus tier.
#[derive(Debug, Clone)]
pub struct TierRate {
    pub min_sales: Decimal,
    pub max_sales: Option<Decimal>,
    pub bonus_type: BonusType,
    pub value: Decimal,
}

/// The full rate configuration consumed by the commission calculator.
#[derive(Debug, Clone, Default)]
pub struct RatePlan {
    /// Fixed bonus per qualifying new sign-up in the period.
    pub direct_referral: Option<Decimal>,
    /// Generic percentage by unilevel depth (fallback when no
    /// product-scoped rebate config exists).
    pub level_rates: BTreeMap<i64, Decimal>,
    /// (product_id, level) -> percentage.
    pub product_level_rates: HashMap<(i64, i64), Decimal>,
    /// Weaker-leg bonus rate; group volume is skipped when absent.
    pub group_volume: Option<GroupVolumeRate>,
    /// Non-overlapping, sorted by min_sales.
    pub performance_tiers: Vec<TierRate>,
}

impl RatePlan {
    /// Deepest level with any configured percentage.
    pub fn max_level(&self) -> i64 {
        let generic = self.level_rates.keys().max().copied().unwrap_or(0);
        let scoped = self
            .product_level_rates
            .keys()
            .map(|(_, level)| *level)
            .max()
            .unwrap_or(0);
        generic.max(scoped)
    }

    /// Percentage for a purchase of `product_id` seen from `level` hops
    /// up: product-scoped config first, generic level rate as fallback.
    pub fn level_percentage(&self, product_id: i64, level: i64) -> Decimal {
        self.product_level_rates
            .get(&(product_id, level))
            .or_else(|| self.level_rates.get(&level))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }
}

/// Load and validate the full rate plan.
pub async fn load_rate_plan(pool: &SqlitePool) -> AppResult<RatePlan> {
    let rates: Vec<CommissionRate> = sqlx::query_as(
        "SELECT id, rate_type, level, bonus_type, percentage, amount, tier_size, is_active, created_at FROM commission_rate WHERE is_active = 1 ORDER BY created_at, id",
    )
    .fetch_all(pool)
    .await?;

    let rebates: Vec<RebateConfig> = sqlx::query_as(
        "SELECT id, product_id, level, percentage, is_active, created_at FROM rebate_config WHERE is_active = 1 ORDER BY created_at, id",
    )
    .fetch_all(pool)
    .await?;

    let tiers: Vec<PerformanceTier> = sqlx::query_as(
        "SELECT id, min_sales, max_sales, bonus_type, value, is_active, created_at FROM performance_tier WHERE is_active = 1 ORDER BY min_sales, id",
    )
    .fetch_all(pool)
    .await?;

    build_rate_plan(rates, rebates, tiers)
}

/// Pure assembly + validation. Rows arrive ordered by creation; for
/// duplicate active (type, level) rows the most recently created wins —
/// documented behavior carried over from the source system, pending
/// product-owner clarification.
pub fn build_rate_plan(
    rates: Vec<CommissionRate>,
    rebates: Vec<RebateConfig>,
    tiers: Vec<PerformanceTier>,
) -> AppResult<RatePlan> {
    let mut plan = RatePlan::default();
    let mut seen: HashMap<(RateType, Option<i64>), i64> = HashMap::new();

    for rate in rates {
        if let Some(prev) = seen.insert((rate.rate_type, rate.level), rate.id) {
            warn!(
                target: "rates",
                rate_type = ?rate.rate_type,
                level = ?rate.level,
                superseded = prev,
                winner = rate.id,
                "Duplicate active rate rows; most recently created wins"
            );
        }
        match rate.rate_type {
            RateType::DirectReferral => {
                plan.direct_referral = Some(to_decimal(rate.amount.unwrap_or(0.0)));
            }
            RateType::LevelCommission => {
                let level = rate.level.ok_or_else(|| {
                    AppError::ConfigurationConflict(format!(
                        "level_commission rate {} has no level",
                        rate.id
                    ))
                })?;
                plan.level_rates
                    .insert(level, to_decimal(rate.percentage.unwrap_or(0.0)));
            }
            RateType::GroupVolume => {
                plan.group_volume = Some(parse_group_volume(&rate)?);
            }
        }
    }

    for cfg in rebates {
        plan.product_level_rates
            .insert((cfg.product_id, cfg.level), to_decimal(cfg.percentage));
    }

    plan.performance_tiers = validate_tiers(tiers)?;
    Ok(plan)
}

fn parse_group_volume(rate: &CommissionRate) -> AppResult<GroupVolumeRate> {
    match rate.bonus_type.unwrap_or(BonusType::Percentage) {
        BonusType::Percentage => Ok(GroupVolumeRate::Percentage(to_decimal(
            rate.percentage.unwrap_or(0.0),
        ))),
        BonusType::Fixed => {
            let tier_size = to_decimal(rate.tier_size.unwrap_or(0.0));
            if tier_size <= Decimal::ZERO {
                return Err(AppError::ConfigurationConflict(format!(
                    "group_volume rate {} is fixed-tier but has no positive tier_size",
                    rate.id
                )));
            }
            Ok(GroupVolumeRate::PerTier {
                tier_size,
                amount: to_decimal(rate.amount.unwrap_or(0.0)),
            })
        }
    }
}

/// Tiers are inclusive on both bounds; any shared point is a conflict.
fn validate_tiers(tiers: Vec<PerformanceTier>) -> AppResult<Vec<TierRate>> {
    let mut sorted: Vec<TierRate> = tiers
        .into_iter()
        .map(|t| TierRate {
            min_sales: to_decimal(t.min_sales),
            max_sales: t.max_sales.map(to_decimal),
            bonus_type: t.bonus_type,
            value: to_decimal(t.value),
        })
        .collect();
    sorted.sort_by(|a, b| a.min_sales.cmp(&b.min_sales));

    for pair in sorted.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        let overlaps = match a.max_sales {
            None => true,
            Some(max) => max >= b.min_sales,
        };
        if overlaps {
            return Err(AppError::ConfigurationConflict(format!(
                "performance tiers overlap at sales {}",
                b.min_sales
            )));
        }
    }
    Ok(sorted)
}
