//! Commission Calculator
//!
//! Pure computation of one member's compensation for one period, over an
//! already-loaded `PvSnapshot` and validated `RatePlan`. No side effects:
//! the settlement processor and the read-only preview endpoint call the
//! same function.

use rust_decimal::Decimal;

use crate::comp::money::{percent_of, round};
use crate::comp::pv::{LegVolumes, PvSnapshot};
use crate::db::rates::{GroupVolumeRate, RatePlan, TierRate};
use crate::error::{AppError, AppResult};
use shared::models::BonusType;

/// One planned rebate ledger row: a level-L slice of one descendant
/// purchase, credited to the member being calculated.
#[derive(Debug, Clone)]
pub struct PlannedRebate {
    pub purchase_id: i64,
    pub generator_id: i64,
    pub level: i64,
    pub percentage: Decimal,
    pub amount: Decimal,
}

/// Full commission breakdown for one member, one period.
#[derive(Debug, Clone)]
pub struct CommissionBreakdown {
    pub member_id: i64,
    pub personal_pv: Decimal,
    pub legs: LegVolumes,
    pub direct_referral_count: i64,
    pub direct_referral_bonus: Decimal,
    pub level_commissions: Decimal,
    pub group_volume_bonus: Decimal,
    pub performance_bonus: Decimal,
    pub total_commission: Decimal,
    /// The ledger rows behind `level_commissions`.
    pub rebate_rows: Vec<PlannedRebate>,
}

/// Compute the breakdown for `member_id` over the snapshot window.
pub fn calculate(
    snapshot: &PvSnapshot,
    rates: &RatePlan,
    member_id: i64,
) -> AppResult<CommissionBreakdown> {
    if !snapshot.contains(member_id) {
        return Err(AppError::MemberNotFound(member_id));
    }

    let personal_pv = snapshot.personal_pv(member_id);

    // 1. Direct referral: qualifying sign-ups × fixed amount.
    let direct_referral_count = snapshot.new_referrals(member_id);
    let direct_referral_bonus = match rates.direct_referral {
        Some(amount) => round(amount * Decimal::from(direct_referral_count)),
        None => Decimal::ZERO,
    };

    // 2. Level commissions: each level-L descendant purchase contributes
    // its PV × the configured percentage. Unconfigured levels are skipped.
    let mut rebate_rows = Vec::new();
    let mut level_commissions = Decimal::ZERO;
    let max_level = rates.max_level();
    if max_level > 0 {
        let levels = snapshot.descendants_by_level(member_id, max_level)?;
        for (idx, bucket) in levels.iter().enumerate() {
            let level = idx as i64 + 1;
            for &descendant in bucket {
                if descendant == member_id {
                    continue;
                }
                for p in snapshot.purchases_of(descendant) {
                    let percentage = rates.level_percentage(p.product_id, level);
                    if percentage <= Decimal::ZERO {
                        continue;
                    }
                    let amount = percent_of(crate::comp::money::to_decimal(p.pv_amount), percentage);
                    if amount == Decimal::ZERO {
                        continue;
                    }
                    level_commissions += amount;
                    rebate_rows.push(PlannedRebate {
                        purchase_id: p.id,
                        generator_id: descendant,
                        level,
                        percentage,
                        amount,
                    });
                }
            }
        }
    }

    // 3. Group volume: the weaker binary leg only; balanced growth is
    // what gets rewarded, the stronger leg's surplus is ignored.
    let legs = snapshot.downline_pv(member_id)?;
    let weaker_leg = legs.left_leg_pv.min(legs.right_leg_pv);
    let group_volume_bonus = match &rates.group_volume {
        Some(GroupVolumeRate::Percentage(pct)) => percent_of(weaker_leg, *pct),
        Some(GroupVolumeRate::PerTier { tier_size, amount }) => {
            round((weaker_leg / tier_size).floor() * amount)
        }
        None => Decimal::ZERO,
    };

    // 4. Performance bonus: the single tier containing personal + group
    // sales. Tiers were validated non-overlapping at load.
    let sales = personal_pv + legs.total_pv;
    let performance_bonus = match find_tier(&rates.performance_tiers, sales) {
        Some(tier) => match tier.bonus_type {
            BonusType::Percentage => percent_of(sales, tier.value),
            BonusType::Fixed => round(tier.value),
        },
        None => Decimal::ZERO,
    };

    let total_commission =
        direct_referral_bonus + level_commissions + group_volume_bonus + performance_bonus;

    Ok(CommissionBreakdown {
        member_id,
        personal_pv,
        legs,
        direct_referral_count,
        direct_referral_bonus,
        level_commissions,
        group_volume_bonus,
        performance_bonus,
        total_commission,
        rebate_rows,
    })
}

fn find_tier(tiers: &[TierRate], sales: Decimal) -> Option<&TierRate> {
    tiers.iter().find(|t| {
        sales >= t.min_sales && t.max_sales.map(|max| sales <= max).unwrap_or(true)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::purchase::CompletedPurchase;
    use shared::models::Member;
    use std::collections::BTreeMap;

    fn member(id: i64, upline: Option<i64>, created_at: i64) -> Member {
        Member {
            id,
            name: format!("member_{id}"),
            email: None,
            upline_id: upline,
            sponsor_id: upline,
            left_child_id: None,
            right_child_id: None,
            rank: 0,
            wallet_balance: 0.0,
            is_active: true,
            created_at,
            updated_at: created_at,
        }
    }

    fn purchase(id: i64, member_id: i64, product_id: i64, pv: f64) -> CompletedPurchase {
        CompletedPurchase {
            id,
            member_id,
            product_id,
            pv_amount: pv,
        }
    }

    fn level_plan(pairs: &[(i64, f64)]) -> RatePlan {
        let mut level_rates = BTreeMap::new();
        for &(level, pct) in pairs {
            level_rates.insert(level, crate::comp::money::to_decimal(pct));
        }
        RatePlan {
            level_rates,
            ..RatePlan::default()
        }
    }

    /// U2 <- U1 <- D: U1 is D's upline, U2 is U1's upline.
    fn chain() -> Vec<Member> {
        vec![
            member(100, None, 0),
            member(200, Some(100), 0),
            member(300, Some(200), 0),
        ]
    }

    #[test]
    fn level_percentages_credit_each_ancestor_once() {
        // D (300) buys PV=100 on product X; level1=10%, level2=5%.
        let snap = PvSnapshot::from_parts(
            chain(),
            vec![purchase(1, 300, 7, 100.0)],
            (0, 1000),
        );
        let plan = level_plan(&[(1, 10.0), (2, 5.0)]);

        // U1 (200) is one hop above the purchaser.
        let u1 = calculate(&snap, &plan, 200).unwrap();
        assert_eq!(u1.level_commissions, Decimal::from(10));
        assert_eq!(u1.rebate_rows.len(), 1);
        assert_eq!(u1.rebate_rows[0].level, 1);
        assert_eq!(u1.rebate_rows[0].generator_id, 300);

        // U2 (100) is two hops above.
        let u2 = calculate(&snap, &plan, 100).unwrap();
        assert_eq!(u2.level_commissions, Decimal::from(5));
        assert_eq!(u2.rebate_rows[0].level, 2);
    }

    #[test]
    fn rebate_conservation_across_the_chain() {
        // Sum of everything generated by one purchase equals
        // pv × (sum of configured level percentages) / 100.
        let snap = PvSnapshot::from_parts(
            chain(),
            vec![purchase(1, 300, 7, 100.0)],
            (0, 1000),
        );
        let plan = level_plan(&[(1, 10.0), (2, 5.0)]);
        let total: Decimal = [100, 200]
            .iter()
            .map(|&id| calculate(&snap, &plan, id).unwrap().level_commissions)
            .sum();
        assert_eq!(total, Decimal::from(15));
    }

    #[test]
    fn sub_cent_rebates_never_round_up() {
        // 10% of a 0.06 PV purchase is 0.006: paying a cent would exceed
        // the configured share, so the slice truncates to nothing.
        let snap = PvSnapshot::from_parts(
            chain(),
            vec![purchase(1, 300, 7, 0.06)],
            (0, 1000),
        );
        let plan = level_plan(&[(1, 10.0), (2, 5.0)]);
        for id in [100, 200] {
            let b = calculate(&snap, &plan, id).unwrap();
            assert_eq!(b.level_commissions, Decimal::ZERO);
            assert!(b.rebate_rows.is_empty());
        }
    }

    #[test]
    fn awkward_pv_stays_within_the_configured_share() {
        let snap = PvSnapshot::from_parts(
            chain(),
            vec![purchase(1, 300, 7, 33.35)],
            (0, 1000),
        );
        let plan = level_plan(&[(1, 7.0), (2, 3.0)]);
        let total: Decimal = [100, 200]
            .iter()
            .map(|&id| calculate(&snap, &plan, id).unwrap().level_commissions)
            .sum();
        // Bound: 33.35 × 10% = 3.335; per-row truncation lands under it.
        assert!(total <= Decimal::new(3335, 3), "total {total} over bound");
    }

    #[test]
    fn unconfigured_level_contributes_zero() {
        let snap = PvSnapshot::from_parts(
            chain(),
            vec![purchase(1, 300, 7, 100.0)],
            (0, 1000),
        );
        let plan = level_plan(&[(1, 10.0)]); // no level 2
        let u2 = calculate(&snap, &plan, 100).unwrap();
        assert_eq!(u2.level_commissions, Decimal::ZERO);
        assert!(u2.rebate_rows.is_empty());
    }

    #[test]
    fn no_self_payment_rows() {
        let snap = PvSnapshot::from_parts(
            chain(),
            vec![purchase(1, 200, 7, 50.0), purchase(2, 300, 7, 100.0)],
            (0, 1000),
        );
        let plan = level_plan(&[(1, 10.0), (2, 5.0)]);
        for id in [100, 200, 300] {
            let b = calculate(&snap, &plan, id).unwrap();
            assert!(b.rebate_rows.iter().all(|r| r.generator_id != id));
        }
    }

    #[test]
    fn direct_referral_bonus_counts_window_signups() {
        let members = vec![
            member(1, None, 0),
            member(2, Some(1), 100),  // in window
            member(3, Some(1), 5000), // outside window
        ];
        let snap = PvSnapshot::from_parts(members, vec![], (0, 1000));
        let plan = RatePlan {
            direct_referral: Some(Decimal::from(30)),
            ..RatePlan::default()
        };
        let b = calculate(&snap, &plan, 1).unwrap();
        assert_eq!(b.direct_referral_count, 1);
        assert_eq!(b.direct_referral_bonus, Decimal::from(30));
    }

    fn binary_member(id: i64, left: Option<i64>, right: Option<i64>) -> Member {
        let mut m = member(id, None, 0);
        m.left_child_id = left;
        m.right_child_id = right;
        m
    }

    fn binary_snapshot(left_pv: f64, right_pv: f64) -> PvSnapshot {
        let members = vec![
            binary_member(1, Some(2), Some(3)),
            member(2, Some(1), 0),
            member(3, Some(1), 0),
        ];
        PvSnapshot::from_parts(
            members,
            vec![purchase(1, 2, 7, left_pv), purchase(2, 3, 7, right_pv)],
            (0, 1000),
        )
    }

    #[test]
    fn group_volume_uses_weaker_leg_percentage() {
        let snap = binary_snapshot(300.0, 120.0);
        let plan = RatePlan {
            group_volume: Some(GroupVolumeRate::Percentage(Decimal::from(10))),
            ..RatePlan::default()
        };
        let b = calculate(&snap, &plan, 1).unwrap();
        assert_eq!(b.group_volume_bonus, Decimal::from(12));
    }

    #[test]
    fn weaker_leg_bonus_ignores_stronger_leg_growth() {
        let plan = RatePlan {
            group_volume: Some(GroupVolumeRate::Percentage(Decimal::from(10))),
            ..RatePlan::default()
        };
        let before = calculate(&binary_snapshot(120.0, 300.0), &plan, 1).unwrap();
        let after = calculate(&binary_snapshot(120.0, 900.0), &plan, 1).unwrap();
        assert_eq!(before.group_volume_bonus, after.group_volume_bonus);
    }

    #[test]
    fn fixed_tier_group_volume_floors_partial_tiers() {
        // weaker = 250, tier 100 -> 2 full tiers × 40 = 80
        let snap = binary_snapshot(250.0, 900.0);
        let plan = RatePlan {
            group_volume: Some(GroupVolumeRate::PerTier {
                tier_size: Decimal::from(100),
                amount: Decimal::from(40),
            }),
            ..RatePlan::default()
        };
        let b = calculate(&snap, &plan, 1).unwrap();
        assert_eq!(b.group_volume_bonus, Decimal::from(80));
    }

    #[test]
    fn performance_bonus_applies_single_containing_tier() {
        let snap = binary_snapshot(100.0, 50.0); // sales = 150 group PV
        let plan = RatePlan {
            performance_tiers: vec![
                TierRate {
                    min_sales: Decimal::ZERO,
                    max_sales: Some(Decimal::from(100)),
                    bonus_type: BonusType::Fixed,
                    value: Decimal::from(5),
                },
                TierRate {
                    min_sales: Decimal::from(101),
                    max_sales: None,
                    bonus_type: BonusType::Percentage,
                    value: Decimal::from(2),
                },
            ],
            ..RatePlan::default()
        };
        let b = calculate(&snap, &plan, 1).unwrap();
        // 2% of 150
        assert_eq!(b.performance_bonus, Decimal::from(3));
    }

    #[test]
    fn empty_plan_yields_all_zeros() {
        let snap = binary_snapshot(100.0, 50.0);
        let b = calculate(&snap, &RatePlan::default(), 1).unwrap();
        assert_eq!(b.total_commission, Decimal::ZERO);
        assert!(b.rebate_rows.is_empty());
    }

    #[test]
    fn missing_member_is_an_error() {
        let snap = binary_snapshot(0.0, 0.0);
        assert!(matches!(
            calculate(&snap, &RatePlan::default(), 42),
            Err(AppError::MemberNotFound(42))
        ));
    }
}
