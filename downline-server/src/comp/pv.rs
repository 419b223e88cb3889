//! PV Aggregator
//!
//! Loads the active-member hierarchy and the window's completed purchases
//! once, then answers personal/leg/level PV questions purely in memory.
//! Traversals use explicit worklists with visited tracking: a revisited
//! node means the stored graph is corrupt and the computation fails with
//! `CorruptHierarchy` instead of looping.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};

use rust_decimal::Decimal;
use shared::models::Member;
use sqlx::SqlitePool;

use crate::comp::money::to_decimal;
use crate::db::purchase::CompletedPurchase;
use crate::error::{AppError, AppResult};

/// Binary leg volumes for one member over the snapshot window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegVolumes {
    pub left_leg_pv: Decimal,
    pub right_leg_pv: Decimal,
    pub total_pv: Decimal,
}

impl LegVolumes {
    pub const ZERO: LegVolumes = LegVolumes {
        left_leg_pv: Decimal::ZERO,
        right_leg_pv: Decimal::ZERO,
        total_pv: Decimal::ZERO,
    };
}

#[derive(Debug, Clone)]
struct Node {
    sponsor_id: Option<i64>,
    left_child_id: Option<i64>,
    right_child_id: Option<i64>,
    created_at: i64,
}

/// One settlement run's worth of hierarchy + purchase data.
///
/// Subtree PV sums are memoised per member because sibling subtrees
/// overlap heavily across a run (every ancestor re-aggregates the same
/// descendants).
pub struct PvSnapshot {
    window: (i64, i64),
    nodes: HashMap<i64, Node>,
    /// upline -> direct downline, in id order (deterministic traversal).
    children: HashMap<i64, Vec<i64>>,
    purchases: HashMap<i64, Vec<CompletedPurchase>>,
    subtree_memo: RefCell<HashMap<i64, Decimal>>,
}

impl PvSnapshot {
    /// Load the snapshot for `[start, end]`: one roster query, one
    /// purchase query.
    pub async fn load(pool: &SqlitePool, start: i64, end: i64) -> AppResult<Self> {
        if end < start {
            return Err(AppError::InvalidArgument(format!(
                "invalid range: end {end} < start {start}"
            )));
        }
        let members = crate::db::member::active_roster(pool).await?;
        let purchases = crate::db::purchase::completed_in_window(pool, start, end).await?;
        Ok(Self::from_parts(members, purchases, (start, end)))
    }

    /// Assemble from already-loaded rows (also the test seam).
    pub fn from_parts(
        members: Vec<Member>,
        purchases: Vec<CompletedPurchase>,
        window: (i64, i64),
    ) -> Self {
        let mut nodes = HashMap::with_capacity(members.len());
        let mut children: HashMap<i64, Vec<i64>> = HashMap::new();
        for m in &members {
            nodes.insert(
                m.id,
                Node {
                    sponsor_id: m.sponsor_id,
                    left_child_id: m.left_child_id,
                    right_child_id: m.right_child_id,
                    created_at: m.created_at,
                },
            );
            if let Some(upline) = m.upline_id {
                children.entry(upline).or_default().push(m.id);
            }
        }
        for list in children.values_mut() {
            list.sort_unstable();
        }

        let mut by_member: HashMap<i64, Vec<CompletedPurchase>> = HashMap::new();
        for p in purchases {
            by_member.entry(p.member_id).or_default().push(p);
        }

        Self {
            window,
            nodes,
            children,
            purchases: by_member,
            subtree_memo: RefCell::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> (i64, i64) {
        self.window
    }

    pub fn contains(&self, member_id: i64) -> bool {
        self.nodes.contains_key(&member_id)
    }

    pub fn member_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.nodes.keys().copied()
    }

    /// Completed purchases of the member inside the window.
    pub fn purchases_of(&self, member_id: i64) -> &[CompletedPurchase] {
        self.purchases
            .get(&member_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Sum of the member's own completed purchase PV in the window.
    /// A member with no purchases yields zero, not an error.
    pub fn personal_pv(&self, member_id: i64) -> Decimal {
        self.purchases_of(member_id)
            .iter()
            .map(|p| to_decimal(p.pv_amount))
            .sum()
    }

    /// Count of members sponsored by `member_id` whose sign-up falls in
    /// the window (direct-referral qualification).
    pub fn new_referrals(&self, member_id: i64) -> i64 {
        let (start, end) = self.window;
        self.nodes
            .values()
            .filter(|n| {
                n.sponsor_id == Some(member_id) && n.created_at >= start && n.created_at <= end
            })
            .count() as i64
    }

    /// Binary leg PV: the whole subtree under each child slot.
    pub fn downline_pv(&self, member_id: i64) -> AppResult<LegVolumes> {
        let node = self
            .nodes
            .get(&member_id)
            .ok_or(AppError::MemberNotFound(member_id))?;
        let left_leg_pv = match node.left_child_id {
            Some(child) => self.subtree_pv(child)?,
            None => Decimal::ZERO,
        };
        let right_leg_pv = match node.right_child_id {
            Some(child) => self.subtree_pv(child)?,
            None => Decimal::ZERO,
        };
        Ok(LegVolumes {
            left_leg_pv,
            right_leg_pv,
            total_pv: left_leg_pv + right_leg_pv,
        })
    }

    /// Unilevel descendants bucketed by depth, `result[0]` = level 1.
    /// Levels past the deepest member come back empty.
    pub fn descendants_by_level(
        &self,
        member_id: i64,
        max_level: i64,
    ) -> AppResult<Vec<Vec<i64>>> {
        if !self.contains(member_id) {
            return Err(AppError::MemberNotFound(member_id));
        }
        let mut levels = Vec::new();
        let mut visited: HashSet<i64> = HashSet::from([member_id]);
        let mut frontier = vec![member_id];

        for _ in 0..max_level.max(0) {
            let mut next = Vec::new();
            for &parent in &frontier {
                for &child in self.children.get(&parent).map(Vec::as_slice).unwrap_or(&[]) {
                    if !visited.insert(child) {
                        return Err(AppError::CorruptHierarchy(child));
                    }
                    next.push(child);
                }
            }
            if next.is_empty() {
                break;
            }
            levels.push(next.clone());
            frontier = next;
        }
        Ok(levels)
    }

    /// Subtree PV sum rooted at `root`, following both binary slots.
    ///
    /// Iterative post-order with an on-path set: a slot edge pointing back
    /// into the current path is a cycle. A slot pointing at a member
    /// missing from the roster (inactive or dangling) contributes zero.
    fn subtree_pv(&self, root: i64) -> AppResult<Decimal> {
        if let Some(v) = self.subtree_memo.borrow().get(&root) {
            return Ok(*v);
        }
        if !self.nodes.contains_key(&root) {
            return Ok(Decimal::ZERO);
        }

        enum Frame {
            Enter(i64),
            Exit(i64),
        }

        let mut stack = vec![Frame::Enter(root)];
        let mut on_path: HashSet<i64> = HashSet::new();

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Enter(id) => {
                    if self.subtree_memo.borrow().contains_key(&id) {
                        continue;
                    }
                    if !on_path.insert(id) {
                        return Err(AppError::CorruptHierarchy(id));
                    }
                    stack.push(Frame::Exit(id));
                    let node = match self.nodes.get(&id) {
                        Some(n) => n,
                        None => continue,
                    };
                    for child in [node.left_child_id, node.right_child_id]
                        .into_iter()
                        .flatten()
                    {
                        if on_path.contains(&child) {
                            return Err(AppError::CorruptHierarchy(child));
                        }
                        if self.nodes.contains_key(&child) {
                            stack.push(Frame::Enter(child));
                        }
                    }
                }
                Frame::Exit(id) => {
                    let memo = self.subtree_memo.borrow();
                    let mut sum = self.personal_pv(id);
                    if let Some(node) = self.nodes.get(&id) {
                        for child in [node.left_child_id, node.right_child_id]
                            .into_iter()
                            .flatten()
                        {
                            sum += memo.get(&child).copied().unwrap_or(Decimal::ZERO);
                        }
                    }
                    drop(memo);
                    self.subtree_memo.borrow_mut().insert(id, sum);
                    on_path.remove(&id);
                }
            }
        }

        Ok(self
            .subtree_memo
            .borrow()
            .get(&root)
            .copied()
            .unwrap_or(Decimal::ZERO))
    }
}
