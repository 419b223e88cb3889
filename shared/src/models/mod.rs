//! Domain models persisted by downline-server.

pub mod ledger;
pub mod member;
pub mod performance;
pub mod product;
pub mod purchase;
pub mod rates;

pub use ledger::{Rebate, RebateStatus, WalletTransaction, WalletTxKind};
pub use member::{Member, MemberCreate, Placement};
pub use performance::MonthlyPerformance;
pub use product::Product;
pub use purchase::{Purchase, PurchaseStatus};
pub use rates::{BonusType, CommissionRate, PerformanceTier, RateType, RebateConfig};
