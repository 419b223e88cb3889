//! downline-server — MLM compensation and hierarchy query service
//!
//! Long-running service that:
//! - Records members, binary placements and completed purchases
//! - Computes commissions (direct referral, level, group volume, tiers)
//! - Settles cutoff periods into an append-only rebate/wallet ledger
//! - Serves paginated, cached hierarchy reads for display

pub mod api;
pub mod comp;
pub mod config;
pub mod db;
pub mod error;
pub mod network;
pub mod rate_limit;
pub mod state;

pub use config::Config;
pub use error::{AppError, AppResponse, AppResult};
pub use state::AppState;
