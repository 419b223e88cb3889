//! Store access layer
//!
//! Write-side and settlement-facing queries against the hierarchy and
//! ledger stores. The hierarchy read service (`crate::network`) owns its
//! own read queries.

pub mod ledger;
pub mod member;
pub mod purchase;
pub mod rates;
