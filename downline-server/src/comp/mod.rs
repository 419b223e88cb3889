//! Compensation engine
//!
//! PV aggregation, commission calculation and period settlement. The
//! aggregation and calculation layers are pure over an in-memory snapshot;
//! only the settlement processor writes.

pub mod commission;
pub mod money;
pub mod period;
pub mod pv;
pub mod settlement;
