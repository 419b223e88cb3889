//! Product Model
//!
//! Minimal referential target for purchases and rebate configuration.
//! Catalog management is out of scope for this core.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Product {
    pub id: i64,
    pub name: String,
    /// Monetary unit price.
    pub price: f64,
    /// Point volume per unit — the base for commission math, distinct
    /// from price.
    pub pv: f64,
    pub is_active: bool,
    pub created_at: i64,
}
