//! Products: the catalogue entry that owns variants.
//!
//! `qty` on a product is a cached aggregate: it always equals the sum of the
//! product's variant quantities. It is never written directly by callers;
//! variant and movement operations keep it in step.

use serde::{Deserialize, Serialize};

use crate::{Error, Result, validate::{clean_text, finite_or}};

// ─── Stored ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
  pub id:          i64,
  pub name:        String,
  pub sku:         Option<String>,
  pub category_id: Option<i64>,
  pub cost_price:  f64,
  pub sell_price:  f64,
  pub qty:         i64,
}

// ─── Input ───────────────────────────────────────────────────────────────────

/// Caller-supplied product fields, before validation.
///
/// Used for both creation and update. `qty` is intentionally absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductInput {
  pub name:        Option<String>,
  pub sku:         Option<String>,
  pub category_id: Option<i64>,
  pub cost_price:  Option<f64>,
  pub sell_price:  Option<f64>,
}

impl ProductInput {
  pub fn named(name: impl Into<String>) -> Self {
    Self { name: Some(name.into()), ..Self::default() }
  }

  pub fn validate(&self) -> Result<ProductFields> {
    let name = clean_text(self.name.as_deref())
      .ok_or_else(|| Error::validation("Name is required."))?;

    Ok(ProductFields {
      name,
      sku:         clean_text(self.sku.as_deref()),
      category_id: self.category_id,
      cost_price:  finite_or(self.cost_price, 0.0),
      sell_price:  finite_or(self.sell_price, 0.0),
    })
  }
}

/// Validated product fields, ready to bind into a statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductFields {
  pub name:        String,
  pub sku:         Option<String>,
  pub category_id: Option<i64>,
  pub cost_price:  f64,
  pub sell_price:  f64,
}

// ─── Results ─────────────────────────────────────────────────────────────────

/// Row counts removed by a product delete, one per level of the cascade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDeletion {
  pub deleted_movements: usize,
  pub deleted_variants:  usize,
  pub deleted_products:  usize,
}
