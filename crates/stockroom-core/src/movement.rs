//! Movements: the append-only ledger of signed stock changes.
//!
//! A movement is never updated. It is removed only when its variant (or the
//! variant's product) is deleted.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  validate::{bounded_qty, clean_text},
};

/// Page size used when the caller gives no limit (or zero).
pub const DEFAULT_LIMIT: u32 = 200;
/// Upper bound for any movement listing.
pub const MAX_LIMIT: u32 = 1000;

/// Reason recorded on the movement that seeds a variant created with stock.
pub const OPENING_STOCK_REASON: &str = "Opening stock";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
  pub id:         i64,
  pub variant_id: i64,
  pub qty_change: i64,
  pub reason:     Option<String>,
  pub sold_price: Option<f64>,
  pub created_at: NaiveDateTime,
}

/// A movement annotated with its variant's size and color, as returned by
/// product-wide listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductMovement {
  #[serde(flatten)]
  pub movement: Movement,
  pub size:     String,
  pub color:    String,
}

// ─── Input ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovementInput {
  pub variant_id: i64,
  pub qty_change: Option<i64>,
  pub reason:     Option<String>,
  pub sold_price: Option<f64>,
}

impl MovementInput {
  pub fn validate(&self) -> Result<MovementFields> {
    let qty_change = match self.qty_change {
      Some(q) if q != 0 => bounded_qty(q, "qty_change")?,
      _ => return Err(Error::validation("qty_change must be a non-zero number.")),
    };

    if let Some(price) = self.sold_price {
      if !price.is_finite() || price < 0.0 {
        return Err(Error::validation("sold_price must be a non-negative number."));
      }
      if qty_change > 0 {
        return Err(Error::validation(
          "sold_price is only allowed for stock-out movements.",
        ));
      }
    }

    Ok(MovementFields {
      variant_id: self.variant_id,
      qty_change,
      reason: clean_text(self.reason.as_deref()),
      sold_price: self.sold_price,
    })
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MovementFields {
  pub variant_id: i64,
  pub qty_change: i64,
  pub reason:     Option<String>,
  pub sold_price: Option<f64>,
}

/// Acknowledgement returned after a movement is posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posted {
  pub ok:         bool,
  pub variant_id: i64,
}

/// Clamp a requested page size into `1..=MAX_LIMIT`; absent or zero means
/// [`DEFAULT_LIMIT`].
pub fn clamp_limit(limit: Option<i64>) -> u32 {
  match limit {
    None | Some(0) => DEFAULT_LIMIT,
    Some(n) => n.clamp(1, i64::from(MAX_LIMIT)) as u32,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn change(variant_id: i64, qty_change: i64) -> MovementInput {
    MovementInput { variant_id, qty_change: Some(qty_change), ..MovementInput::default() }
  }

  fn sale(variant_id: i64, qty: i64, price: f64) -> MovementInput {
    MovementInput { sold_price: Some(price), ..change(variant_id, -qty) }
  }

  #[test]
  fn zero_change_is_rejected() {
    let err = change(1, 0).validate().unwrap_err();
    assert_eq!(err.to_string(), "qty_change must be a non-zero number.");
    assert!(MovementInput { variant_id: 1, ..MovementInput::default() }.validate().is_err());
  }

  #[test]
  fn sold_price_only_on_stock_out() {
    let err = MovementInput { sold_price: Some(10.0), ..change(1, 5) }.validate().unwrap_err();
    assert_eq!(err.to_string(), "sold_price is only allowed for stock-out movements.");

    let ok = sale(1, 3, 20.0).validate().unwrap();
    assert_eq!(ok.qty_change, -3);
    assert_eq!(ok.sold_price, Some(20.0));
  }

  #[test]
  fn negative_or_non_finite_price_is_rejected() {
    for price in [-1.0, f64::NAN, f64::NEG_INFINITY] {
      let err = sale(1, 3, price).validate().unwrap_err();
      assert_eq!(err.to_string(), "sold_price must be a non-negative number.");
    }
  }

  #[test]
  fn blank_reason_is_dropped() {
    let fields = MovementInput { reason: Some("  ".into()), ..change(1, 2) }.validate().unwrap();
    assert_eq!(fields.reason, None);
  }

  #[test]
  fn oversized_change_is_rejected() {
    let err = change(1, i64::MAX).validate().unwrap_err();
    assert_eq!(err.to_string(), "qty_change is out of range.");
    assert!(change(1, i64::MIN).validate().is_err());
  }

  #[test]
  fn limit_is_clamped() {
    assert_eq!(clamp_limit(None), 200);
    assert_eq!(clamp_limit(Some(0)), 200);
    assert_eq!(clamp_limit(Some(-5)), 1);
    assert_eq!(clamp_limit(Some(50)), 50);
    assert_eq!(clamp_limit(Some(5000)), 1000);
  }
}
