//! Field-level normalisation shared by every input type.

use crate::{Error, Result};

/// Largest magnitude a stored quantity may reach. Quantities travel as JSON
/// numbers, so this is the largest integer a double holds exactly.
pub const MAX_QTY: i64 = 9_007_199_254_740_991;

/// Trim `value`; empty-after-trim becomes `None`.
pub fn clean_text(value: Option<&str>) -> Option<String> {
  let trimmed = value?.trim();
  if trimmed.is_empty() {
    None
  } else {
    Some(trimmed.to_owned())
  }
}

/// `value` if it is present and finite, otherwise `fallback`.
pub fn finite_or(value: Option<f64>, fallback: f64) -> f64 {
  match value {
    Some(v) if v.is_finite() => v,
    _ => fallback,
  }
}

/// `qty` if its magnitude is at most [`MAX_QTY`].
pub fn bounded_qty(qty: i64, name: &str) -> Result<i64> {
  if qty.unsigned_abs() > MAX_QTY.unsigned_abs() {
    return Err(Error::validation(format!("{name} is out of range.")));
  }
  Ok(qty)
}

/// `current + change`, refused when the total would leave `±MAX_QTY`.
pub fn add_qty(current: i64, change: i64) -> Result<i64> {
  current
    .checked_add(change)
    .filter(|total| total.unsigned_abs() <= MAX_QTY.unsigned_abs())
    .ok_or_else(|| Error::validation("Quantity is out of range."))
}
