//! Lenient conversion of positional JSON arguments into typed inputs.
//!
//! Callers send loosely typed values: ids and prices may arrive as numbers
//! or numeric strings, and optional fields may be `null`, missing, or blank.
//! Numbers that cannot be read fall back to the field's default; ids that
//! cannot be read are rejected before anything touches the store.

use serde_json::Value;
use stockroom_core::{
  movement::MovementInput,
  product::ProductInput,
  variant::VariantInput,
};

use crate::error::ApiError;

static NULL: Value = Value::Null;

/// Largest integer a JSON number holds exactly as a double.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// The argument list of one invocation.
#[derive(Debug, Default)]
pub struct Args(Vec<Value>);

impl Args {
  pub fn new(values: Vec<Value>) -> Self { Self(values) }

  fn arg(&self, index: usize) -> &Value { self.0.get(index).unwrap_or(&NULL) }

  /// A required row id. `message` is returned verbatim when it is missing
  /// or not an integer.
  pub fn id(&self, index: usize, message: &str) -> Result<i64, ApiError> {
    integer(self.arg(index)).ok_or_else(|| ApiError::BadRequest(message.to_owned()))
  }

  /// An optional page size; anything unreadable means "use the default".
  pub fn limit(&self, index: usize) -> Option<i64> { integer(self.arg(index)) }

  pub fn text(&self, index: usize) -> Option<String> { text(self.arg(index)) }

  pub fn product(&self, index: usize) -> Result<ProductInput, ApiError> {
    product(self.arg(index))
  }

  /// A list of variants; `null` or missing is an empty list.
  pub fn variants(&self, index: usize) -> Result<Vec<VariantInput>, ApiError> {
    match self.arg(index) {
      Value::Null => Ok(Vec::new()),
      Value::Array(items) => items.iter().map(variant).collect(),
      _ => Err(ApiError::BadRequest("Variants must be a list.".to_owned())),
    }
  }

  /// `{product_id, size, color, qty}`
  pub fn new_variant(&self, index: usize) -> Result<(i64, VariantInput), ApiError> {
    let value = self.arg(index);
    let product_id = integer(field(value, &["product_id", "productId"]))
      .ok_or_else(|| ApiError::BadRequest("Invalid product_id.".to_owned()))?;
    Ok((product_id, variant(value)?))
  }

  /// `{variant_id, qty_change, reason, sold_price}`
  pub fn movement(&self, index: usize) -> Result<MovementInput, ApiError> {
    let value = self.arg(index);
    let variant_id = integer(field(value, &["variant_id", "variantId"]))
      .ok_or_else(|| ApiError::BadRequest("Invalid variant_id.".to_owned()))?;

    Ok(MovementInput {
      variant_id,
      qty_change: quantity(field(value, &["qty_change", "qtyChange"]), "qty_change")?,
      reason:     text(field(value, &["reason"])),
      sold_price: sold_price(field(value, &["sold_price", "soldPrice"])),
    })
  }
}

// ─── Objects ─────────────────────────────────────────────────────────────────

/// First present key among `keys`; non-objects have no fields.
fn field<'a>(value: &'a Value, keys: &[&str]) -> &'a Value {
  keys
    .iter()
    .find_map(|key| value.get(*key).filter(|v| !v.is_null()))
    .unwrap_or(&NULL)
}

fn product(value: &Value) -> Result<ProductInput, ApiError> {
  let category_id = match field(value, &["category_id", "categoryId"]) {
    Value::Null => None,
    Value::String(s) if s.trim().is_empty() => None,
    other => Some(
      integer(other).ok_or_else(|| ApiError::BadRequest("Invalid category_id.".to_owned()))?,
    ),
  };

  Ok(ProductInput {
    name: text(field(value, &["name"])),
    sku: text(field(value, &["sku"])),
    category_id,
    cost_price: number(field(value, &["cost_price", "costPrice"])),
    sell_price: number(field(value, &["sell_price", "sellPrice"])),
  })
}

fn variant(value: &Value) -> Result<VariantInput, ApiError> {
  Ok(VariantInput {
    size:  text(field(value, &["size"])),
    color: text(field(value, &["color"])),
    qty:   quantity(field(value, &["qty"]), "qty")?,
  })
}

// ─── Scalars ─────────────────────────────────────────────────────────────────

fn text(value: &Value) -> Option<String> {
  match value {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    _ => None,
  }
}

/// A finite number, from a JSON number or a numeric string.
fn number(value: &Value) -> Option<f64> {
  let n = match value {
    Value::Number(n) => n.as_f64()?,
    Value::String(s) => s.trim().parse().ok()?,
    _ => return None,
  };
  n.is_finite().then_some(n)
}

fn integer(value: &Value) -> Option<i64> {
  if let Some(i) = value.as_i64() {
    return Some(i);
  }
  let n = number(value)?;
  (n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER).then_some(n as i64)
}

/// A stock quantity: whole units only. Unreadable values fall back to the
/// default, fractional ones are refused.
fn quantity(value: &Value, name: &str) -> Result<Option<i64>, ApiError> {
  if let Some(i) = integer(value) {
    return Ok(Some(i));
  }
  match number(value) {
    Some(_) => Err(ApiError::BadRequest(format!("{name} must be a whole number."))),
    None => Ok(None),
  }
}

/// Absent stays absent; anything present but unreadable becomes NaN so the
/// movement validator rejects it.
fn sold_price(value: &Value) -> Option<f64> {
  match value {
    Value::Null => None,
    Value::String(s) if s.trim().is_empty() => None,
    other => Some(number(other).unwrap_or(f64::NAN)),
  }
}
