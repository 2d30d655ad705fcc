//! Variants: the size/color combinations stock is actually tracked against.

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  validate::{bounded_qty, clean_text},
};

/// Size given to the implicit variant of a product created without any.
pub const DEFAULT_SIZE: &str = "One Size";
/// Color given to the implicit variant of a product created without any.
pub const DEFAULT_COLOR: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
  pub id:         i64,
  pub product_id: i64,
  pub size:       String,
  pub color:      String,
  pub qty:        i64,
}

/// Caller-supplied variant fields, before validation.
///
/// An omitted `size`/`color` takes the default text; one that is supplied
/// but blank is rejected. The rule is the same on every creation path.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VariantInput {
  pub size:  Option<String>,
  pub color: Option<String>,
  pub qty:   Option<i64>,
}

impl VariantInput {
  pub fn new(size: impl Into<String>, color: impl Into<String>, qty: i64) -> Self {
    Self { size: Some(size.into()), color: Some(color.into()), qty: Some(qty) }
  }

  pub fn validate(&self) -> Result<VariantFields> {
    let size = match &self.size {
      None => DEFAULT_SIZE.to_owned(),
      Some(s) => clean_text(Some(s)).ok_or_else(|| Error::validation("Size is required."))?,
    };
    let color = match &self.color {
      None => DEFAULT_COLOR.to_owned(),
      Some(c) => clean_text(Some(c)).ok_or_else(|| Error::validation("Color is required."))?,
    };

    let qty = bounded_qty(self.qty.unwrap_or(0), "qty")?;

    Ok(VariantFields { size, color, qty })
  }
}

/// Validated variant fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantFields {
  pub size:  String,
  pub color: String,
  pub qty:   i64,
}

impl VariantFields {
  /// The implicit "One Size" / "N/A" variant with no stock.
  pub fn default_variant() -> Self {
    Self { size: DEFAULT_SIZE.to_owned(), color: DEFAULT_COLOR.to_owned(), qty: 0 }
  }
}
