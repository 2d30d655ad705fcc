//! Mapping between SQLite rows / errors and Rust domain types.
//!
//! Timestamps are stored by SQLite's `CURRENT_TIMESTAMP` as
//! `YYYY-MM-DD HH:MM:SS` text in UTC. Unique-constraint failures are turned
//! into a [`Constraint`] descriptor so callers never inspect message text.

use chrono::NaiveDateTime;
use rusqlite::{Row, ffi};
use stockroom_core::{
  category::Category,
  movement::{Movement, ProductMovement},
  product::Product,
  variant::Variant,
};

use crate::{Error, Result};

// ─── Constraint violations ───────────────────────────────────────────────────

/// The uniqueness constraints the schema declares and the service knows how
/// to explain to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
  /// `products.sku`
  ProductSku,
  /// `ux_variant_product_size_color` on `product_variants`.
  VariantSizeColor,
  /// `categories.name`
  CategoryName,
}

impl Constraint {
  fn identify(table: &str, columns: &[&str]) -> Option<Self> {
    match (table, columns) {
      ("products", ["sku"]) => Some(Constraint::ProductSku),
      ("product_variants", ["product_id", "size", "color"]) => Some(Constraint::VariantSizeColor),
      ("categories", ["name"]) => Some(Constraint::CategoryName),
      _ => None,
    }
  }

  fn from_index(index: &str) -> Option<Self> {
    match index {
      "ux_variant_product_size_color" => Some(Constraint::VariantSizeColor),
      _ => None,
    }
  }
}

impl From<Constraint> for stockroom_core::Error {
  fn from(c: Constraint) -> Self {
    match c {
      Constraint::ProductSku => stockroom_core::Error::SkuExists,
      Constraint::VariantSizeColor => stockroom_core::Error::VariantExists,
      Constraint::CategoryName => stockroom_core::Error::CategoryExists,
    }
  }
}

/// Identify which known uniqueness constraint `err` violated, if any.
///
/// SQLite reports unique failures as
/// `UNIQUE constraint failed: table.col[, table.col]*`, or
/// `UNIQUE constraint failed: index 'name'` for expression indexes.
pub fn violated_constraint(err: &rusqlite::Error) -> Option<Constraint> {
  let rusqlite::Error::SqliteFailure(failure, Some(message)) = err else {
    return None;
  };
  if failure.extended_code != ffi::SQLITE_CONSTRAINT_UNIQUE {
    return None;
  }

  let target = message.strip_prefix("UNIQUE constraint failed: ")?;
  if let Some(index) = target.strip_prefix("index '") {
    return Constraint::from_index(index.trim_end_matches('\''));
  }

  let mut table = None;
  let mut columns = Vec::new();
  for qualified in target.split(", ") {
    let (t, column) = qualified.split_once('.')?;
    if *table.get_or_insert(t) != t {
      return None;
    }
    columns.push(column);
  }
  Constraint::identify(table?, &columns)
}

/// Translate a statement failure: known uniqueness violations become domain
/// errors, everything else propagates unchanged.
pub fn translate(err: rusqlite::Error) -> Error {
  match violated_constraint(&err) {
    Some(constraint) => Error::Core(constraint.into()),
    None => Error::Sqlite(err),
  }
}

// ─── Timestamps ──────────────────────────────────────────────────────────────

pub fn decode_timestamp(s: &str) -> Result<NaiveDateTime> {
  NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
    .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const PRODUCT_COLUMNS: &str = "id, name, sku, category_id, cost_price, sell_price, qty";

pub fn product_from_row(row: &Row<'_>) -> rusqlite::Result<Product> {
  Ok(Product {
    id:          row.get(0)?,
    name:        row.get(1)?,
    sku:         row.get(2)?,
    category_id: row.get(3)?,
    cost_price:  row.get(4)?,
    sell_price:  row.get(5)?,
    qty:         row.get(6)?,
  })
}

pub fn variant_from_row(row: &Row<'_>) -> rusqlite::Result<Variant> {
  Ok(Variant {
    id:         row.get(0)?,
    product_id: row.get(1)?,
    size:       row.get(2)?,
    color:      row.get(3)?,
    qty:        row.get(4)?,
  })
}

pub fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
  Ok(Category { id: row.get(0)?, name: row.get(1)? })
}

/// A `movements` row with its timestamp still as text.
pub struct RawMovement {
  pub id:         i64,
  pub variant_id: i64,
  pub qty_change: i64,
  pub reason:     Option<String>,
  pub sold_price: Option<f64>,
  pub created_at: Option<String>,
  // only set by product-wide listings
  pub size:       Option<String>,
  pub color:      Option<String>,
}

impl RawMovement {
  /// Reads `id, variant_id, qty_change, reason, sold_price, created_at`
  /// followed, when `annotated`, by the variant's `size, color`.
  pub fn from_row(row: &Row<'_>, annotated: bool) -> rusqlite::Result<Self> {
    Ok(RawMovement {
      id:         row.get(0)?,
      variant_id: row.get(1)?,
      qty_change: row.get(2)?,
      reason:     row.get(3)?,
      sold_price: row.get(4)?,
      created_at: row.get(5)?,
      size:       if annotated { row.get(6)? } else { None },
      color:      if annotated { row.get(7)? } else { None },
    })
  }

  pub fn into_movement(self) -> Result<Movement> {
    let created_at = self
      .created_at
      .as_deref()
      .ok_or_else(|| Error::DateParse(format!("movement {} has no timestamp", self.id)))
      .and_then(decode_timestamp)?;

    Ok(Movement {
      id: self.id,
      variant_id: self.variant_id,
      qty_change: self.qty_change,
      reason: self.reason,
      sold_price: self.sold_price,
      created_at,
    })
  }

  pub fn into_product_movement(mut self) -> Result<ProductMovement> {
    let size = self.size.take().unwrap_or_default();
    let color = self.color.take().unwrap_or_default();
    Ok(ProductMovement { movement: self.into_movement()?, size, color })
  }
}
