//! Inventory operations against a migrated connection.
//!
//! These run on the store's connection thread. Input is validated before the
//! first statement executes; every operation that writes more than one row
//! does so inside a single transaction, so `products.qty` and
//! `product_variants.qty` move together with the ledger or not at all.

use rusqlite::{Connection, OptionalExtension as _, Transaction, params};
use stockroom_core::{
  category::{Category, category_name},
  movement::{Movement, MovementInput, OPENING_STOCK_REASON, Posted, ProductMovement, clamp_limit},
  product::{Product, ProductDeletion, ProductInput},
  store::{Ack, Changes, Created, StockDrift},
  validate::add_qty,
  variant::{DEFAULT_COLOR, DEFAULT_SIZE, Variant, VariantFields, VariantInput},
};
use tracing::debug;

use crate::{
  Result,
  encode::{
    PRODUCT_COLUMNS, RawMovement, category_from_row, product_from_row, translate,
    variant_from_row,
  },
};

// ─── Categories ──────────────────────────────────────────────────────────────

pub fn list_categories(conn: &Connection) -> Result<Vec<Category>> {
  let mut stmt = conn.prepare("SELECT id, name FROM categories ORDER BY name COLLATE NOCASE, id")?;
  let rows = stmt
    .query_map([], category_from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

pub fn create_category(conn: &Connection, name: Option<&str>) -> Result<Created> {
  let name = category_name(name)?;
  conn
    .execute("INSERT INTO categories (name) VALUES (?1)", params![name])
    .map_err(translate)?;
  Ok(Created { id: conn.last_insert_rowid() })
}

// ─── Products ────────────────────────────────────────────────────────────────

pub fn list_products(conn: &Connection) -> Result<Vec<Product>> {
  let mut stmt = conn.prepare(&format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id"))?;
  let rows = stmt
    .query_map([], product_from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

pub fn get_product(conn: &Connection, id: i64) -> Result<Option<Product>> {
  Ok(
    conn
      .query_row(
        &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"),
        params![id],
        product_from_row,
      )
      .optional()?,
  )
}

/// Insert a product and its variants. With no variants the product gets the
/// default "One Size" / "N/A" variant.
pub fn create_product(
  conn: &mut Connection,
  input: &ProductInput,
  variants: &[VariantInput],
) -> Result<Created> {
  let product = input.validate()?;
  let variants = if variants.is_empty() {
    vec![VariantFields::default_variant()]
  } else {
    variants
      .iter()
      .map(VariantInput::validate)
      .collect::<stockroom_core::Result<Vec<_>>>()?
  };
  let total = variants.iter().try_fold(0, |total, v| add_qty(total, v.qty))?;

  let tx = conn.transaction()?;
  tx.execute(
    "INSERT INTO products (name, sku, category_id, cost_price, sell_price, qty)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    params![
      product.name,
      product.sku,
      product.category_id,
      product.cost_price,
      product.sell_price,
      total,
    ],
  )
  .map_err(translate)?;
  let product_id = tx.last_insert_rowid();

  for variant in &variants {
    insert_variant(&tx, product_id, variant)?;
  }
  tx.commit()?;

  debug!(product_id, variants = variants.len(), qty = total, "product created");
  Ok(Created { id: product_id })
}

pub fn update_product(conn: &Connection, id: i64, input: &ProductInput) -> Result<Changes> {
  let product = input.validate()?;
  let changes = conn
    .execute(
      "UPDATE products
       SET name = ?1, sku = ?2, category_id = ?3, cost_price = ?4, sell_price = ?5
       WHERE id = ?6",
      params![
        product.name,
        product.sku,
        product.category_id,
        product.cost_price,
        product.sell_price,
        id,
      ],
    )
    .map_err(translate)?;
  Ok(Changes { changes })
}

/// Remove a product, its variants, and every movement against them.
pub fn delete_product(conn: &mut Connection, id: i64) -> Result<ProductDeletion> {
  let tx = conn.transaction()?;

  let deleted_movements = tx.execute(
    "DELETE FROM movements
     WHERE variant_id IN (SELECT id FROM product_variants WHERE product_id = ?1)",
    params![id],
  )?;
  let deleted_variants =
    tx.execute("DELETE FROM product_variants WHERE product_id = ?1", params![id])?;
  let deleted_products = tx.execute("DELETE FROM products WHERE id = ?1", params![id])?;

  tx.commit()?;

  debug!(product_id = id, deleted_movements, deleted_variants, deleted_products, "product deleted");
  Ok(ProductDeletion { deleted_movements, deleted_variants, deleted_products })
}

// ─── Variants ────────────────────────────────────────────────────────────────

pub fn list_variants(conn: &Connection, product_id: i64) -> Result<Vec<Variant>> {
  let mut stmt = conn.prepare(
    "SELECT id, product_id, size, color, qty
     FROM product_variants
     WHERE product_id = ?1
     ORDER BY
       CASE WHEN size = ?2 AND color = ?3 THEN 0 ELSE 1 END,
       size COLLATE NOCASE,
       color COLLATE NOCASE",
  )?;
  let rows = stmt
    .query_map(params![product_id, DEFAULT_SIZE, DEFAULT_COLOR], variant_from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

pub fn add_variant(conn: &mut Connection, product_id: i64, input: &VariantInput) -> Result<Created> {
  let variant = input.validate()?;

  let tx = conn.transaction()?;
  let product_qty: Option<i64> = tx
    .query_row("SELECT qty FROM products WHERE id = ?1", params![product_id], |row| row.get(0))
    .optional()?;
  if let Some(qty) = product_qty {
    add_qty(qty, variant.qty)?;
  }

  let variant_id = insert_variant(&tx, product_id, &variant)?;
  tx.execute(
    "UPDATE products SET qty = qty + ?1 WHERE id = ?2",
    params![variant.qty, product_id],
  )?;
  tx.commit()?;

  debug!(product_id, variant_id, qty = variant.qty, "variant added");
  Ok(Created { id: variant_id })
}

/// Delete a variant and its movements. A product's last variant is kept.
pub fn delete_variant(conn: &mut Connection, variant_id: i64) -> Result<Ack> {
  let tx = conn.transaction()?;

  let (product_id, qty): (i64, i64) = tx
    .query_row(
      "SELECT product_id, qty FROM product_variants WHERE id = ?1",
      params![variant_id],
      |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .optional()?
    .ok_or(stockroom_core::Error::VariantNotFound(variant_id))?;

  let siblings: i64 = tx.query_row(
    "SELECT COUNT(*) FROM product_variants WHERE product_id = ?1",
    params![product_id],
    |row| row.get(0),
  )?;
  if siblings <= 1 {
    return Err(stockroom_core::Error::LastVariant.into());
  }

  tx.execute("DELETE FROM movements WHERE variant_id = ?1", params![variant_id])?;
  tx.execute("DELETE FROM product_variants WHERE id = ?1", params![variant_id])?;
  tx.execute(
    "UPDATE products SET qty = qty - ?1 WHERE id = ?2",
    params![qty, product_id],
  )?;
  tx.commit()?;

  debug!(product_id, variant_id, qty, "variant deleted");
  Ok(Ack { ok: true })
}

/// Insert one variant row, plus an opening-stock movement when it starts
/// with a non-zero quantity. Does not touch `products.qty`.
fn insert_variant(tx: &Transaction<'_>, product_id: i64, variant: &VariantFields) -> Result<i64> {
  tx.execute(
    "INSERT INTO product_variants (product_id, size, color, qty) VALUES (?1, ?2, ?3, ?4)",
    params![product_id, variant.size, variant.color, variant.qty],
  )
  .map_err(translate)?;
  let variant_id = tx.last_insert_rowid();

  if variant.qty != 0 {
    tx.execute(
      "INSERT INTO movements (variant_id, qty_change, reason) VALUES (?1, ?2, ?3)",
      params![variant_id, variant.qty, OPENING_STOCK_REASON],
    )?;
  }
  Ok(variant_id)
}

// ─── Movements ───────────────────────────────────────────────────────────────

/// Append a movement and apply it to both the variant and its product.
pub fn post_movement(conn: &mut Connection, input: &MovementInput) -> Result<Posted> {
  let movement = input.validate()?;
  let variant_id = movement.variant_id;

  let tx = conn.transaction()?;

  let (product_id, variant_qty, product_qty): (i64, i64, i64) = tx
    .query_row(
      "SELECT v.product_id, v.qty, p.qty
       FROM product_variants v
       JOIN products p ON p.id = v.product_id
       WHERE v.id = ?1",
      params![variant_id],
      |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )
    .optional()?
    .ok_or(stockroom_core::Error::VariantNotFound(variant_id))?;
  add_qty(variant_qty, movement.qty_change)?;
  add_qty(product_qty, movement.qty_change)?;

  tx.execute(
    "INSERT INTO movements (variant_id, qty_change, reason, sold_price) VALUES (?1, ?2, ?3, ?4)",
    params![variant_id, movement.qty_change, movement.reason, movement.sold_price],
  )?;
  tx.execute(
    "UPDATE product_variants SET qty = qty + ?1 WHERE id = ?2",
    params![movement.qty_change, variant_id],
  )?;
  tx.execute(
    "UPDATE products SET qty = qty + ?1 WHERE id = ?2",
    params![movement.qty_change, product_id],
  )?;
  tx.commit()?;

  debug!(product_id, variant_id, qty_change = movement.qty_change, "movement posted");
  Ok(Posted { ok: true, variant_id })
}

pub fn list_movements_for_variant(
  conn: &Connection,
  variant_id: i64,
  limit: Option<i64>,
) -> Result<Vec<Movement>> {
  let mut stmt = conn.prepare(
    "SELECT id, variant_id, qty_change, reason, sold_price, created_at
     FROM movements
     WHERE variant_id = ?1
     ORDER BY datetime(created_at) DESC, id DESC
     LIMIT ?2",
  )?;
  let raws = stmt
    .query_map(params![variant_id, clamp_limit(limit)], |row| RawMovement::from_row(row, false))?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  raws.into_iter().map(RawMovement::into_movement).collect()
}

pub fn list_movements_for_product(
  conn: &Connection,
  product_id: i64,
  limit: Option<i64>,
) -> Result<Vec<ProductMovement>> {
  let mut stmt = conn.prepare(
    "SELECT m.id, m.variant_id, m.qty_change, m.reason, m.sold_price, m.created_at,
            v.size, v.color
     FROM movements m
     JOIN product_variants v ON v.id = m.variant_id
     WHERE v.product_id = ?1
     ORDER BY datetime(m.created_at) DESC, m.id DESC
     LIMIT ?2",
  )?;
  let raws = stmt
    .query_map(params![product_id, clamp_limit(limit)], |row| RawMovement::from_row(row, true))?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  raws.into_iter().map(RawMovement::into_product_movement).collect()
}

// ─── Audit ───────────────────────────────────────────────────────────────────

pub fn verify_stock(conn: &Connection) -> Result<Vec<StockDrift>> {
  let mut drift = Vec::new();

  let mut stmt = conn.prepare(
    "SELECT p.id, p.qty, COALESCE(SUM(v.qty), 0) AS expected
     FROM products p
     LEFT JOIN product_variants v ON v.product_id = p.id
     GROUP BY p.id
     HAVING p.qty != expected
     ORDER BY p.id",
  )?;
  let products = stmt.query_map([], |row| {
    Ok(StockDrift::Product {
      product_id: row.get(0)?,
      cached:     row.get(1)?,
      expected:   row.get(2)?,
    })
  })?;
  for row in products {
    drift.push(row?);
  }

  let mut stmt = conn.prepare(
    "SELECT v.id, v.qty, COALESCE(SUM(m.qty_change), 0) AS expected
     FROM product_variants v
     LEFT JOIN movements m ON m.variant_id = v.id
     GROUP BY v.id
     HAVING v.qty != expected
     ORDER BY v.id",
  )?;
  let variants = stmt.query_map([], |row| {
    Ok(StockDrift::Variant {
      variant_id: row.get(0)?,
      cached:     row.get(1)?,
      expected:   row.get(2)?,
    })
  })?;
  for row in variants {
    drift.push(row?);
  }

  if !drift.is_empty() {
    debug!(count = drift.len(), "stock drift found");
  }
  Ok(drift)
}
