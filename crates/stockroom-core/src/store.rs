//! The `InventoryStore` trait and supporting result types.
//!
//! The trait is implemented by storage backends (e.g.
//! `stockroom-store-sqlite`). Higher layers (`stockroom-api`) depend on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{
  DomainError,
  category::Category,
  movement::{Movement, MovementInput, Posted, ProductMovement},
  product::{Product, ProductDeletion, ProductInput},
  variant::{Variant, VariantInput},
};

// ─── Result types ────────────────────────────────────────────────────────────

/// Identifier of a newly created row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Created {
  pub id: i64,
}

/// Number of rows an update touched. Zero means the id was unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Changes {
  pub changes: usize,
}

/// Plain acknowledgement for mutations with nothing else to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
  pub ok: bool,
}

/// One place where a cached quantity disagrees with its source rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StockDrift {
  /// `products.qty` differs from the sum of its variants.
  Product { product_id: i64, cached: i64, expected: i64 },
  /// `product_variants.qty` differs from the sum of its movements.
  Variant { variant_id: i64, cached: i64, expected: i64 },
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Stockroom inventory backend.
///
/// Every method that writes to more than one table is atomic: it either
/// applies completely or leaves no trace.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait InventoryStore: Send + Sync {
  type Error: std::error::Error + DomainError + Send + Sync + 'static;

  // ── Categories ────────────────────────────────────────────────────────

  fn list_categories(
    &self,
  ) -> impl Future<Output = Result<Vec<Category>, Self::Error>> + Send + '_;

  /// Returns an error if a category with the same name exists.
  fn create_category(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Created, Self::Error>> + Send + '_;

  // ── Products ──────────────────────────────────────────────────────────

  fn list_products(
    &self,
  ) -> impl Future<Output = Result<Vec<Product>, Self::Error>> + Send + '_;

  /// Returns `None` if not found.
  fn get_product(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Product>, Self::Error>> + Send + '_;

  /// Create a product together with its default "One Size" / "N/A" variant.
  fn create_product(
    &self,
    input: ProductInput,
  ) -> impl Future<Output = Result<Created, Self::Error>> + Send + '_;

  /// Create a product with caller-specified variants. The product's
  /// quantity starts at the sum of the variant quantities. An empty list
  /// behaves exactly like [`create_product`](Self::create_product).
  fn create_product_with_variants(
    &self,
    input: ProductInput,
    variants: Vec<VariantInput>,
  ) -> impl Future<Output = Result<Created, Self::Error>> + Send + '_;

  /// Update descriptive fields. Quantity is never settable here.
  fn update_product(
    &self,
    id: i64,
    input: ProductInput,
  ) -> impl Future<Output = Result<Changes, Self::Error>> + Send + '_;

  /// Delete a product with all of its variants and their movements.
  fn delete_product(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<ProductDeletion, Self::Error>> + Send + '_;

  // ── Variants ──────────────────────────────────────────────────────────

  /// Default variant first, then by size, then color (case-insensitive).
  fn list_variants(
    &self,
    product_id: i64,
  ) -> impl Future<Output = Result<Vec<Variant>, Self::Error>> + Send + '_;

  fn add_variant(
    &self,
    product_id: i64,
    input: VariantInput,
  ) -> impl Future<Output = Result<Created, Self::Error>> + Send + '_;

  /// Refuses to delete a product's last variant.
  fn delete_variant(
    &self,
    variant_id: i64,
  ) -> impl Future<Output = Result<Ack, Self::Error>> + Send + '_;

  // ── Movements ─────────────────────────────────────────────────────────

  /// Append a movement and apply it to the variant and product quantities.
  fn post_movement(
    &self,
    input: MovementInput,
  ) -> impl Future<Output = Result<Posted, Self::Error>> + Send + '_;

  /// Newest first. `limit` is clamped with
  /// [`clamp_limit`](crate::movement::clamp_limit).
  fn list_movements_for_variant(
    &self,
    variant_id: i64,
    limit: Option<i64>,
  ) -> impl Future<Output = Result<Vec<Movement>, Self::Error>> + Send + '_;

  fn list_movements_for_product(
    &self,
    product_id: i64,
    limit: Option<i64>,
  ) -> impl Future<Output = Result<Vec<ProductMovement>, Self::Error>> + Send + '_;

  // ── Audit ─────────────────────────────────────────────────────────────

  /// Compare every cached quantity against its source rows. An empty
  /// result means the store is consistent.
  fn verify_stock(
    &self,
  ) -> impl Future<Output = Result<Vec<StockDrift>, Self::Error>> + Send + '_;
}
