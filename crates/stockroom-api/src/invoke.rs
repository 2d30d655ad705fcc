//! The operation table behind `POST /invoke/{operation}`.
//!
//! | Operation | Arguments |
//! |-----------|-----------|
//! | `listProducts` | |
//! | `getProductById` | `id` |
//! | `createProduct` | `product` |
//! | `createProductWithVariants` | `product, variants` |
//! | `updateProduct` | `id, updates` |
//! | `deleteProduct` | `id` |
//! | `listVariantsForProduct` | `productId` |
//! | `addVariant` | `{product_id, size, color, qty}` |
//! | `deleteVariant` | `variantId` |
//! | `postMovement` | `{variant_id, qty_change, reason, sold_price}` |
//! | `listMovementsForVariant` | `variantId, limit` |
//! | `listMovementsForProduct` | `productId, limit` |
//! | `listCategories` | |
//! | `createCategory` | `name` |
//! | `verifyStock` | |

use std::{fmt, str::FromStr};

use serde::Serialize;
use serde_json::Value;
use stockroom_core::{DomainError, store::InventoryStore};

use crate::{coerce::Args, error::ApiError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
  ListProducts,
  GetProductById,
  CreateProduct,
  CreateProductWithVariants,
  UpdateProduct,
  DeleteProduct,
  ListVariantsForProduct,
  AddVariant,
  DeleteVariant,
  PostMovement,
  ListMovementsForVariant,
  ListMovementsForProduct,
  ListCategories,
  CreateCategory,
  VerifyStock,
}

impl Operation {
  pub const ALL: [Operation; 15] = [
    Operation::ListProducts,
    Operation::GetProductById,
    Operation::CreateProduct,
    Operation::CreateProductWithVariants,
    Operation::UpdateProduct,
    Operation::DeleteProduct,
    Operation::ListVariantsForProduct,
    Operation::AddVariant,
    Operation::DeleteVariant,
    Operation::PostMovement,
    Operation::ListMovementsForVariant,
    Operation::ListMovementsForProduct,
    Operation::ListCategories,
    Operation::CreateCategory,
    Operation::VerifyStock,
  ];

  pub fn name(self) -> &'static str {
    match self {
      Operation::ListProducts => "listProducts",
      Operation::GetProductById => "getProductById",
      Operation::CreateProduct => "createProduct",
      Operation::CreateProductWithVariants => "createProductWithVariants",
      Operation::UpdateProduct => "updateProduct",
      Operation::DeleteProduct => "deleteProduct",
      Operation::ListVariantsForProduct => "listVariantsForProduct",
      Operation::AddVariant => "addVariant",
      Operation::DeleteVariant => "deleteVariant",
      Operation::PostMovement => "postMovement",
      Operation::ListMovementsForVariant => "listMovementsForVariant",
      Operation::ListMovementsForProduct => "listMovementsForProduct",
      Operation::ListCategories => "listCategories",
      Operation::CreateCategory => "createCategory",
      Operation::VerifyStock => "verifyStock",
    }
  }
}

impl fmt::Display for Operation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

impl FromStr for Operation {
  type Err = ApiError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Operation::ALL
      .into_iter()
      .find(|op| op.name() == s)
      .ok_or_else(|| ApiError::UnknownOperation(s.to_owned()))
  }
}

// ─── Dispatch ────────────────────────────────────────────────────────────────

/// Coerce `args` for `op`, run it against `store`, and encode the result.
pub async fn dispatch<S>(store: &S, op: Operation, args: &Args) -> Result<Value, ApiError>
where
  S: InventoryStore,
{
  match op {
    Operation::ListProducts => reply(store.list_products().await),
    Operation::GetProductById => {
      let id = args.id(0, "Invalid product id.")?;
      reply(store.get_product(id).await)
    }
    Operation::CreateProduct => {
      let product = args.product(0)?;
      reply(store.create_product(product).await)
    }
    Operation::CreateProductWithVariants => {
      let product = args.product(0)?;
      let variants = args.variants(1)?;
      reply(store.create_product_with_variants(product, variants).await)
    }
    Operation::UpdateProduct => {
      let id = args.id(0, "Invalid product id.")?;
      let updates = args.product(1)?;
      reply(store.update_product(id, updates).await)
    }
    Operation::DeleteProduct => {
      let id = args.id(0, "Invalid product id.")?;
      reply(store.delete_product(id).await)
    }
    Operation::ListVariantsForProduct => {
      let product_id = args.id(0, "Invalid product_id.")?;
      reply(store.list_variants(product_id).await)
    }
    Operation::AddVariant => {
      let (product_id, variant) = args.new_variant(0)?;
      reply(store.add_variant(product_id, variant).await)
    }
    Operation::DeleteVariant => {
      let variant_id = args.id(0, "Invalid variant_id.")?;
      reply(store.delete_variant(variant_id).await)
    }
    Operation::PostMovement => {
      let movement = args.movement(0)?;
      reply(store.post_movement(movement).await)
    }
    Operation::ListMovementsForVariant => {
      let variant_id = args.id(0, "Invalid variant_id.")?;
      reply(store.list_movements_for_variant(variant_id, args.limit(1)).await)
    }
    Operation::ListMovementsForProduct => {
      let product_id = args.id(0, "Invalid product_id.")?;
      reply(store.list_movements_for_product(product_id, args.limit(1)).await)
    }
    Operation::ListCategories => reply(store.list_categories().await),
    Operation::CreateCategory => {
      let name = args.text(0).unwrap_or_default();
      reply(store.create_category(name).await)
    }
    Operation::VerifyStock => reply(store.verify_stock().await),
  }
}

fn reply<T, E>(result: Result<T, E>) -> Result<Value, ApiError>
where
  T: Serialize,
  E: std::error::Error + DomainError + Send + Sync + 'static,
{
  let value = result.map_err(ApiError::store)?;
  serde_json::to_value(value).map_err(ApiError::internal)
}
