//! JSON API for Stockroom.
//!
//! Exposes an axum [`Router`] backed by any
//! [`stockroom_core::store::InventoryStore`]. Every operation is a
//! `POST /invoke/{operation}` whose body is a JSON array of positional
//! arguments; the response body is the operation's result, or
//! `{"error": "<message>"}`.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .merge(stockroom_api::api_router(store.clone()))
//! ```

pub mod coerce;
pub mod error;
pub mod invoke;

use std::sync::Arc;

use axum::{
  Json, Router,
  body::Bytes,
  extract::{Path, State},
  routing::post,
};
use serde_json::Value;
use stockroom_core::store::InventoryStore;
use tracing::debug;

pub use error::ApiError;
pub use invoke::Operation;

use crate::coerce::Args;

/// Build the API router for `store`.
///
/// The returned `Router<()>` can be merged into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: InventoryStore + 'static,
{
  Router::new()
    .route("/invoke/{operation}", post(invoke_handler::<S>))
    .with_state(store)
}

/// `POST /invoke/{operation}` body: `[arg0, arg1, ...]`
async fn invoke_handler<S>(
  State(store): State<Arc<S>>,
  Path(operation): Path<String>,
  body: Bytes,
) -> Result<Json<Value>, ApiError>
where
  S: InventoryStore,
{
  let op: Operation = operation.parse()?;
  let args = parse_args(&body)?;
  debug!(%op, "invoking");

  let result = invoke::dispatch(store.as_ref(), op, &args).await?;
  Ok(Json(result))
}

/// An empty body means no arguments.
fn parse_args(body: &[u8]) -> Result<Args, ApiError> {
  if body.iter().all(u8::is_ascii_whitespace) {
    return Ok(Args::default());
  }
  serde_json::from_slice::<Vec<Value>>(body)
    .map(Args::new)
    .map_err(|_| ApiError::BadRequest("Arguments must be a JSON array.".to_owned()))
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use serde_json::json;
  use stockroom_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;

  async fn router() -> Router {
    let store = SqliteStore::open_in_memory().await.unwrap();
    api_router(Arc::new(store))
  }

  async fn call(app: &Router, operation: &str, args: Value) -> (StatusCode, Value) {
    let req = Request::builder()
      .method("POST")
      .uri(format!("/invoke/{operation}"))
      .header("content-type", "application/json")
      .body(Body::from(args.to_string()))
      .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
  }

  #[tokio::test]
  async fn product_lifecycle() {
    let app = router().await;

    let (status, created) = call(
      &app,
      "createProductWithVariants",
      json!([
        { "name": "Shirt", "cost_price": 5, "sell_price": "10" },
        [{ "size": "S", "color": "Red", "qty": 3 }, { "size": "M", "color": "Blue", "qty": 2 }]
      ]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = created["id"].as_i64().unwrap();

    let (_, product) = call(&app, "getProductById", json!([id])).await;
    assert_eq!(product["name"], "Shirt");
    assert_eq!(product["sell_price"], 10.0);
    assert_eq!(product["qty"], 5);

    let (_, variants) = call(&app, "listVariantsForProduct", json!([id.to_string()])).await;
    let small = variants
      .as_array()
      .unwrap()
      .iter()
      .find(|v| v["size"] == "S")
      .unwrap()["id"]
      .as_i64()
      .unwrap();

    let (status, posted) = call(
      &app,
      "postMovement",
      json!([{ "variant_id": small, "qty_change": -1, "reason": "sold", "sold_price": 15 }]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(posted, json!({ "ok": true, "variant_id": small }));

    let (_, ledger) = call(&app, "listMovementsForProduct", json!([id, 1])).await;
    assert_eq!(ledger.as_array().unwrap().len(), 1);
    assert_eq!(ledger[0]["qty_change"], -1);
    assert_eq!(ledger[0]["sold_price"], 15.0);
    assert_eq!(ledger[0]["size"], "S");
    assert!(ledger[0]["created_at"].is_string());

    let (_, changes) = call(&app, "updateProduct", json!([id, { "name": "Tee" }])).await;
    assert_eq!(changes, json!({ "changes": 1 }));

    let (_, deleted) = call(&app, "deleteProduct", json!([id])).await;
    assert_eq!(
      deleted,
      json!({ "deletedMovements": 3, "deletedVariants": 2, "deletedProducts": 1 })
    );

    let (status, missing) = call(&app, "getProductById", json!([id])).await;
    assert_eq!(status, StatusCode::OK);
    assert!(missing.is_null());

    let (_, drift) = call(&app, "verifyStock", json!([])).await;
    assert_eq!(drift, json!([]));
  }

  #[tokio::test]
  async fn validation_failures_are_400() {
    let app = router().await;

    let (status, body) = call(&app, "createProduct", json!([{ "name": "  " }])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Name is required." }));

    let (status, body) = call(&app, "getProductById", json!(["abc"])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid product id.");

    let (status, body) =
      call(&app, "postMovement", json!([{ "variant_id": 1, "qty_change": 0 }])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "qty_change must be a non-zero number.");

    let (status, body) = call(
      &app,
      "postMovement",
      json!([{ "variant_id": 1, "qty_change": 9_007_199_254_740_993_i64 }]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "qty_change is out of range.");

    let (status, body) = call(
      &app,
      "createProductWithVariants",
      json!([{ "name": "Shirt" }, [{ "qty": i64::MAX }]]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "qty is out of range.");

    let (_, products) = call(&app, "listProducts", json!([])).await;
    assert_eq!(products, json!([]));
  }

  #[tokio::test]
  async fn conflicts_are_409() {
    let app = router().await;

    call(&app, "createProduct", json!([{ "name": "A", "sku": "X" }])).await;
    let (status, body) = call(&app, "createProduct", json!([{ "name": "B", "sku": "X" }])).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "SKU already exists. Please use a different SKU.");

    let (_, created) = call(&app, "createProduct", json!([{ "name": "C" }])).await;
    let (_, variants) = call(&app, "listVariantsForProduct", json!([created["id"]])).await;
    let (status, body) = call(&app, "deleteVariant", json!([variants[0]["id"]])).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Cannot delete the last variant.");

    call(&app, "createCategory", json!(["Tops"])).await;
    let (status, body) = call(&app, "createCategory", json!(["Tops"])).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Category already exists.");
  }

  #[tokio::test]
  async fn missing_variant_is_404() {
    let app = router().await;
    let (status, body) = call(&app, "deleteVariant", json!([42])).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Variant not found.");
  }

  #[tokio::test]
  async fn unknown_operation_is_404() {
    let app = router().await;
    let (status, body) = call(&app, "dropTables", json!([])).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Unknown operation: dropTables");
  }

  #[tokio::test]
  async fn body_must_be_an_array() {
    let app = router().await;
    let (status, body) = call(&app, "listProducts", json!({ "name": "x" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Arguments must be a JSON array.");

    let req = Request::builder()
      .method("POST")
      .uri("/invoke/listProducts")
      .body(Body::empty())
      .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
  }

  #[test]
  fn blank_body_means_no_arguments() {
    assert!(parse_args(b"").is_ok());
    assert!(parse_args(b" \n").is_ok());
    assert!(parse_args(b"[1, \"two\"]").is_ok());
    assert!(parse_args(b"{}").is_err());
  }
}
