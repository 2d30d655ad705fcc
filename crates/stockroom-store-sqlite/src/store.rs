//! [`SqliteStore`], the SQLite implementation of [`InventoryStore`].

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use stockroom_core::{
  category::Category,
  movement::{Movement, MovementInput, Posted, ProductMovement},
  product::{Product, ProductDeletion, ProductInput},
  store::{Ack, Changes, Created, InventoryStore, StockDrift},
  variant::{Variant, VariantInput},
};
use tracing::{debug, info};

use crate::{
  Result,
  migrate::{self, MigrationReport},
  service,
};

/// How long a statement waits on a lock held by another connection.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(3000);

/// Where and how to open a store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
  pub path:         PathBuf,
  pub busy_timeout: Duration,
}

impl StoreConfig {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into(), busy_timeout: DEFAULT_BUSY_TIMEOUT }
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Stockroom inventory backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. There is
/// one connection per store and it is only ever touched from its own thread,
/// so operations are serialised.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
  report:          MigrationReport,
}

impl SqliteStore {
  /// Open (or create) the database file at `path` and migrate it.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::open_with(StoreConfig::new(path.as_ref())).await
  }

  /// Open with explicit settings. Missing parent directories are created.
  pub async fn open_with(config: StoreConfig) -> Result<Self> {
    let path = config.path;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      tokio::fs::create_dir_all(parent).await?;
    }
    let existed = tokio::fs::try_exists(&path).await?;

    info!(path = %path.display(), "opening inventory database");
    let conn = tokio_rusqlite::Connection::open(&path).await?;
    if !existed {
      info!(path = %path.display(), "created new database");
    }

    Self::init(conn, config.busy_timeout).await
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn, DEFAULT_BUSY_TIMEOUT).await
  }

  async fn init(conn: tokio_rusqlite::Connection, busy_timeout: Duration) -> Result<Self> {
    let report = conn
      .call(move |conn| Ok(configure(conn, busy_timeout)))
      .await??;

    info!(%report, "store ready");
    Ok(Self { conn, report })
  }

  /// What the migration runner did when this store was opened.
  pub fn migration_report(&self) -> &MigrationReport { &self.report }

  /// The schema version currently persisted in the database.
  pub async fn schema_version(&self) -> Result<usize> {
    self.with_conn(|conn| migrate::current_version(conn)).await
  }

  /// Close the underlying connection, waiting for queued work to finish.
  pub async fn close(self) -> Result<()> {
    self.conn.close().await?;
    debug!("store closed");
    Ok(())
  }

  /// Run `f` on the connection thread, keeping its domain errors intact.
  async fn with_conn<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&mut rusqlite::Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(conn))).await?
  }
}

/// Per-connection settings, then bring the schema up to date.
fn configure(conn: &rusqlite::Connection, busy_timeout: Duration) -> Result<MigrationReport> {
  let mode: String =
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
  debug!(journal_mode = %mode, "journal mode set");
  conn.busy_timeout(busy_timeout)?;
  conn.execute_batch("PRAGMA foreign_keys = ON;")?;
  migrate::migrate(conn)
}

// ─── InventoryStore impl ─────────────────────────────────────────────────────

impl InventoryStore for SqliteStore {
  type Error = crate::Error;

  // ── Categories ────────────────────────────────────────────────────────────

  async fn list_categories(&self) -> Result<Vec<Category>> {
    self.with_conn(|conn| service::list_categories(conn)).await
  }

  async fn create_category(&self, name: String) -> Result<Created> {
    self
      .with_conn(move |conn| service::create_category(conn, Some(name.as_str())))
      .await
  }

  // ── Products ──────────────────────────────────────────────────────────────

  async fn list_products(&self) -> Result<Vec<Product>> {
    self.with_conn(|conn| service::list_products(conn)).await
  }

  async fn get_product(&self, id: i64) -> Result<Option<Product>> {
    self.with_conn(move |conn| service::get_product(conn, id)).await
  }

  async fn create_product(&self, input: ProductInput) -> Result<Created> {
    self
      .with_conn(move |conn| service::create_product(conn, &input, &[]))
      .await
  }

  async fn create_product_with_variants(
    &self,
    input: ProductInput,
    variants: Vec<VariantInput>,
  ) -> Result<Created> {
    self
      .with_conn(move |conn| service::create_product(conn, &input, &variants))
      .await
  }

  async fn update_product(&self, id: i64, input: ProductInput) -> Result<Changes> {
    self
      .with_conn(move |conn| service::update_product(conn, id, &input))
      .await
  }

  async fn delete_product(&self, id: i64) -> Result<ProductDeletion> {
    self.with_conn(move |conn| service::delete_product(conn, id)).await
  }

  // ── Variants ──────────────────────────────────────────────────────────────

  async fn list_variants(&self, product_id: i64) -> Result<Vec<Variant>> {
    self
      .with_conn(move |conn| service::list_variants(conn, product_id))
      .await
  }

  async fn add_variant(&self, product_id: i64, input: VariantInput) -> Result<Created> {
    self
      .with_conn(move |conn| service::add_variant(conn, product_id, &input))
      .await
  }

  async fn delete_variant(&self, variant_id: i64) -> Result<Ack> {
    self
      .with_conn(move |conn| service::delete_variant(conn, variant_id))
      .await
  }

  // ── Movements ─────────────────────────────────────────────────────────────

  async fn post_movement(&self, input: MovementInput) -> Result<Posted> {
    self
      .with_conn(move |conn| service::post_movement(conn, &input))
      .await
  }

  async fn list_movements_for_variant(
    &self,
    variant_id: i64,
    limit: Option<i64>,
  ) -> Result<Vec<Movement>> {
    self
      .with_conn(move |conn| service::list_movements_for_variant(conn, variant_id, limit))
      .await
  }

  async fn list_movements_for_product(
    &self,
    product_id: i64,
    limit: Option<i64>,
  ) -> Result<Vec<ProductMovement>> {
    self
      .with_conn(move |conn| service::list_movements_for_product(conn, product_id, limit))
      .await
  }

  // ── Audit ─────────────────────────────────────────────────────────────────

  async fn verify_stock(&self) -> Result<Vec<StockDrift>> {
    self.with_conn(|conn| service::verify_stock(conn)).await
  }
}
