//! Schema migration runner.
//!
//! The current version lives in the single-row `schema_version` table. Each
//! step runs in its own transaction together with the version bump, so a
//! process killed mid-run resumes at the first step that did not commit.
//!
//! Before running a step the runner looks at the live schema as well as the
//! version counter: additive steps whose columns already exist, and rebuild
//! steps whose legacy column is already gone, are recorded as skipped and
//! only the counter advances. An additive step that finds only some of its
//! columns adds the rest. Rebuild steps run with foreign keys disabled and
//! must pass `PRAGMA foreign_key_check` before they commit.

use std::fmt;

use rusqlite::{Connection, OptionalExtension as _, params};
use tracing::{debug, error, info};

use crate::{
  error::{Error, ForeignKeyViolation, Result},
  schema::{MIGRATIONS, Migration, MigrationKind},
};

/// What a run of the migration runner did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
  /// Version found on entry.
  pub from:    usize,
  /// Version persisted on exit.
  pub to:      usize,
  /// Versions whose statements were executed.
  pub applied: Vec<usize>,
  /// Versions already reflected in the live schema; only the counter moved.
  pub skipped: Vec<usize>,
}

impl MigrationReport {
  pub fn is_noop(&self) -> bool { self.from == self.to }
}

impl fmt::Display for MigrationReport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.is_noop() {
      return write!(f, "schema at version {}, nothing to do", self.to);
    }
    write!(
      f,
      "schema migrated from version {} to {} ({} applied, {} skipped)",
      self.from,
      self.to,
      self.applied.len(),
      self.skipped.len(),
    )
  }
}

/// Bring `conn` up to the newest schema version.
pub fn migrate(conn: &Connection) -> Result<MigrationReport> { run(conn, MIGRATIONS) }

/// The persisted schema version, or 0 for a database never migrated.
pub fn current_version(conn: &Connection) -> Result<usize> {
  let exists: bool = conn
    .query_row(
      "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_version'",
      [],
      |_| Ok(true),
    )
    .optional()?
    .unwrap_or(false);

  if !exists {
    return Ok(0);
  }
  Ok(read_version(conn)?.unwrap_or(0))
}

pub(crate) fn run(conn: &Connection, migrations: &[Migration]) -> Result<MigrationReport> {
  let from = ensure_version_table(conn)?;
  let total = migrations.len();
  info!(version = from, total, "current schema version");

  let mut report = MigrationReport { from, to: from, ..MigrationReport::default() };
  if from >= total {
    return Ok(report);
  }

  for (index, migration) in migrations.iter().enumerate().skip(from) {
    let version = index + 1;

    if already_applied(conn, migration.kind)? {
      info!(version, total, migration = migration.description, "already in live schema, skipping");
      let tx = conn.unchecked_transaction()?;
      write_version(&tx, version)?;
      tx.commit()?;
      report.skipped.push(version);
    } else {
      info!(version, total, migration = migration.description, "applying migration");
      apply(conn, version, migration)?;
      report.applied.push(version);
    }

    report.to = version;
  }

  info!(version = report.to, total, "migrations applied");
  Ok(report)
}

// ─── Steps ───────────────────────────────────────────────────────────────────

fn apply(conn: &Connection, version: usize, migration: &Migration) -> Result<()> {
  match migration.kind {
    MigrationKind::Rebuild { .. } => {
      // Declared before `tx` so it drops after the rollback; the pragma is a
      // no-op while a transaction is open.
      let _fk_off = ForeignKeysOff::new(conn)?;
      let tx = conn.unchecked_transaction()?;
      tx.execute_batch(migration.sql)?;

      let violations = foreign_key_check(&tx)?;
      if !violations.is_empty() {
        error!(version, count = violations.len(), "foreign key check failed");
        return Err(Error::ForeignKeyCheck { migration: version, violations });
      }

      write_version(&tx, version)?;
      tx.commit()?;
    }
    MigrationKind::AddColumns { table, columns } => {
      let tx = conn.unchecked_transaction()?;
      for column in columns {
        if has_column(&tx, table, column.name)? {
          debug!(version, table, column = column.name, "column already present");
          continue;
        }
        tx.execute_batch(column.ddl)?;
      }
      write_version(&tx, version)?;
      tx.commit()?;
    }
    MigrationKind::Plain => {
      let tx = conn.unchecked_transaction()?;
      tx.execute_batch(migration.sql)?;
      write_version(&tx, version)?;
      tx.commit()?;
    }
  }
  Ok(())
}

/// Whether the live schema already has the shape `kind` would produce.
fn already_applied(conn: &Connection, kind: MigrationKind) -> Result<bool> {
  match kind {
    MigrationKind::Plain => Ok(false),
    MigrationKind::AddColumns { table, columns } => {
      for column in columns {
        if !has_column(conn, table, column.name)? {
          return Ok(false);
        }
      }
      Ok(true)
    }
    MigrationKind::Rebuild { table, legacy_column } => {
      Ok(!has_column(conn, table, legacy_column)?)
    }
  }
}

pub(crate) fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM pragma_table_info(?1) WHERE name = ?2",
        params![table, column],
        |_| Ok(true),
      )
      .optional()?
      .unwrap_or(false),
  )
}

fn foreign_key_check(conn: &Connection) -> Result<Vec<ForeignKeyViolation>> {
  let mut stmt = conn.prepare("PRAGMA foreign_key_check")?;
  let rows = stmt
    .query_map([], |row| {
      Ok(ForeignKeyViolation {
        table:  row.get(0)?,
        rowid:  row.get(1)?,
        parent: row.get(2)?,
        fkid:   row.get(3)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

// ─── Version table ───────────────────────────────────────────────────────────

fn ensure_version_table(conn: &Connection) -> Result<usize> {
  conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

  match read_version(conn)? {
    Some(version) => Ok(version),
    None => {
      conn.execute("INSERT INTO schema_version (version) VALUES (0)", [])?;
      Ok(0)
    }
  }
}

fn read_version(conn: &Connection) -> Result<Option<usize>> {
  let version: Option<i64> = conn
    .query_row(
      "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
      [],
      |row| row.get(0),
    )
    .optional()?;
  Ok(version.map(|v| v.max(0) as usize))
}

fn write_version(conn: &Connection, version: usize) -> Result<()> {
  conn.execute("UPDATE schema_version SET version = ?1", params![version as i64])?;
  Ok(())
}

// ─── Foreign-key guard ───────────────────────────────────────────────────────

/// Disables foreign-key enforcement until dropped.
struct ForeignKeysOff<'c> {
  conn: &'c Connection,
}

impl<'c> ForeignKeysOff<'c> {
  fn new(conn: &'c Connection) -> Result<Self> {
    conn.execute_batch("PRAGMA foreign_keys = OFF;")?;
    Ok(Self { conn })
  }
}

impl Drop for ForeignKeysOff<'_> {
  fn drop(&mut self) {
    if let Err(e) = self.conn.execute_batch("PRAGMA foreign_keys = ON;") {
      error!(error = %e, "failed to re-enable foreign keys");
    }
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use rusqlite::OptionalExtension as _;

  use super::*;
  use crate::schema::LATEST_VERSION;

  fn conn() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
    conn
  }

  fn foreign_keys_enabled(conn: &Connection) -> bool {
    conn.query_row("PRAGMA foreign_keys", [], |r| r.get::<_, i64>(0)).unwrap() == 1
  }

  fn schema_snapshot(conn: &Connection) -> Vec<String> {
    let mut stmt = conn
      .prepare("SELECT type || ':' || name || ':' || IFNULL(sql, '') FROM sqlite_master ORDER BY name")
      .unwrap();
    stmt
      .query_map([], |r| r.get(0))
      .unwrap()
      .collect::<rusqlite::Result<Vec<String>>>()
      .unwrap()
  }

  #[test]
  fn fresh_database_reaches_latest_version() {
    let c = conn();
    let report = migrate(&c).unwrap();
    assert_eq!(report.from, 0);
    assert_eq!(report.to, LATEST_VERSION);
    assert_eq!(report.applied, (1..=LATEST_VERSION).collect::<Vec<_>>());
    assert!(report.skipped.is_empty());
    assert_eq!(current_version(&c).unwrap(), LATEST_VERSION);

    assert!(!has_column(&c, "products", "price").unwrap());
    assert!(has_column(&c, "products", "cost_price").unwrap());
    assert!(has_column(&c, "movements", "variant_id").unwrap());
    assert!(!has_column(&c, "movements", "product_id").unwrap());
    assert!(has_column(&c, "movements", "sold_price").unwrap());
    assert!(foreign_keys_enabled(&c));
  }

  #[test]
  fn second_run_is_a_noop() {
    let c = conn();
    migrate(&c).unwrap();
    let before = schema_snapshot(&c);

    let report = migrate(&c).unwrap();
    assert!(report.is_noop());
    assert!(report.applied.is_empty() && report.skipped.is_empty());
    assert_eq!(current_version(&c).unwrap(), LATEST_VERSION);
    assert_eq!(schema_snapshot(&c), before);

    let rows: i64 = c.query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0)).unwrap();
    assert_eq!(rows, 1);
  }

  #[test]
  fn resumes_from_persisted_version() {
    let c = conn();
    let first = run(&c, &MIGRATIONS[..5]).unwrap();
    assert_eq!(first.to, 5);

    let report = migrate(&c).unwrap();
    assert_eq!(report.from, 5);
    assert_eq!(report.to, 10);
    assert_eq!(report.applied, vec![6, 7, 8, 9, 10]);
  }

  #[test]
  fn current_version_is_zero_before_first_run() {
    let c = conn();
    assert_eq!(current_version(&c).unwrap(), 0);
  }

  #[test]
  fn additive_step_skipped_when_columns_exist() {
    let c = conn();
    run(&c, &MIGRATIONS[..3]).unwrap();
    c.execute_batch(
      "ALTER TABLE products ADD COLUMN cost_price REAL NOT NULL DEFAULT 0;
       ALTER TABLE products ADD COLUMN sell_price REAL NOT NULL DEFAULT 0;",
    )
    .unwrap();

    let report = migrate(&c).unwrap();
    assert_eq!(report.skipped, vec![4]);
    assert_eq!(report.to, LATEST_VERSION);
  }

  #[test]
  fn additive_step_adds_only_missing_columns() {
    let c = conn();
    run(&c, &MIGRATIONS[..3]).unwrap();
    c.execute_batch("ALTER TABLE products ADD COLUMN cost_price REAL NOT NULL DEFAULT 0;")
      .unwrap();

    let report = migrate(&c).unwrap();
    assert_eq!(report.applied[0], 4);
    assert!(report.skipped.is_empty());
    assert_eq!(report.to, LATEST_VERSION);
    assert!(has_column(&c, "products", "cost_price").unwrap());
    assert!(has_column(&c, "products", "sell_price").unwrap());
  }

  #[test]
  fn rebuild_skipped_when_legacy_column_gone() {
    let c = conn();
    run(&c, &MIGRATIONS[..6]).unwrap();
    // Simulate a crash after the rebuild landed but before the counter moved.
    c.execute("UPDATE schema_version SET version = 5", []).unwrap();

    let report = migrate(&c).unwrap();
    assert_eq!(report.from, 5);
    assert_eq!(report.skipped, vec![6]);
    assert_eq!(report.applied, vec![7, 8, 9, 10]);
  }

  #[test]
  fn legacy_rows_survive_both_rebuilds() {
    let c = conn();
    run(&c, &MIGRATIONS[..5]).unwrap();
    c.execute_batch(
      "INSERT INTO categories (id, name) VALUES (1, 'Tops');
       INSERT INTO products (id, name, sku, price, qty, category_id, cost_price, sell_price)
         VALUES (1, 'Shirt', 'SH-1', 9.5, 4, 1, 5, 10);
       INSERT INTO products (id, name, price, qty) VALUES (2, 'Hat', 3, 0);
       INSERT INTO movements (product_id, qty_change, reason) VALUES (1, 6, 'restock');
       INSERT INTO movements (product_id, qty_change, reason) VALUES (1, -2, 'sold');",
    )
    .unwrap();

    migrate(&c).unwrap();

    let (cost, sell, qty): (f64, f64, i64) = c
      .query_row("SELECT cost_price, sell_price, qty FROM products WHERE id = 1", [], |r| {
        Ok((r.get(0)?, r.get(1)?, r.get(2)?))
      })
      .unwrap();
    assert_eq!((cost, sell, qty), (5.0, 10.0, 4));

    let variants: i64 =
      c.query_row("SELECT COUNT(*) FROM product_variants", [], |r| r.get(0)).unwrap();
    assert_eq!(variants, 2);

    let default_variant: i64 = c
      .query_row(
        "SELECT id FROM product_variants WHERE product_id = 1 AND size = 'One Size' AND color = 'N/A'",
        [],
        |r| r.get(0),
      )
      .unwrap();
    let mut stmt = c.prepare("SELECT variant_id, sold_price FROM movements ORDER BY id").unwrap();
    let moved = stmt
      .query_map([], |r| Ok((r.get::<_, i64>(0)?, r.get::<_, Option<f64>>(1)?)))
      .unwrap()
      .collect::<rusqlite::Result<Vec<_>>>()
      .unwrap();
    assert_eq!(moved, vec![(default_variant, None), (default_variant, None)]);

    assert!(foreign_key_check(&c).unwrap().is_empty());
  }

  const PARENT_CHILD: Migration = Migration {
    description: "parent and child",
    kind:        MigrationKind::Plain,
    sql:         "
CREATE TABLE parent (id INTEGER PRIMARY KEY, legacy TEXT);
CREATE TABLE child (id INTEGER PRIMARY KEY, parent_id INTEGER NOT NULL REFERENCES parent(id));
INSERT INTO parent (id, legacy) VALUES (1, 'x');
INSERT INTO child (id, parent_id) VALUES (10, 1);
",
  };

  #[test]
  fn dangling_rebuild_fails_and_rolls_back() {
    let c = conn();
    let lossy = Migration {
      description: "rebuild parent, forgetting its rows",
      kind:        MigrationKind::Rebuild { table: "parent", legacy_column: "legacy" },
      sql:         "
CREATE TABLE parent_new (id INTEGER PRIMARY KEY);
DROP TABLE parent;
ALTER TABLE parent_new RENAME TO parent;
",
    };

    let err = run(&c, &[PARENT_CHILD, lossy]).unwrap_err();
    match &err {
      Error::ForeignKeyCheck { migration, violations } => {
        assert_eq!(*migration, 2);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].table, "child");
        assert_eq!(violations[0].rowid, Some(10));
        assert_eq!(violations[0].parent, "parent");
      }
      other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("after migration 2"));

    assert_eq!(current_version(&c).unwrap(), 1);
    assert!(has_column(&c, "parent", "legacy").unwrap());
    assert!(foreign_keys_enabled(&c));
  }

  #[test]
  fn failing_rebuild_restores_foreign_keys() {
    let c = conn();
    let broken = Migration {
      description: "broken rebuild",
      kind:        MigrationKind::Rebuild { table: "parent", legacy_column: "legacy" },
      sql:         "CREATE TABLE parent_new (id INTEGER PRIMARY KEY); INSERT INTO nowhere VALUES (1);",
    };

    let err = run(&c, &[PARENT_CHILD, broken]).unwrap_err();
    assert!(matches!(err, Error::Sqlite(_)));
    assert!(foreign_keys_enabled(&c));
    assert_eq!(current_version(&c).unwrap(), 1);

    let leftover: Option<i64> = c
      .query_row("SELECT 1 FROM sqlite_master WHERE name = 'parent_new'", [], |r| r.get(0))
      .optional()
      .unwrap();
    assert!(leftover.is_none());
  }

  #[test]
  fn report_display() {
    let report = MigrationReport { from: 5, to: 10, applied: vec![6, 7, 8, 10], skipped: vec![9] };
    assert_eq!(
      report.to_string(),
      "schema migrated from version 5 to 10 (4 applied, 1 skipped)"
    );
    let idle = MigrationReport { from: 10, to: 10, ..MigrationReport::default() };
    assert_eq!(idle.to_string(), "schema at version 10, nothing to do");
  }
}
