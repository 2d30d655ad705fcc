//! Ordered schema migrations for the Stockroom SQLite store.
//!
//! Migration `i` in [`MIGRATIONS`] brings the schema from version `i` to
//! version `i + 1`. Entries are append-only: never edit or reorder a shipped
//! migration, add a new one instead.

/// How the runner decides whether a migration still needs to run, and under
/// which foreign-key regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationKind {
  /// Always executed, with foreign keys enforced.
  Plain,
  /// Only adds `columns` to `table`. Columns the live table already has are
  /// left alone; the step is skipped when all of them exist.
  AddColumns {
    table:   &'static str,
    columns: &'static [AddedColumn],
  },
  /// Copy-drop-rename of `table` to get rid of `legacy_column`. Skipped when
  /// the live table no longer has that column. Runs with foreign keys off.
  Rebuild {
    table:         &'static str,
    legacy_column: &'static str,
  },
}

/// One column of an additive migration and the statement that creates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddedColumn {
  pub name: &'static str,
  pub ddl:  &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct Migration {
  pub description: &'static str,
  pub kind:        MigrationKind,
  /// Empty for additive steps, which run their columns' `ddl` instead.
  pub sql:         &'static str,
}

pub const MIGRATIONS: &[Migration] = &[
  // 1
  Migration {
    description: "create categories",
    kind:        MigrationKind::Plain,
    sql:         "
CREATE TABLE IF NOT EXISTS categories (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);
",
  },
  // 2
  Migration {
    description: "create products",
    kind:        MigrationKind::Plain,
    sql:         "
CREATE TABLE IF NOT EXISTS products (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    sku         TEXT UNIQUE,
    price       REAL NOT NULL,
    qty         INTEGER NOT NULL DEFAULT 0,
    category_id INTEGER,
    FOREIGN KEY (category_id) REFERENCES categories(id)
);
",
  },
  // 3
  Migration {
    description: "create movements keyed by product",
    kind:        MigrationKind::Plain,
    sql:         "
CREATE TABLE IF NOT EXISTS movements (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    product_id INTEGER NOT NULL,
    qty_change INTEGER NOT NULL,
    reason     TEXT,
    created_at TEXT DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (product_id) REFERENCES products(id)
);
",
  },
  // 4
  Migration {
    description: "add product cost and sell prices",
    kind:        MigrationKind::AddColumns {
      table:   "products",
      columns: &[
        AddedColumn {
          name: "cost_price",
          ddl:  "ALTER TABLE products ADD COLUMN cost_price REAL NOT NULL DEFAULT 0",
        },
        AddedColumn {
          name: "sell_price",
          ddl:  "ALTER TABLE products ADD COLUMN sell_price REAL NOT NULL DEFAULT 0",
        },
      ],
    },
    sql:         "",
  },
  // 5
  Migration {
    description: "add product and movement indexes",
    kind:        MigrationKind::Plain,
    sql:         "
CREATE INDEX IF NOT EXISTS idx_products_name          ON products(name);
CREATE INDEX IF NOT EXISTS idx_products_category      ON products(category_id);
CREATE INDEX IF NOT EXISTS idx_movements_product      ON movements(product_id);
CREATE INDEX IF NOT EXISTS idx_movements_product_date ON movements(product_id, created_at);
",
  },
  // 6
  Migration {
    description: "rebuild products without legacy price",
    kind:        MigrationKind::Rebuild {
      table:         "products",
      legacy_column: "price",
    },
    sql:         "
CREATE TABLE products_new (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    sku         TEXT UNIQUE,
    qty         INTEGER NOT NULL DEFAULT 0,
    category_id INTEGER,
    cost_price  REAL NOT NULL DEFAULT 0,
    sell_price  REAL NOT NULL DEFAULT 0,
    FOREIGN KEY (category_id) REFERENCES categories(id)
);

INSERT INTO products_new (id, name, sku, qty, category_id, cost_price, sell_price)
SELECT id, name, sku, qty, category_id, cost_price, sell_price
FROM products;

DROP TABLE products;

ALTER TABLE products_new RENAME TO products;

CREATE INDEX IF NOT EXISTS idx_products_name     ON products(name);
CREATE INDEX IF NOT EXISTS idx_products_category ON products(category_id);
",
  },
  // 7
  Migration {
    description: "create product variants",
    kind:        MigrationKind::Plain,
    sql:         "
CREATE TABLE IF NOT EXISTS product_variants (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    product_id INTEGER NOT NULL,
    size       TEXT NOT NULL,
    color      TEXT NOT NULL,
    qty        INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (product_id) REFERENCES products(id)
);

CREATE UNIQUE INDEX IF NOT EXISTS ux_variant_product_size_color
    ON product_variants(product_id, size, color);

CREATE INDEX IF NOT EXISTS idx_variants_product ON product_variants(product_id);
",
  },
  // 8
  Migration {
    description: "backfill default variants",
    kind:        MigrationKind::Plain,
    // OR IGNORE + the unique index make this safe to re-run.
    sql:         "
INSERT OR IGNORE INTO product_variants (product_id, size, color, qty)
SELECT id, 'One Size', 'N/A', qty
FROM products;
",
  },
  // 9
  Migration {
    description: "rebuild movements keyed by variant",
    kind:        MigrationKind::Rebuild {
      table:         "movements",
      legacy_column: "product_id",
    },
    sql:         "
CREATE TABLE IF NOT EXISTS movements_new (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    variant_id INTEGER NOT NULL,
    qty_change INTEGER NOT NULL,
    reason     TEXT,
    created_at TEXT DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (variant_id) REFERENCES product_variants(id)
);

INSERT INTO movements_new (id, variant_id, qty_change, reason, created_at)
SELECT m.id, v.id, m.qty_change, m.reason, m.created_at
FROM movements m
JOIN product_variants v
  ON v.product_id = m.product_id
 AND v.size  = 'One Size'
 AND v.color = 'N/A';

DROP TABLE movements;

ALTER TABLE movements_new RENAME TO movements;

CREATE INDEX IF NOT EXISTS idx_movements_variant      ON movements(variant_id);
CREATE INDEX IF NOT EXISTS idx_movements_variant_date ON movements(variant_id, created_at);
",
  },
  // 10
  Migration {
    description: "add movement sold price",
    kind:        MigrationKind::AddColumns {
      table:   "movements",
      columns: &[AddedColumn {
        name: "sold_price",
        ddl:  "ALTER TABLE movements ADD COLUMN sold_price REAL",
      }],
    },
    sql:         "",
  },
];

/// Number of the newest schema version.
pub const LATEST_VERSION: usize = MIGRATIONS.len();
