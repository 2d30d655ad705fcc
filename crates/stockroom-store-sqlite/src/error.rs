//! Error type for `stockroom-store-sqlite`.

use std::fmt;

use stockroom_core::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A business-rule failure; displayed verbatim to the user.
  #[error(transparent)]
  Core(#[from] stockroom_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("database error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("i/o error: {0}")]
  Io(#[from] std::io::Error),

  /// A rebuild migration left dangling references. Fatal: the store must
  /// not be used.
  #[error(
    "foreign key check failed after migration {migration}: {}",
    ForeignKeyViolation::list(.violations)
  )]
  ForeignKeyCheck {
    migration:  usize,
    violations: Vec<ForeignKeyViolation>,
  },

  #[error("date/time parse error: {0}")]
  DateParse(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl DomainError for Error {
  fn domain(&self) -> Option<&stockroom_core::Error> {
    match self {
      Error::Core(e) => Some(e),
      _ => None,
    }
  }
}

/// One row reported by `PRAGMA foreign_key_check`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyViolation {
  pub table:  String,
  pub rowid:  Option<i64>,
  pub parent: String,
  pub fkid:   i64,
}

impl ForeignKeyViolation {
  fn list(violations: &[ForeignKeyViolation]) -> String {
    violations
      .iter()
      .map(ToString::to_string)
      .collect::<Vec<_>>()
      .join(", ")
  }
}

impl fmt::Display for ForeignKeyViolation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.rowid {
      Some(rowid) => write!(f, "{}[rowid {rowid}] -> {} (fk {})", self.table, self.parent, self.fkid),
      None => write!(f, "{} -> {} (fk {})", self.table, self.parent, self.fkid),
    }
  }
}
