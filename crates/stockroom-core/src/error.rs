//! Error types for `stockroom-core`.
//!
//! Display strings are the messages shown to the person using the inventory
//! UI, so they are written as sentences.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  /// Client-correctable input problem (missing field, bad number, bad id).
  #[error("{0}")]
  Validation(String),

  #[error("SKU already exists. Please use a different SKU.")]
  SkuExists,

  #[error("That size/color already exists for this product.")]
  VariantExists,

  #[error("Category already exists.")]
  CategoryExists,

  #[error("Variant not found.")]
  VariantNotFound(i64),

  /// Every product keeps at least one variant.
  #[error("Cannot delete the last variant.")]
  LastVariant,
}

impl Error {
  pub fn validation(message: impl Into<String>) -> Self {
    Error::Validation(message.into())
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Implemented by backend error types so callers can recover the domain
/// error (if any) behind a storage failure.
pub trait DomainError {
  fn domain(&self) -> Option<&Error>;
}

impl DomainError for Error {
  fn domain(&self) -> Option<&Error> { Some(self) }
}
