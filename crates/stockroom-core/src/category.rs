//! Categories: optional grouping for products.

use serde::{Deserialize, Serialize};

use crate::{Error, Result, validate::clean_text};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
  pub id:   i64,
  pub name: String,
}

/// Validate a category name: trimmed and required.
pub fn category_name(name: Option<&str>) -> Result<String> {
  clean_text(name).ok_or_else(|| Error::validation("Category name is required."))
}
