//! Core types and trait definitions for the Stockroom inventory store.
//!
//! No HTTP or database code lives here. Input types validate themselves;
//! backends implement [`store::InventoryStore`].

// Trait methods spell out `+ Send` on their futures; implementors use
// `async fn`.
#![allow(async_fn_in_trait)]

pub mod category;
pub mod error;
pub mod movement;
pub mod product;
pub mod store;
pub mod validate;
pub mod variant;

pub use error::{DomainError, Error, Result};
