//! The JSON document state store.
//!
//! All mutable application state lives in one [`StateDocument`], held in memory behind a single
//! lock and rewritten to disk whole on every mutation. There are no partial updates, no append
//! log and no versioning: the durability contract is "last successful save wins".

mod document;
mod json_store;

pub use document::{StateDocument, DEFAULT_ADMIN_EMAIL, DEFAULT_ADMIN_PASSWORD};
pub use json_store::{JsonStore, StoreError};
