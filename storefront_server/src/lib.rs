//! # Storefront payment gateway server
//!
//! The HTTP shell around [`storefront_engine`]. It is responsible for:
//! * Authenticating requests against the session store (bearer tokens).
//! * Exposing the order, chat and admin endpoints under `/api`.
//! * Receiving signed payment-provider webhooks and handing them to the reconciler.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more
//! information.

pub mod config;
pub mod data_objects;
pub mod errors;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
