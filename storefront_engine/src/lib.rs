//! # Storefront payment engine
//!
//! Core logic for a storefront that sells digital goods against a single shared JSON-document
//! store. The engine owns:
//! 1. The state store ([`mod@store`]): one JSON document holding all mutable application state,
//!    loaded at startup and rewritten whole on every mutation. All writes are funnelled through a
//!    single lock so the document never sees a torn mutation.
//! 2. The payment providers ([`mod@providers`]): a closed set of strategies (manual settlement,
//!    plus one hosted-invoice crypto provider per supported asset) sharing one `create_payment`
//!    contract.
//! 3. The public API ([`mod@sfe_api`]): order creation, webhook reconciliation, support chats and
//!    session authentication. The HTTP layer should only ever go through these APIs; the store is
//!    an implementation detail.
pub mod db_types;
pub mod helpers;
pub mod providers;
pub mod store;

mod sfe_api;

pub use sfe_api::{
    auth_api::AuthApi,
    chat_api::{ChatApi, ChatWithOrder},
    errors::{AuthApiError, ChatApiError, OrderFlowError},
    order_flow_api::{NewOrderRequest, OrderCreated, OrderFlowApi, ReconcileOutcome},
};
