pub mod auth_api;
pub mod chat_api;
pub mod errors;
pub mod order_flow_api;
