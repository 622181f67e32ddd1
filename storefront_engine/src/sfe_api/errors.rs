use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum OrderFlowError {
    #[error("Missing order details")]
    MissingOrderDetails,
    #[error("Unknown payment method: {0}")]
    UnknownPaymentMethod(String),
    #[error("No payment provider is configured")]
    NoProviderConfigured,
    #[error("Could not create payment via {provider}. {message}")]
    ProviderFailure { provider: String, message: String },
    #[error(transparent)]
    StoreError(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum AuthApiError {
    #[error("Email already registered")]
    EmailTaken,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error(transparent)]
    StoreError(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum ChatApiError {
    #[error("Chat not found")]
    ChatNotFound,
    #[error("Message is required")]
    EmptyMessage,
    #[error("Valid status is required (open or closed)")]
    InvalidStatus,
    #[error(transparent)]
    StoreError(#[from] StoreError),
}
