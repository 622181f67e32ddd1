use thiserror::Error;

#[derive(Debug, Error)]
pub enum NowPaymentsApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invoice request could not be sent: {0}")]
    RequestError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("{message}")]
    InvoiceRejected { status: u16, message: String },
}
