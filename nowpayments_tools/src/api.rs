use std::{sync::Arc, time::Duration};

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use serde_json::Value;

use crate::{
    data_objects::{Invoice, InvoiceRequest},
    helpers::resolve_url_template,
    NowPaymentsApiError,
    NowPaymentsConfig,
};

/// Outbound calls must not hang a request handler indefinitely; timeouts count as provider
/// failure upstream.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct NowPaymentsApi {
    config: NowPaymentsConfig,
    client: Arc<Client>,
}

impl NowPaymentsApi {
    pub fn new(config: NowPaymentsConfig) -> Result<Self, NowPaymentsApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let val = HeaderValue::from_str(config.api_key.reveal().as_str())
            .map_err(|e| NowPaymentsApiError::Initialization(e.to_string()))?;
        headers.insert("x-api-key", val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| NowPaymentsApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &NowPaymentsConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_base)
    }

    /// Create a hosted invoice for an order.
    ///
    /// The success/cancel redirect templates from the configuration are resolved against the
    /// order id before the call. Non-2xx responses surface the provider's own error message
    /// when one is present in the body.
    pub async fn create_invoice(
        &self,
        order_id: &str,
        amount: f64,
        currency: &str,
        pay_currency: &str,
        description: &str,
    ) -> Result<Invoice, NowPaymentsApiError> {
        let request = InvoiceRequest {
            price_amount: amount,
            price_currency: currency.to_lowercase(),
            pay_currency: pay_currency.to_lowercase(),
            order_id: order_id.to_string(),
            order_description: description.to_string(),
            ipn_callback_url: self.config.webhook_url.clone(),
            success_url: Some(resolve_url_template(&self.config.success_url, order_id)),
            cancel_url: Some(resolve_url_template(&self.config.cancel_url, order_id)),
        };
        let url = self.url("/v1/invoice");
        trace!("🧾️ Creating invoice for order {order_id} at {url}");
        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| NowPaymentsApiError::RequestError(e.to_string()))?;
        let status = response.status();
        let raw = response.text().await.map_err(|e| NowPaymentsApiError::RequestError(e.to_string()))?;
        // The provider returns JSON error bodies for most failures, but not all of them.
        let data: Value = serde_json::from_str(&raw).unwrap_or(Value::Null);
        if !status.is_success() {
            let message = data["message"]
                .as_str()
                .or_else(|| data["error"].as_str())
                .map(String::from)
                .unwrap_or_else(|| format!("NOWPayments request failed ({})", status.as_u16()));
            debug!("🧾️ Invoice creation for order {order_id} rejected: {message}");
            return Err(NowPaymentsApiError::InvoiceRejected { status: status.as_u16(), message });
        }
        let invoice = Invoice::from_response(&data, pay_currency);
        debug!("🧾️ Invoice {} created for order {order_id} ({})", invoice.invoice_id.as_deref().unwrap_or("?"), invoice.status);
        Ok(invoice)
    }
}
