use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Request body for `POST /v1/invoice`.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceRequest {
    pub price_amount: f64,
    pub price_currency: String,
    pub pay_currency: String,
    pub order_id: String,
    pub order_description: String,
    pub ipn_callback_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_url: Option<String>,
}

/// The subset of the invoice-creation response the gateway cares about.
#[derive(Debug, Clone, PartialEq)]
pub struct Invoice {
    pub invoice_id: Option<String>,
    pub invoice_url: Option<String>,
    /// Raw provider status, lowercased. Defaults to `waiting` when the provider omits it.
    pub status: String,
    pub pay_currency: String,
    pub pay_amount: Option<f64>,
}

impl Invoice {
    /// Build an invoice from the raw response document. The provider is inconsistent about
    /// numeric fields (sometimes strings, sometimes numbers), so extraction is lenient.
    pub fn from_response(data: &Value, requested_pay_currency: &str) -> Self {
        let invoice_id = value_to_string(&data["id"]);
        let invoice_url = data["invoice_url"].as_str().map(String::from);
        let status = data["status"].as_str().unwrap_or("waiting").to_lowercase();
        let pay_currency =
            data["pay_currency"].as_str().map(String::from).unwrap_or_else(|| requested_pay_currency.to_string());
        let pay_amount = value_to_f64(&data["pay_amount"]);
        Self { invoice_id, invoice_url, status, pay_currency, pay_amount }
    }
}

/// An IPN webhook payload. All fields are optional; the reconciler decides what a missing
/// field means. `order_id` accepts both snake_case and camelCase spellings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IpnPayload {
    #[serde(default, alias = "orderId")]
    pub order_id: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub invoice_status: Option<String>,
    #[serde(default)]
    pub pay_currency: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub pay_amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub actually_paid: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub invoice_id: Option<String>,
    #[serde(default)]
    pub invoice_url: Option<String>,
}

impl IpnPayload {
    /// Parse a raw webhook body. Malformed JSON degrades to an empty payload rather than an
    /// error, so replayed garbage is treated as a business no-op downstream.
    pub fn parse(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    pub fn raw_status(&self) -> Option<&str> {
        self.payment_status.as_deref().or(self.invoice_status.as_deref())
    }
}

fn value_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_to_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    }
}

fn lenient_f64<'de, D: Deserializer<'de>>(de: D) -> Result<Option<f64>, D::Error> {
    let v = Option::<Value>::deserialize(de)?;
    Ok(v.as_ref().and_then(value_to_f64))
}

fn lenient_string<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    let v = Option::<Value>::deserialize(de)?;
    Ok(v.as_ref().and_then(value_to_string))
}
