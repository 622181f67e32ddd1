//! Payment providers.
//!
//! A provider is a strategy for creating (and later tracking) a payment for an order. The set is
//! closed: manual settlement, plus one hosted-invoice crypto provider per supported asset. Which
//! variants are registered is decided once at startup from configuration presence — the manual
//! provider is always available, the crypto providers only when the invoice API credentials are
//! complete.

use chrono::{DateTime, Utc};
use log::*;
use nowpayments_tools::{NowPaymentsApi, NowPaymentsApiError};
use serde::Serialize;
use thiserror::Error;

use crate::{
    db_types::{OrderId, OrderStatus, Payment},
    helpers::title_case,
};

pub const MANUAL_PROVIDER_KEY: &str = "manual";
pub const MANUAL_PROVIDER_LABEL: &str = "Manual Payment";
/// Legacy generic key. Older documents reference it, and reconciliation still writes it; it is
/// never registered as a provider of its own.
pub const GENERIC_CRYPTO_KEY: &str = "nowpayments";
pub const GENERIC_CRYPTO_LABEL: &str = "NOWPayments";

//--------------------------------------      CryptoAsset      -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoAsset {
    Bitcoin,
    Ethereum,
    TetherErc20,
    UsdCoinErc20,
}

impl CryptoAsset {
    pub const ALL: [CryptoAsset; 4] =
        [CryptoAsset::Bitcoin, CryptoAsset::Ethereum, CryptoAsset::TetherErc20, CryptoAsset::UsdCoinErc20];

    /// The asset code in the invoice API's vocabulary.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Bitcoin => "btc",
            Self::Ethereum => "eth",
            Self::TetherErc20 => "usdterc20",
            Self::UsdCoinErc20 => "usdcerc20",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Bitcoin => "Bitcoin",
            Self::Ethereum => "Ethereum",
            Self::TetherErc20 => "Tether USD (ERC-20)",
            Self::UsdCoinErc20 => "USD Coin (ERC-20)",
        }
    }

    pub fn provider_key(&self) -> String {
        format!("{GENERIC_CRYPTO_KEY}-{}", self.code())
    }
}

//--------------------------------------    PaymentProvider    -------------------------------------------------------
/// Everything `create_payment` needs to know about the order being paid for.
#[derive(Debug, Clone)]
pub struct PaymentRequest<'a> {
    pub order_id: &'a OrderId,
    pub amount: f64,
    pub currency: &'a str,
    pub product: &'a str,
    pub username: &'a str,
    pub created_at: DateTime<Utc>,
}

/// The result of a successful `create_payment` call: the initial order status plus the canonical
/// payment descriptor to embed in the order.
#[derive(Debug, Clone)]
pub struct PaymentIntent {
    pub order_status: OrderStatus,
    pub payment: Payment,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Unknown payment method: {0}")]
    UnknownProvider(String),
    #[error("No payment provider is configured")]
    NoProviderConfigured,
    #[error(transparent)]
    InvoiceError(#[from] NowPaymentsApiError),
}

#[derive(Clone)]
pub enum PaymentProvider {
    /// Settled out of band. Always succeeds synchronously and reports the order as paid.
    Manual,
    /// Hosted crypto invoice. Creating a payment calls the external invoice API; the order then
    /// waits for webhook reconciliation.
    HostedCrypto { asset: CryptoAsset, api: NowPaymentsApi },
}

impl PaymentProvider {
    pub fn key(&self) -> String {
        match self {
            Self::Manual => MANUAL_PROVIDER_KEY.to_string(),
            Self::HostedCrypto { asset, .. } => asset.provider_key(),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::Manual => MANUAL_PROVIDER_LABEL.to_string(),
            Self::HostedCrypto { asset, .. } => format!("{GENERIC_CRYPTO_LABEL} ({})", asset.display_name()),
        }
    }

    pub fn provider_type(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::HostedCrypto { .. } => "crypto",
        }
    }

    pub fn pay_currency(&self) -> Option<String> {
        match self {
            Self::Manual => None,
            Self::HostedCrypto { asset, .. } => Some(asset.code().to_uppercase()),
        }
    }

    pub fn supports_redirect(&self) -> bool {
        matches!(self, Self::HostedCrypto { .. })
    }

    /// Create a payment for a new order.
    ///
    /// This must be called *before* any state mutation for the order: a failure here aborts
    /// order creation with nothing committed.
    pub async fn create_payment(&self, request: &PaymentRequest<'_>) -> Result<PaymentIntent, ProviderError> {
        match self {
            Self::Manual => {
                let payment = Payment {
                    provider: MANUAL_PROVIDER_KEY.to_string(),
                    provider_label: MANUAL_PROVIDER_LABEL.to_string(),
                    invoice_id: None,
                    invoice_url: None,
                    status: Some("paid".to_string()),
                    pay_currency: Some(request.currency.to_string()),
                    pay_amount: Some(request.amount),
                    actually_paid: Some(request.amount),
                    created_at: request.created_at,
                    updated_at: request.created_at,
                };
                Ok(PaymentIntent { order_status: OrderStatus::Paid, payment })
            },
            Self::HostedCrypto { asset, api } => {
                let description = format!("{} for {}", request.product, request.username);
                let invoice = api
                    .create_invoice(
                        request.order_id.as_str(),
                        request.amount,
                        request.currency,
                        asset.code(),
                        &description,
                    )
                    .await?;
                debug!("💳️ Invoice for order {} created with status '{}'", request.order_id, invoice.status);
                let order_status = OrderStatus::from_provider(&invoice.status);
                let payment = Payment {
                    provider: self.key(),
                    provider_label: self.label(),
                    invoice_id: invoice.invoice_id,
                    invoice_url: invoice.invoice_url,
                    status: Some(invoice.status),
                    pay_currency: Some(invoice.pay_currency),
                    pay_amount: invoice.pay_amount,
                    actually_paid: None,
                    created_at: request.created_at,
                    updated_at: request.created_at,
                };
                Ok(PaymentIntent { order_status, payment })
            },
        }
    }
}

//--------------------------------------   ProviderRegistry    -------------------------------------------------------
/// Public projection of a provider, as returned by the provider-listing endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfo {
    pub key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub provider_type: String,
    pub pay_currency: Option<String>,
    pub supports_redirect: bool,
}

/// The set of providers enabled for this deployment. Static after startup.
#[derive(Clone)]
pub struct ProviderRegistry {
    providers: Vec<PaymentProvider>,
}

impl ProviderRegistry {
    /// Manual settlement is always registered. When a hosted invoice API client is supplied
    /// (i.e. all credentials were configured), one crypto provider per supported asset joins it.
    pub fn new(hosted: Option<NowPaymentsApi>) -> Self {
        let mut providers = vec![PaymentProvider::Manual];
        match hosted {
            Some(api) => {
                for asset in CryptoAsset::ALL {
                    providers.push(PaymentProvider::HostedCrypto { asset, api: api.clone() });
                }
                info!("💳️ Hosted crypto payments enabled ({} assets)", CryptoAsset::ALL.len());
            },
            None => {
                info!("💳️ Hosted crypto payments are not configured. Running in manual-only mode.");
            },
        }
        Self { providers }
    }

    pub fn hosted_enabled(&self) -> bool {
        self.providers.iter().any(|p| matches!(p, PaymentProvider::HostedCrypto { .. }))
    }

    /// Look up a provider by key, case-insensitively.
    pub fn get(&self, key: &str) -> Option<&PaymentProvider> {
        let key = key.to_lowercase();
        self.providers.iter().find(|p| p.key() == key)
    }

    /// Resolve the provider for a new order. An explicit key must match a registered provider;
    /// without one, the generic crypto key is preferred, then manual settlement.
    pub fn resolve(&self, requested: Option<&str>) -> Result<&PaymentProvider, ProviderError> {
        match requested.map(str::trim).filter(|s| !s.is_empty()) {
            Some(key) => self.get(key).ok_or_else(|| ProviderError::UnknownProvider(key.to_string())),
            None => self
                .get(GENERIC_CRYPTO_KEY)
                .or_else(|| self.get(MANUAL_PROVIDER_KEY))
                .ok_or(ProviderError::NoProviderConfigured),
        }
    }

    /// Resolve a display label for a provider key, registered or not.
    ///
    /// Unregistered keys fall back to the legacy generic label, or to a title-cased rendering of
    /// the key itself.
    pub fn provider_label(&self, key: &str) -> String {
        if key.is_empty() {
            return "Payment".to_string();
        }
        if let Some(provider) = self.get(key) {
            return provider.label();
        }
        if key.to_lowercase() == GENERIC_CRYPTO_KEY {
            return GENERIC_CRYPTO_LABEL.to_string();
        }
        title_case(key)
    }

    pub fn listing(&self) -> Vec<ProviderInfo> {
        self.providers
            .iter()
            .map(|p| ProviderInfo {
                key: p.key(),
                label: p.label(),
                provider_type: p.provider_type().to_string(),
                pay_currency: p.pay_currency(),
                supports_redirect: p.supports_redirect(),
            })
            .collect()
    }
}
