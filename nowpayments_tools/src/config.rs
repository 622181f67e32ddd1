use log::*;
use spg_common::Secret;

pub const DEFAULT_API_BASE: &str = "https://api.nowpayments.io";

#[derive(Debug, Clone, Default)]
pub struct NowPaymentsConfig {
    pub api_base: String,
    pub api_key: Secret<String>,
    pub ipn_secret: Secret<String>,
    /// The URL the payment provider posts IPN callbacks to.
    pub webhook_url: String,
    /// Redirect templates. A literal `{{orderId}}` placeholder is substituted at invoice time.
    pub success_url: String,
    pub cancel_url: String,
}

impl NowPaymentsConfig {
    pub fn new_from_env_or_default() -> Self {
        let domain = public_domain();
        let api_base = std::env::var("NP_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        let api_key = Secret::new(std::env::var("NP_API_KEY").unwrap_or_else(|_| {
            info!("🧾️ NP_API_KEY not set. Hosted crypto payments will be disabled.");
            String::default()
        }));
        let ipn_secret = Secret::new(std::env::var("NP_IPN_SECRET").unwrap_or_else(|_| {
            info!("🧾️ NP_IPN_SECRET not set. Hosted crypto payments will be disabled.");
            String::default()
        }));
        let webhook_url =
            std::env::var("NP_WEBHOOK_URL").unwrap_or_else(|_| format!("{domain}/api/nowpayments/webhook"));
        let success_url = std::env::var("NP_SUCCESS_URL")
            .unwrap_or_else(|_| format!("{domain}/account?order={{{{orderId}}}}&status=success"));
        let cancel_url = std::env::var("NP_CANCEL_URL")
            .unwrap_or_else(|_| format!("{domain}/account?order={{{{orderId}}}}&status=cancelled"));
        Self { api_base, api_key, ipn_secret, webhook_url, success_url, cancel_url }
    }

    /// Hosted payments are a deployment-time feature flag: all three credentials must be present.
    pub fn is_enabled(&self) -> bool {
        !self.api_key.reveal().is_empty() && !self.ipn_secret.reveal().is_empty() && !self.webhook_url.is_empty()
    }
}

fn public_domain() -> String {
    let raw = std::env::var("SPG_PUBLIC_DOMAIN").unwrap_or_else(|_| {
        warn!("🧾️ SPG_PUBLIC_DOMAIN not set, using http://localhost:5173 as default");
        "http://localhost:5173".to_string()
    });
    raw.trim_end_matches('/').to_string()
}
