use std::env;

use log::*;
use nowpayments_tools::NowPaymentsConfig;

const DEFAULT_SPG_HOST: &str = "127.0.0.1";
const DEFAULT_SPG_PORT: u16 = 8360;
const DEFAULT_STATE_FILE: &str = "./data/state.json";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Path of the JSON state document. Created (with defaults) on first start.
    pub state_file: String,
    pub nowpayments: NowPaymentsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SPG_HOST.to_string(),
            port: DEFAULT_SPG_PORT,
            state_file: DEFAULT_STATE_FILE.to_string(),
            nowpayments: NowPaymentsConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SPG_HOST").ok().unwrap_or_else(|| DEFAULT_SPG_HOST.into());
        let port = env::var("SPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for SPG_PORT. {e} Using the default, {DEFAULT_SPG_PORT}, instead."
                    );
                    DEFAULT_SPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_SPG_PORT);
        let state_file = env::var("SPG_STATE_FILE").ok().unwrap_or_else(|| {
            info!("🪛️ SPG_STATE_FILE is not set. Using the default, {DEFAULT_STATE_FILE}.");
            DEFAULT_STATE_FILE.to_string()
        });
        let nowpayments = NowPaymentsConfig::new_from_env_or_default();
        if !nowpayments.is_enabled() {
            info!("🪛️ Hosted crypto payment credentials are incomplete. The store will run in manual-only mode.");
        }
        Self { host, port, state_file, nowpayments }
    }
}
