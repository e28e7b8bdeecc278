use anyhow::{Context, Result};
use serde::Serialize;

use crate::engine::rate_limit::DEFAULT_MAX_REQ_PER_SECOND;

/// Controller construction options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub client_id: i32,
    pub max_req_per_second: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 7496,
            client_id: 0,
            max_req_per_second: DEFAULT_MAX_REQ_PER_SECOND,
        }
    }
}

impl Config {
    /// Defaults overlaid with environment variables (call `load_env()` first).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with whatever `lookup` returns for the known keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(host) = lookup("IB_HOST").filter(|h| !h.trim().is_empty()) {
            config.host = host.trim().to_string();
        }
        if let Some(port) = lookup("IB_PORT") {
            config.port = port
                .trim()
                .parse()
                .with_context(|| format!("IB_PORT is not a valid port: {port:?}"))?;
        }
        if let Some(id) = lookup("IB_CLIENT_ID").or_else(|| lookup("DEFAULT_CLIENT_ID")) {
            config.client_id = id
                .trim()
                .parse()
                .with_context(|| format!("IB_CLIENT_ID is not an integer: {id:?}"))?;
        }
        if let Some(rate) = lookup("MAX_REQ_PER_SECOND") {
            config.max_req_per_second = rate
                .trim()
                .parse()
                .with_context(|| format!("MAX_REQ_PER_SECOND is not a count: {rate:?}"))?;
        }

        Ok(config)
    }
}

/// Load .env file from the current directory, if any.
pub fn load_env() {
    let _ = dotenv::dotenv();
}
