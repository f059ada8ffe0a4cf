//! Configuration management
//!
//! Load monitor settings from a .env file (dotenv + environment) or from a
//! TOML file. CLI flags in main.rs override whatever is loaded here.
//!
//! Environment keys:
//!     RPC_URL / INFURA_PROJECT_ID, POOL_ADDRESS, EVENT_NAME, POOL_ABI_FILE,
//!     CHANNEL_CAPACITY, MAX_RECONNECTS, RECONNECT_DELAY_SECS

use alloy::primitives::Address;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::contracts::DEFAULT_EVENT;
use crate::subscription::DEFAULT_CHANNEL_CAPACITY;

const INFURA_WS_MAINNET: &str = "wss://mainnet.infura.io/ws/v3/";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MonitorConfig {
    pub rpc_url: String,
    pub pool_address: Address,
    #[serde(default = "default_event")]
    pub event_name: String,
    /// Schema file; the built-in Uniswap V3 pool ABI when unset
    #[serde(default)]
    pub abi_file: Option<PathBuf>,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    #[serde(default = "default_max_reconnects")]
    pub max_reconnects: u32,
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,
}

fn default_event() -> String { DEFAULT_EVENT.to_string() }
fn default_channel_capacity() -> usize { DEFAULT_CHANNEL_CAPACITY }
fn default_max_reconnects() -> u32 { 50 }
fn default_reconnect_delay() -> u64 { 5 }

/// Values supplied on the command line; each one replaces its loaded
/// counterpart
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub pool_address: Option<Address>,
    pub event_name: Option<String>,
    pub abi_file: Option<PathBuf>,
}

impl MonitorConfig {
    /// Apply CLI overrides on top of a loaded config
    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        if let Some(pool) = overrides.pool_address {
            self.pool_address = pool;
        }
        if let Some(event) = &overrides.event_name {
            self.event_name = event.clone();
        }
        if let Some(abi) = &overrides.abi_file {
            self.abi_file = Some(abi.clone());
        }
    }

    /// Load configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).with_context(|| "Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Read the schema text this config points at, if any
    pub fn read_abi(&self) -> Result<Option<String>> {
        match &self.abi_file {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read ABI file: {}", path.display()))
                .map(Some),
            None => Ok(None),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.rpc_url.is_empty() {
            bail!("rpc_url is empty");
        }
        if !(self.rpc_url.starts_with("ws://") || self.rpc_url.starts_with("wss://")) {
            bail!("rpc_url must be a ws:// or wss:// endpoint for log subscriptions");
        }
        if self.event_name.is_empty() {
            bail!("event_name is empty");
        }
        if self.channel_capacity == 0 {
            bail!("channel_capacity must be at least 1");
        }
        Ok(())
    }
}

/// Load from a specific .env file, then the process environment
pub fn load_config_from_file(env_file: &str, overrides: &ConfigOverrides) -> Result<MonitorConfig> {
    dotenv::from_filename(env_file).ok();
    load_config(overrides)
}

/// Load from .env (if present) and the process environment
pub fn load_config(overrides: &ConfigOverrides) -> Result<MonitorConfig> {
    dotenv::dotenv().ok();
    config_from_lookup(|key| std::env::var(key).ok(), overrides)
}

fn config_from_lookup<F>(get: F, overrides: &ConfigOverrides) -> Result<MonitorConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let rpc_url = match get("RPC_URL") {
        Some(url) => url,
        None => {
            let project_id = get("INFURA_PROJECT_ID")
                .context("neither RPC_URL nor INFURA_PROJECT_ID is set")?;
            format!("{}{}", INFURA_WS_MAINNET, project_id)
        }
    };

    // A CLI pool address makes POOL_ADDRESS optional
    let pool_address = match overrides.pool_address {
        Some(pool) => pool,
        None => {
            let pool = get("POOL_ADDRESS").context("POOL_ADDRESS not set")?;
            Address::from_str(pool.trim())
                .with_context(|| format!("POOL_ADDRESS is not an address: {}", pool))?
        }
    };

    let mut config = MonitorConfig {
        rpc_url,
        pool_address,
        event_name: get("EVENT_NAME").unwrap_or_else(default_event),
        abi_file: get("POOL_ABI_FILE").map(PathBuf::from),
        channel_capacity: parse_or(&get, "CHANNEL_CAPACITY", default_channel_capacity())?,
        max_reconnects: parse_or(&get, "MAX_RECONNECTS", default_max_reconnects())?,
        reconnect_delay_secs: parse_or(&get, "RECONNECT_DELAY_SECS", default_reconnect_delay())?,
    };
    config.apply(overrides);
    config.validate()?;
    Ok(config)
}

fn parse_or<F, V>(get: &F, key: &str, default: V) -> Result<V>
where
    F: Fn(&str) -> Option<String>,
    V: FromStr,
    V::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", key, raw)),
        None => Ok(default),
    }
}
