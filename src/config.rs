use alloy::primitives::{Address, B256};
use serde::Deserialize;
use std::str::FromStr;

use crate::indexer::decoder::{DecodePolicy, TRANSFER_SIGNATURE};

/// Environment variable that overrides `node.rpc_http`.
pub const NODE_URL_ENV: &str = "ETHEREUM_NODE";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub node: NodeConfig,
    pub token: TokenConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub suspicion: SuspicionConfig,
    #[serde(default)]
    pub decoder: DecoderConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NodeConfig {
    #[serde(default)]
    pub rpc_http: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            rpc_http: String::new(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_max_retries() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct TokenConfig {
    pub symbol: String,
    pub address: String,
    pub decimals: u8,
    /// Topic 0 accepted by the decoder. Any event with two indexed addresses
    /// and a single uint256 in data works.
    #[serde(default = "default_event_signature")]
    pub event_signature: String,
}

fn default_event_signature() -> String {
    format!("0x{}", hex::encode(TRANSFER_SIGNATURE))
}

#[derive(Debug, Deserialize, Clone)]
pub struct WindowConfig {
    #[serde(default = "default_max_block_history")]
    pub max_block_history: u64,
    #[serde(default = "default_stats_blocks")]
    pub stats_blocks: u64,
    #[serde(default = "default_suspicion_blocks")]
    pub suspicion_blocks: u64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            max_block_history: default_max_block_history(),
            stats_blocks: default_stats_blocks(),
            suspicion_blocks: default_suspicion_blocks(),
        }
    }
}

fn default_max_block_history() -> u64 {
    120
}

fn default_stats_blocks() -> u64 {
    100
}

fn default_suspicion_blocks() -> u64 {
    1000
}

#[derive(Debug, Deserialize, Clone)]
pub struct SuspicionConfig {
    #[serde(default = "default_threshold")]
    pub threshold: usize,
}

impl Default for SuspicionConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
        }
    }
}

fn default_threshold() -> usize {
    crate::anomaly::engine::DEFAULT_THRESHOLD
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DecoderConfig {
    #[serde(default)]
    pub policy: DecodePolicy,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

impl Config {
    pub fn load(path: &str) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("Failed to read config file '{}': {}", path, e))?;
        let mut config: Config = toml::from_str(&content)
            .map_err(|e| eyre::eyre!("Failed to parse config file '{}': {}", path, e))?;
        config.apply_env_override(std::env::var(NODE_URL_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    fn apply_env_override(&mut self, node_url: Option<String>) {
        if let Some(url) = node_url.filter(|u| !u.is_empty()) {
            tracing::debug!("Using node URL from {}", NODE_URL_ENV);
            self.node.rpc_http = url;
        }
    }

    fn validate(&self) -> eyre::Result<()> {
        if self.node.rpc_http.is_empty() {
            return Err(eyre::eyre!(
                "No node URL configured: set node.rpc_http or {}",
                NODE_URL_ENV
            ));
        }
        if !self.token.address.starts_with("0x") || self.token.address.len() != 42 {
            return Err(eyre::eyre!(
                "Invalid token address '{}' for {}",
                self.token.address,
                self.token.symbol
            ));
        }
        if self.token.decimals == 0 {
            return Err(eyre::eyre!(
                "Token {} must have a positive number of decimals",
                self.token.symbol
            ));
        }
        if self.suspicion.threshold == 0 {
            return Err(eyre::eyre!("suspicion.threshold must be positive"));
        }
        self.contract_address()?;
        self.event_signature()?;
        Ok(())
    }

    pub fn contract_address(&self) -> eyre::Result<Address> {
        Address::from_str(&self.token.address)
            .map_err(|e| eyre::eyre!("Invalid address '{}': {}", self.token.address, e))
    }

    pub fn event_signature(&self) -> eyre::Result<B256> {
        B256::from_str(&self.token.event_signature).map_err(|e| {
            eyre::eyre!(
                "Invalid event signature '{}': {}",
                self.token.event_signature,
                e
            )
        })
    }
}
