use serde::Deserialize;
use std::collections::btree_map::BTreeMap as Map;

use std::path::Path;

use crate::error::*;
use crate::{err_custom_create, err_from};
use tokio::fs;
use web3::types::Address;

/// Chain set shipped with the binary: BSC, Base and Arbitrum with their
/// USDT contract addresses.
const DEFAULT_CONFIG: &str = include_str!("../config-default.toml");

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Engine {
    pub process_sleep: u64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub chain: Map<String, Chain>,
    pub engine: Engine,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct Chain {
    pub chain_name: String,
    pub chain_id: i64,
    pub rpc_endpoints: Vec<String>,
    pub currency_symbol: String,
    pub priority_fee: rust_decimal::Decimal,
    pub max_fee_per_gas: rust_decimal::Decimal,
    pub token: Token,
    pub transaction_timeout: u64,
    pub confirmation_blocks: u64,
    pub block_explorer_url: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Token {
    pub symbol: String,
    pub address: Address,
}

impl Config {
    pub fn load_from_str(str: &str) -> Result<Self, ApprovalError> {
        match toml::from_str(str) {
            Ok(config) => Ok(config),
            Err(e) => Err(err_custom_create!("Failed to parse toml {}: {}", str, e)),
        }
    }

    pub fn load_default() -> Result<Self, ApprovalError> {
        Self::load_from_str(DEFAULT_CONFIG)
    }

    pub async fn load<P: AsRef<Path> + std::fmt::Display>(path: P) -> Result<Self, ApprovalError> {
        let str = fs::read_to_string(&path).await.map_err(err_from!())?;
        match toml::from_str(&str) {
            Ok(config) => Ok(config),
            Err(e) => Err(err_custom_create!("Failed to parse toml {}: {}", path, e)),
        }
    }
}
