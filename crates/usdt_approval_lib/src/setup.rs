use crate::config::Config;
use crate::error::ApprovalError;
use crate::error::ErrorBag;

use crate::utils::DecimalConvExt;
use crate::{err_custom_create, err_from};
use serde::Serialize;
use std::collections::BTreeMap;
use web3::transports::Http;
use web3::types::{Address, U256};
use web3::Web3;

/// Everything the gateway needs to know about one configured network.
/// Built once at session start, immutable afterwards.
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ChainSetup {
    pub network: String,
    #[serde(skip_serializing)]
    pub provider: Web3<Http>,
    pub chain_name: String,
    pub chain_id: i64,
    pub currency_gas_symbol: String,
    pub token_address: Address,
    pub token_symbol: String,
    pub max_fee_per_gas: U256,
    pub priority_fee: U256,
    pub transaction_timeout: u64,
    pub confirmation_blocks: u64,
    pub block_explorer_url: Option<String>,
}

/// Registry of configured chains, keyed by chain id.
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalSetup {
    pub chain_setup: BTreeMap<i64, ChainSetup>,
    pub process_sleep: u64,
}

impl ApprovalSetup {
    pub fn new(config: &Config) -> Result<Self, ApprovalError> {
        let mut ps = ApprovalSetup {
            chain_setup: BTreeMap::new(),
            process_sleep: config.engine.process_sleep,
        };
        for (network, chain_config) in &config.chain {
            let endpoint = chain_config.rpc_endpoints.first().ok_or(err_custom_create!(
                "No rpc endpoint found for chain {}",
                network
            ))?;
            let transport = web3::transports::Http::new(endpoint).map_err(err_from!())?;

            ps.chain_setup.insert(
                chain_config.chain_id,
                ChainSetup {
                    network: network.clone(),
                    provider: Web3::new(transport),
                    chain_name: chain_config.chain_name.clone(),
                    chain_id: chain_config.chain_id,
                    currency_gas_symbol: chain_config.currency_symbol.clone(),
                    token_address: chain_config.token.address,
                    token_symbol: chain_config.token.symbol.clone(),
                    max_fee_per_gas: chain_config
                        .max_fee_per_gas
                        .to_u256_from_gwei()
                        .map_err(err_from!())?,
                    priority_fee: chain_config
                        .priority_fee
                        .to_u256_from_gwei()
                        .map_err(err_from!())?,
                    transaction_timeout: chain_config.transaction_timeout,
                    confirmation_blocks: chain_config.confirmation_blocks,
                    block_explorer_url: chain_config.block_explorer_url.clone(),
                },
            );
        }
        Ok(ps)
    }

    /// Pure lookup, no failure beyond "not there".
    pub fn describe(&self, chain_id: i64) -> Option<&ChainSetup> {
        self.chain_setup.get(&chain_id)
    }

    /// Display name for any chain id. Unregistered ids degrade to a
    /// placeholder instead of failing the caller.
    pub fn chain_display_name(&self, chain_id: i64) -> String {
        self.describe(chain_id)
            .map(|c| c.chain_name.clone())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    pub fn get_chain_setup(&self, chain_id: i64) -> Result<&ChainSetup, ApprovalError> {
        self.chain_setup
            .get(&chain_id)
            .ok_or_else(|| err_custom_create!("No chain setup for chain id: {}", chain_id))
    }

    pub fn get_provider(&self, chain_id: i64) -> Result<Web3<Http>, ApprovalError> {
        Ok(self.get_chain_setup(chain_id)?.provider.clone())
    }

    pub fn find_chain_by_network(&self, network: &str) -> Option<&ChainSetup> {
        self.chain_setup.values().find(|c| c.network == network)
    }
}
