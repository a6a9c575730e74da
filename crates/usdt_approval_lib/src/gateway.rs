use crate::error::*;
use crate::eth::{check_allowance, get_token_decimals};
use crate::setup::ApprovalSetup;
use crate::transaction::{create_erc20_approve, find_receipt};
use crate::utils::{base_units_to_decimal_string, parse_token_amount, token_amount_to_base_units};
use crate::wallet::Wallet;
use crate::{err_create, err_from};
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use web3::types::{Address, H256, U256};

/// Allowance as read from chain, together with the token precision needed
/// to render it.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowanceSnapshot {
    pub raw_value: U256,
    pub decimals: u8,
}

impl AllowanceSnapshot {
    pub fn formatted(&self) -> String {
        base_units_to_decimal_string(self.raw_value, self.decimals, None)
    }
}

/// Identifier of a broadcast approval, input to the confirmation wait.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionHandle {
    pub chain_id: i64,
    pub tx_hash: H256,
}

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmedInfo {
    pub block_number: u64,
}

/// Read and write access to the token contract on any registered chain.
/// The production implementation talks web3, tests substitute their own.
pub trait ContractGateway {
    fn read_allowance(
        &self,
        chain_id: i64,
        owner: Address,
        spender: Address,
    ) -> impl Future<Output = Result<AllowanceSnapshot, ApprovalError>> + Send;

    fn read_decimals(&self, chain_id: i64)
        -> impl Future<Output = Result<u8, ApprovalError>> + Send;

    fn submit_approval(
        &self,
        chain_id: i64,
        owner: Address,
        spender: Address,
        amount: &str,
        decimals: u8,
    ) -> impl Future<Output = Result<TransactionHandle, ApprovalError>> + Send;

    fn await_confirmation(
        &self,
        handle: &TransactionHandle,
    ) -> impl Future<Output = Result<ConfirmedInfo, ApprovalError>> + Send;
}

pub struct Web3Gateway<W: Wallet> {
    setup: Arc<ApprovalSetup>,
    wallet: Arc<W>,
    // decimals cannot change for a deployed token, fetch once per chain
    decimals_cache: Mutex<BTreeMap<i64, u8>>,
}

impl<W: Wallet> Web3Gateway<W> {
    pub fn new(setup: Arc<ApprovalSetup>, wallet: Arc<W>) -> Self {
        Self {
            setup,
            wallet,
            decimals_cache: Mutex::new(BTreeMap::new()),
        }
    }
}

impl<W: Wallet + Send + Sync> ContractGateway for Web3Gateway<W> {
    async fn read_allowance(
        &self,
        chain_id: i64,
        owner: Address,
        spender: Address,
    ) -> Result<AllowanceSnapshot, ApprovalError> {
        let decimals = self.read_decimals(chain_id).await?;
        let chain_setup = self.setup.get_chain_setup(chain_id)?;
        let raw_value =
            check_allowance(&chain_setup.provider, owner, chain_setup.token_address, spender)
                .await?;
        Ok(AllowanceSnapshot { raw_value, decimals })
    }

    async fn read_decimals(&self, chain_id: i64) -> Result<u8, ApprovalError> {
        if let Some(decimals) = self.decimals_cache.lock().expect("poisoned").get(&chain_id) {
            return Ok(*decimals);
        }
        let chain_setup = self.setup.get_chain_setup(chain_id)?;
        let decimals =
            get_token_decimals(&chain_setup.provider, chain_setup.token_address).await?;
        log::debug!(
            "Token {} on chain {} has {} decimals",
            chain_setup.token_symbol,
            chain_id,
            decimals
        );
        self.decimals_cache
            .lock()
            .expect("poisoned")
            .insert(chain_id, decimals);
        Ok(decimals)
    }

    async fn submit_approval(
        &self,
        chain_id: i64,
        owner: Address,
        spender: Address,
        amount: &str,
        decimals: u8,
    ) -> Result<TransactionHandle, ApprovalError> {
        // amount validation happens before anything touches the network
        let amount_dec = parse_token_amount(amount).map_err(err_from!())?;
        let base_units = token_amount_to_base_units(amount_dec, decimals).map_err(err_from!())?;

        let chain_setup = self.setup.get_chain_setup(chain_id)?;

        let active = self.wallet.active_chain_id().await.map_err(err_from!())?;
        if active != chain_id {
            return Err(err_create!(ChainMismatchError {
                expected: chain_id,
                active,
            }));
        }

        let call =
            create_erc20_approve(owner, chain_setup.token_address, spender, chain_id, base_units)?;
        log::info!(
            "Submitting approval of {} {} ({} base units) for spender {:#x} on {}",
            amount,
            chain_setup.token_symbol,
            base_units,
            spender,
            chain_setup.chain_name
        );
        let tx_hash = self.wallet.sign_and_broadcast(call).await.map_err(err_from!())?;
        Ok(TransactionHandle { chain_id, tx_hash })
    }

    async fn await_confirmation(
        &self,
        handle: &TransactionHandle,
    ) -> Result<ConfirmedInfo, ApprovalError> {
        let chain_setup = self.setup.get_chain_setup(handle.chain_id)?;
        let web3 = &chain_setup.provider;
        let timeout = Duration::from_secs(chain_setup.transaction_timeout);
        let started = Instant::now();

        loop {
            if let Some(receipt) = find_receipt(web3, handle.tx_hash).await? {
                if !receipt.succeeded {
                    return Err(err_create!(TransactionRevertedError::new(&format!(
                        "Transaction {:#x} reverted on chain {}",
                        handle.tx_hash, handle.chain_id
                    ))));
                }
                let current_block_number =
                    web3.eth().block_number().await.map_err(err_from!())?.as_u64();
                if receipt.block_number + chain_setup.confirmation_blocks <= current_block_number {
                    log::info!(
                        "Transaction confirmed: tx_hash: {:#x} in block {}",
                        handle.tx_hash,
                        receipt.block_number
                    );
                    return Ok(ConfirmedInfo {
                        block_number: receipt.block_number,
                    });
                }
                log::info!(
                    "Waiting for confirmations: tx {:#x}. Current block {}, expected at least: {}",
                    handle.tx_hash,
                    current_block_number,
                    receipt.block_number + chain_setup.confirmation_blocks
                );
            } else {
                log::debug!("Receipt not found: {:#x}", handle.tx_hash);
            }

            if started.elapsed() >= timeout {
                return Err(err_create!(timeout));
            }
            tokio::time::sleep(Duration::from_secs(self.setup.process_sleep)).await;
        }
    }
}
