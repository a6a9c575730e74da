use crate::eth::get_eth_addr_from_secret;
use crate::setup::ApprovalSetup;
use crate::transaction::{estimate_call_gas, ContractCall};
use secp256k1::SecretKey;
use std::fmt::Display;
use std::future::Future;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use web3::types::{Address, TransactionParameters, H256, U64};

#[derive(Debug, Clone)]
pub enum WalletError {
    /// The wallet holder (or the wallet itself) declined the operation
    Rejected(String),
    /// Transport or node-side failure
    Rpc(String),
}

impl Display for WalletError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WalletError::Rejected(msg) => write!(f, "rejected by wallet: {msg}"),
            WalletError::Rpc(msg) => write!(f, "wallet rpc error: {msg}"),
        }
    }
}

impl std::error::Error for WalletError {}

/// Capability boundary towards whatever holds the keys. The controller and
/// the gateway only ever talk to this trait, never to key material.
pub trait Wallet {
    /// Address the wallet currently exposes
    fn address(&self) -> Address;

    /// Chain the wallet is currently targeting for transactions
    fn active_chain_id(&self) -> impl Future<Output = Result<i64, WalletError>> + Send;

    /// Ask the wallet to retarget another chain, may be declined
    fn switch_chain(&self, chain_id: i64) -> impl Future<Output = Result<(), WalletError>> + Send;

    /// Sign a contract call and broadcast it, returning the transaction hash
    /// once the network accepted it
    fn sign_and_broadcast(
        &self,
        call: ContractCall,
    ) -> impl Future<Output = Result<H256, WalletError>> + Send;
}

/// In-memory single-key wallet over the registry's providers. Tracks the
/// chain it is targeting the way a browser wallet does, switching is local
/// and only succeeds for registered chains.
pub struct PrivateKeyWallet {
    secret_key: SecretKey,
    pub_address: Address,
    setup: Arc<ApprovalSetup>,
    active_chain_id: Mutex<i64>,
}

impl PrivateKeyWallet {
    pub fn new(secret_key: SecretKey, setup: Arc<ApprovalSetup>, initial_chain_id: i64) -> Self {
        let pub_address = get_eth_addr_from_secret(&secret_key);
        Self {
            secret_key,
            pub_address,
            setup,
            active_chain_id: Mutex::new(initial_chain_id),
        }
    }
}

impl Wallet for PrivateKeyWallet {
    fn address(&self) -> Address {
        self.pub_address
    }

    async fn active_chain_id(&self) -> Result<i64, WalletError> {
        Ok(*self.active_chain_id.lock().expect("poisoned"))
    }

    async fn switch_chain(&self, chain_id: i64) -> Result<(), WalletError> {
        if self.setup.describe(chain_id).is_none() {
            return Err(WalletError::Rejected(format!(
                "chain {chain_id} is not configured in this wallet"
            )));
        }
        *self.active_chain_id.lock().expect("poisoned") = chain_id;
        log::info!(
            "Wallet switched to chain {} ({})",
            chain_id,
            self.setup.chain_display_name(chain_id)
        );
        Ok(())
    }

    async fn sign_and_broadcast(&self, call: ContractCall) -> Result<H256, WalletError> {
        if call.from != self.pub_address {
            return Err(WalletError::Rejected(format!(
                "wallet does not hold the key for {:#x}",
                call.from
            )));
        }
        let chain_setup = self
            .setup
            .get_chain_setup(call.chain_id)
            .map_err(|err| WalletError::Rpc(err.to_string()))?;
        let web3 = &chain_setup.provider;

        let gas_limit = estimate_call_gas(web3, &call)
            .await
            .map_err(|err| WalletError::Rpc(err.to_string()))?;

        let nonce = web3
            .eth()
            .transaction_count(call.from, Some(web3::types::BlockNumber::Pending))
            .await
            .map_err(|err| WalletError::Rpc(err.to_string()))?;

        let tx_object = TransactionParameters {
            nonce: Some(nonce),
            to: Some(call.to),
            gas: gas_limit,
            gas_price: None,
            value: Default::default(),
            data: call.call_data.into(),
            chain_id: Some(call.chain_id as u64),
            transaction_type: Some(U64::from(2)),
            access_list: None,
            max_fee_per_gas: Some(chain_setup.max_fee_per_gas),
            max_priority_fee_per_gas: Some(chain_setup.priority_fee),
        };
        log::debug!("Signing transaction: {:#?}", tx_object);
        let signed = web3
            .accounts()
            .sign_transaction(tx_object, &self.secret_key)
            .await
            .map_err(|err| WalletError::Rpc(format!("Error when signing transaction: {err}")))?;

        let tx_hash = web3
            .eth()
            .send_raw_transaction(signed.raw_transaction)
            .await
            .map_err(|err| WalletError::Rpc(format!("Error sending transaction: {err}")))?;
        log::info!(
            "Transaction sent on chain {}, tx hash: {:#x}",
            call.chain_id,
            tx_hash
        );
        Ok(tx_hash)
    }
}

/// Parse a single hex-encoded private key, as kept in the ETH_PRIVATE_KEY
/// env variable.
pub fn load_private_key(str: &str) -> Result<(SecretKey, Address), WalletError> {
    let secret = SecretKey::from_str(str.trim().trim_start_matches("0x"))
        .map_err(|err| WalletError::Rejected(format!("Invalid private key: {err}")))?;
    let public_addr = get_eth_addr_from_secret(&secret);
    Ok((secret, public_addr))
}
