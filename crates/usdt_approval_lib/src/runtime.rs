use crate::config::Config;
use crate::error::ApprovalError;
use crate::gateway::Web3Gateway;
use crate::lifecycle::{ApprovalFlow, SessionEvent, SessionState};
use crate::setup::ApprovalSetup;
use crate::wallet::{PrivateKeyWallet, Wallet};
use secp256k1::SecretKey;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A connected approval session: registry, wallet and the flow driving the
/// lifecycle. Lives from wallet connect to disconnect.
pub struct ApprovalRuntime {
    pub setup: Arc<ApprovalSetup>,
    pub wallet: Arc<PrivateKeyWallet>,
    pub flow: ApprovalFlow<PrivateKeyWallet, Web3Gateway<PrivateKeyWallet>>,
}

impl ApprovalRuntime {
    pub fn state(&self) -> Arc<Mutex<SessionState>> {
        self.flow.state()
    }

    /// Tear the session down. Dropping the flow closes the event channel,
    /// ending any presentation-side listener.
    pub fn disconnect(self) {
        log::info!("Approval session closed");
    }
}

pub fn connect_approval_session(
    config: &Config,
    secret_key: SecretKey,
    initial_chain_id: i64,
    event_sender: Option<tokio::sync::mpsc::Sender<SessionEvent>>,
) -> Result<ApprovalRuntime, ApprovalError> {
    let setup = Arc::new(ApprovalSetup::new(config)?);
    let wallet = Arc::new(PrivateKeyWallet::new(
        secret_key,
        setup.clone(),
        initial_chain_id,
    ));
    log::info!(
        "Approval session connected as {:#x}, wallet on chain {} ({})",
        wallet.address(),
        initial_chain_id,
        setup.chain_display_name(initial_chain_id)
    );
    let gateway = Arc::new(Web3Gateway::new(setup.clone(), wallet.clone()));
    let flow = ApprovalFlow::new(wallet.clone(), gateway, event_sender);
    Ok(ApprovalRuntime {
        setup,
        wallet,
        flow,
    })
}
