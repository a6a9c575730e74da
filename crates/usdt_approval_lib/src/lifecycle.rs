use crate::error::*;
use crate::gateway::{AllowanceSnapshot, ContractGateway};
use crate::wallet::Wallet;
use crate::err_custom_create;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use web3::types::Address;

/// Phase of the single approval flow a session can run at a time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ApprovalPhase {
    Idle,
    SwitchingChain,
    Submitting,
    AwaitingConfirmation,
    Confirmed,
    Failed(FailureReason),
}

impl ApprovalPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ApprovalPhase::Confirmed | ApprovalPhase::Failed(_))
    }

    /// A new submission is only accepted when nothing is in flight.
    /// Confirmed has to be acknowledged first, Failed is directly
    /// re-enterable.
    pub fn accepts_submission(&self) -> bool {
        matches!(self, ApprovalPhase::Idle | ApprovalPhase::Failed(_))
    }
}

/// One user-initiated approval, consumed by a single flow run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequest {
    pub id: String,
    pub amount: String,
    pub target_chain_id: i64,
}

impl ApprovalRequest {
    pub fn new(amount: String, target_chain_id: i64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            amount,
            target_chain_id,
        }
    }
}

/// Observable session state. Mutated only by the flow, read by the
/// presentation layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub phase: ApprovalPhase,
    pub allowance: Option<AllowanceSnapshot>,
    pub active_request: Option<ApprovalRequest>,
    pub last_tx_hash: Option<String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            phase: ApprovalPhase::Idle,
            allowance: None,
            active_request: None,
            last_tx_hash: None,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionEventContent {
    PhaseChanged(ApprovalPhase),
    ApprovalConfirmed {
        request_id: String,
        tx_hash: String,
        block_number: u64,
    },
    AllowanceRefreshed(AllowanceSnapshot),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEvent {
    pub create_date: DateTime<Utc>,
    pub content: SessionEventContent,
}

pub async fn send_session_event(
    event_sender: &Option<tokio::sync::mpsc::Sender<SessionEvent>>,
    content: SessionEventContent,
) {
    if let Some(event_sender) = event_sender {
        let event = SessionEvent {
            create_date: Utc::now(),
            content,
        };
        if let Err(e) = event_sender.send(event).await {
            log::error!("Error sending event: {}", e);
        }
    }
}

/// Drives one approval at a time through
/// ensure-chain -> submit -> confirm -> refresh.
pub struct ApprovalFlow<W: Wallet, G: ContractGateway> {
    wallet: Arc<W>,
    gateway: Arc<G>,
    state: Arc<Mutex<SessionState>>,
    event_sender: Option<tokio::sync::mpsc::Sender<SessionEvent>>,
}

impl<W: Wallet + Send + Sync, G: ContractGateway + Send + Sync> ApprovalFlow<W, G> {
    pub fn new(
        wallet: Arc<W>,
        gateway: Arc<G>,
        event_sender: Option<tokio::sync::mpsc::Sender<SessionEvent>>,
    ) -> Self {
        Self {
            wallet,
            gateway,
            state: Arc::new(Mutex::new(SessionState::new())),
            event_sender,
        }
    }

    pub fn state(&self) -> Arc<Mutex<SessionState>> {
        self.state.clone()
    }

    pub async fn phase(&self) -> ApprovalPhase {
        self.state.lock().await.phase.clone()
    }

    pub async fn allowance(&self) -> Option<AllowanceSnapshot> {
        self.state.lock().await.allowance.clone()
    }

    /// Used by the presentation layer to disable the submit action.
    pub async fn can_submit(&self) -> bool {
        self.state.lock().await.phase.accepts_submission()
    }

    /// Run one approval. Flow failures end up in the observable state as
    /// Failed(reason) and are returned as the final phase, an Err is only
    /// produced when the request is not accepted at all.
    pub async fn submit_approval(
        &self,
        request: ApprovalRequest,
        spender: Address,
    ) -> Result<ApprovalPhase, ApprovalError> {
        let owner = self.wallet.address();
        let target = request.target_chain_id;

        // the phase must leave the accepting set before the lock is
        // released, otherwise two submissions could both pass the guard
        let mut state = self.state.lock().await;
        if !state.phase.accepts_submission() {
            return Err(err_custom_create!(
                "Approval request rejected, another one is {:?}",
                state.phase
            ));
        }
        state.active_request = Some(request.clone());
        state.last_tx_hash = None;

        let active = match self.wallet.active_chain_id().await {
            Ok(active) => active,
            Err(err) => {
                log::warn!("Wallet did not report its active chain: {err}");
                state.phase = ApprovalPhase::Failed(FailureReason::NetworkError);
                let phase = state.phase.clone();
                drop(state);
                send_session_event(
                    &self.event_sender,
                    SessionEventContent::PhaseChanged(phase.clone()),
                )
                .await;
                return Ok(phase);
            }
        };

        let needs_switch = active != target;
        state.phase = if needs_switch {
            ApprovalPhase::SwitchingChain
        } else {
            ApprovalPhase::Submitting
        };
        let entered = state.phase.clone();
        drop(state);
        send_session_event(&self.event_sender, SessionEventContent::PhaseChanged(entered)).await;

        if needs_switch {
            log::info!("Switching wallet from chain {active} to chain {target}");
            if let Err(err) = self.wallet.switch_chain(target).await {
                log::warn!("Chain switch to {target} rejected: {err}");
                return self.fail(FailureReason::ChainSwitchRejected).await;
            }
            self.set_phase(ApprovalPhase::Submitting).await;
        }

        let decimals = match self.gateway.read_decimals(target).await {
            Ok(decimals) => decimals,
            Err(err) => {
                log::warn!("Failed to read token decimals on chain {target}: {err}");
                return self.fail(err.failure_reason()).await;
            }
        };

        let handle = match self
            .gateway
            .submit_approval(target, owner, spender, &request.amount, decimals)
            .await
        {
            Ok(handle) => handle,
            Err(err) => {
                log::warn!("Approval submission failed: {err}");
                return self.fail(err.failure_reason()).await;
            }
        };
        self.state.lock().await.last_tx_hash = Some(format!("{:#x}", handle.tx_hash));
        self.set_phase(ApprovalPhase::AwaitingConfirmation).await;

        let confirmed = match self.gateway.await_confirmation(&handle).await {
            Ok(confirmed) => confirmed,
            Err(err) => {
                log::warn!("Approval not confirmed: {err}");
                return self.fail(err.failure_reason()).await;
            }
        };

        self.set_phase(ApprovalPhase::Confirmed).await;
        send_session_event(
            &self.event_sender,
            SessionEventContent::ApprovalConfirmed {
                request_id: request.id.clone(),
                tx_hash: format!("{:#x}", handle.tx_hash),
                block_number: confirmed.block_number,
            },
        )
        .await;

        // exactly one refresh per confirmed approval, no polling
        self.refresh_allowance(target, owner, spender).await;

        Ok(ApprovalPhase::Confirmed)
    }

    /// Re-read the allowance and publish the snapshot. A failed read leaves
    /// the allowance unknown (displayed as zero) and is not retried.
    pub async fn refresh_allowance(&self, chain_id: i64, owner: Address, spender: Address) {
        match self.gateway.read_allowance(chain_id, owner, spender).await {
            Ok(snapshot) => {
                self.state.lock().await.allowance = Some(snapshot.clone());
                send_session_event(
                    &self.event_sender,
                    SessionEventContent::AllowanceRefreshed(snapshot),
                )
                .await;
            }
            Err(err) => {
                log::warn!("Allowance refresh failed, allowance unknown: {err}");
                self.state.lock().await.allowance = None;
            }
        }
    }

    /// Leave a terminal phase, making the session ready for the next
    /// request.
    pub async fn acknowledge(&self) {
        let mut state = self.state.lock().await;
        if state.phase.is_terminal() {
            state.phase = ApprovalPhase::Idle;
            state.active_request = None;
            drop(state);
            send_session_event(
                &self.event_sender,
                SessionEventContent::PhaseChanged(ApprovalPhase::Idle),
            )
            .await;
        }
    }

    async fn set_phase(&self, phase: ApprovalPhase) {
        self.state.lock().await.phase = phase.clone();
        send_session_event(&self.event_sender, SessionEventContent::PhaseChanged(phase)).await;
    }

    async fn fail(&self, reason: FailureReason) -> Result<ApprovalPhase, ApprovalError> {
        let phase = ApprovalPhase::Failed(reason);
        self.set_phase(phase.clone()).await;
        Ok(phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_predicates() {
        assert!(ApprovalPhase::Idle.accepts_submission());
        assert!(ApprovalPhase::Failed(FailureReason::Timeout).accepts_submission());
        assert!(!ApprovalPhase::Confirmed.accepts_submission());
        assert!(!ApprovalPhase::SwitchingChain.accepts_submission());
        assert!(!ApprovalPhase::Submitting.accepts_submission());
        assert!(!ApprovalPhase::AwaitingConfirmation.accepts_submission());

        assert!(ApprovalPhase::Confirmed.is_terminal());
        assert!(ApprovalPhase::Failed(FailureReason::UserRejected).is_terminal());
        assert!(!ApprovalPhase::Idle.is_terminal());
    }

    #[test]
    fn test_request_ids_are_unique() {
        let a = ApprovalRequest::new("1".to_string(), 56);
        let b = ApprovalRequest::new("1".to_string(), 56);
        assert_ne!(a.id, b.id);
    }
}
