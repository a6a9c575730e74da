use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use usdt_approval_lib::error::*;
use usdt_approval_lib::gateway::{
    AllowanceSnapshot, ConfirmedInfo, ContractGateway, TransactionHandle,
};
use usdt_approval_lib::lifecycle::{
    ApprovalFlow, ApprovalPhase, ApprovalRequest, SessionEvent, SessionEventContent,
};
use usdt_approval_lib::transaction::ContractCall;
use usdt_approval_lib::utils::{parse_token_amount, token_amount_to_base_units};
use usdt_approval_lib::wallet::{Wallet, WalletError};
use usdt_approval_lib::{err_create, err_custom_create, err_from};
use web3::types::{Address, H256, U256};

struct MockWallet {
    address: Address,
    active_chain: Mutex<i64>,
    reject_switch: bool,
    switch_calls: AtomicUsize,
}

impl MockWallet {
    fn new(active_chain: i64) -> Self {
        Self {
            address: Address::from_low_u64_be(0xaa),
            active_chain: Mutex::new(active_chain),
            reject_switch: false,
            switch_calls: AtomicUsize::new(0),
        }
    }

    fn declining(active_chain: i64) -> Self {
        Self {
            reject_switch: true,
            ..Self::new(active_chain)
        }
    }
}

impl Wallet for MockWallet {
    fn address(&self) -> Address {
        self.address
    }

    async fn active_chain_id(&self) -> Result<i64, WalletError> {
        Ok(*self.active_chain.lock().unwrap())
    }

    async fn switch_chain(&self, chain_id: i64) -> Result<(), WalletError> {
        self.switch_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_switch {
            return Err(WalletError::Rejected("user declined the switch".to_string()));
        }
        *self.active_chain.lock().unwrap() = chain_id;
        Ok(())
    }

    async fn sign_and_broadcast(&self, _call: ContractCall) -> Result<H256, WalletError> {
        Ok(H256::zero())
    }
}

#[derive(Clone, Copy, PartialEq)]
enum SubmitBehavior {
    Accept,
    RejectUser,
    FailTransport,
}

#[derive(Clone)]
enum ConfirmBehavior {
    Confirm,
    Revert,
    TimeOut,
    HoldUntil(Arc<Notify>),
}

struct MockGateway {
    decimals: u8,
    allowance: Mutex<U256>,
    fail_allowance_read: bool,
    submit_behavior: SubmitBehavior,
    confirm_behavior: ConfirmBehavior,
    broadcast_count: AtomicUsize,
    allowance_reads: AtomicUsize,
}

impl MockGateway {
    fn new(decimals: u8) -> Self {
        Self {
            decimals,
            allowance: Mutex::new(U256::zero()),
            fail_allowance_read: false,
            submit_behavior: SubmitBehavior::Accept,
            confirm_behavior: ConfirmBehavior::Confirm,
            broadcast_count: AtomicUsize::new(0),
            allowance_reads: AtomicUsize::new(0),
        }
    }
}

impl ContractGateway for MockGateway {
    async fn read_allowance(
        &self,
        _chain_id: i64,
        _owner: Address,
        _spender: Address,
    ) -> Result<AllowanceSnapshot, ApprovalError> {
        self.allowance_reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_allowance_read {
            return Err(err_custom_create!("allowance read failed"));
        }
        Ok(AllowanceSnapshot {
            raw_value: *self.allowance.lock().unwrap(),
            decimals: self.decimals,
        })
    }

    async fn read_decimals(&self, _chain_id: i64) -> Result<u8, ApprovalError> {
        Ok(self.decimals)
    }

    async fn submit_approval(
        &self,
        chain_id: i64,
        _owner: Address,
        _spender: Address,
        amount: &str,
        decimals: u8,
    ) -> Result<TransactionHandle, ApprovalError> {
        // same validation order as the production gateway, nothing is
        // broadcast for an invalid amount
        let amount_dec = parse_token_amount(amount).map_err(err_from!())?;
        let base_units = token_amount_to_base_units(amount_dec, decimals).map_err(err_from!())?;
        match self.submit_behavior {
            SubmitBehavior::RejectUser => {
                return Err(err_create!(WalletError::Rejected(
                    "user declined".to_string()
                )));
            }
            SubmitBehavior::FailTransport => {
                return Err(err_create!(WalletError::Rpc("node unreachable".to_string())));
            }
            SubmitBehavior::Accept => {}
        }
        self.broadcast_count.fetch_add(1, Ordering::SeqCst);
        *self.allowance.lock().unwrap() = base_units;
        Ok(TransactionHandle {
            chain_id,
            tx_hash: H256::from_low_u64_be(0x1234),
        })
    }

    async fn await_confirmation(
        &self,
        _handle: &TransactionHandle,
    ) -> Result<ConfirmedInfo, ApprovalError> {
        match &self.confirm_behavior {
            ConfirmBehavior::Confirm => Ok(ConfirmedInfo { block_number: 100 }),
            ConfirmBehavior::Revert => Err(err_create!(TransactionRevertedError::new(
                "transaction reverted"
            ))),
            ConfirmBehavior::TimeOut => Err(err_create!(Duration::from_secs(300))),
            ConfirmBehavior::HoldUntil(release) => {
                release.notified().await;
                Ok(ConfirmedInfo { block_number: 100 })
            }
        }
    }
}

type TestFlow = ApprovalFlow<MockWallet, MockGateway>;

fn make_flow(
    wallet: MockWallet,
    gateway: MockGateway,
) -> (
    Arc<TestFlow>,
    Arc<MockWallet>,
    Arc<MockGateway>,
    tokio::sync::mpsc::Receiver<SessionEvent>,
) {
    let wallet = Arc::new(wallet);
    let gateway = Arc::new(gateway);
    let (event_tx, event_rx) = tokio::sync::mpsc::channel(64);
    let flow = Arc::new(ApprovalFlow::new(
        wallet.clone(),
        gateway.clone(),
        Some(event_tx),
    ));
    (flow, wallet, gateway, event_rx)
}

fn spender() -> Address {
    Address::from_low_u64_be(0xbb)
}

fn drain(rx: &mut tokio::sync::mpsc::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = vec![];
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn phases(events: &[SessionEvent]) -> Vec<ApprovalPhase> {
    events
        .iter()
        .filter_map(|e| match &e.content {
            SessionEventContent::PhaseChanged(phase) => Some(phase.clone()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_approve_on_active_chain() {
    let (flow, _wallet, gateway, mut rx) = make_flow(MockWallet::new(56), MockGateway::new(6));

    let request = ApprovalRequest::new("1000.50".to_string(), 56);
    let phase = flow.submit_approval(request, spender()).await.unwrap();
    assert_eq!(phase, ApprovalPhase::Confirmed);

    let events = drain(&mut rx);
    assert_eq!(
        phases(&events),
        vec![
            ApprovalPhase::Submitting,
            ApprovalPhase::AwaitingConfirmation,
            ApprovalPhase::Confirmed,
        ]
    );
    assert_eq!(gateway.broadcast_count.load(Ordering::SeqCst), 1);
    // exactly one allowance refresh after confirmation
    assert_eq!(gateway.allowance_reads.load(Ordering::SeqCst), 1);
    assert!(events
        .iter()
        .any(|e| matches!(e.content, SessionEventContent::AllowanceRefreshed(_))));

    let snapshot = flow.allowance().await.unwrap();
    assert_eq!(snapshot.raw_value, U256::from(1000500000_u64));
    assert_eq!(snapshot.formatted(), "1000.5");
}

#[tokio::test]
async fn test_approve_switches_chain_first() {
    let (flow, wallet, gateway, mut rx) = make_flow(MockWallet::new(56), MockGateway::new(6));

    let request = ApprovalRequest::new("10".to_string(), 8453);
    let phase = flow.submit_approval(request, spender()).await.unwrap();
    assert_eq!(phase, ApprovalPhase::Confirmed);

    assert_eq!(
        phases(&drain(&mut rx)),
        vec![
            ApprovalPhase::SwitchingChain,
            ApprovalPhase::Submitting,
            ApprovalPhase::AwaitingConfirmation,
            ApprovalPhase::Confirmed,
        ]
    );
    assert_eq!(wallet.switch_calls.load(Ordering::SeqCst), 1);
    assert_eq!(*wallet.active_chain.lock().unwrap(), 8453);
    assert_eq!(gateway.broadcast_count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_declined_chain_switch_never_submits() {
    let (flow, wallet, gateway, mut rx) =
        make_flow(MockWallet::declining(56), MockGateway::new(6));

    let request = ApprovalRequest::new("10".to_string(), 8453);
    let phase = flow.submit_approval(request, spender()).await.unwrap();
    assert_eq!(
        phase,
        ApprovalPhase::Failed(FailureReason::ChainSwitchRejected)
    );

    assert_eq!(
        phases(&drain(&mut rx)),
        vec![
            ApprovalPhase::SwitchingChain,
            ApprovalPhase::Failed(FailureReason::ChainSwitchRejected),
        ]
    );
    assert_eq!(wallet.switch_calls.load(Ordering::SeqCst), 1);
    assert_eq!(gateway.broadcast_count.load(Ordering::SeqCst), 0);
    assert_eq!(gateway.allowance_reads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_invalid_amount_issues_no_network_call() {
    let (flow, _wallet, gateway, mut rx) = make_flow(MockWallet::new(56), MockGateway::new(6));

    let request = ApprovalRequest::new("1000.1234567".to_string(), 56);
    let phase = flow.submit_approval(request, spender()).await.unwrap();
    assert_eq!(phase, ApprovalPhase::Failed(FailureReason::InvalidAmount));

    assert_eq!(
        phases(&drain(&mut rx)),
        vec![
            ApprovalPhase::Submitting,
            ApprovalPhase::Failed(FailureReason::InvalidAmount),
        ]
    );
    assert_eq!(gateway.broadcast_count.load(Ordering::SeqCst), 0);
    assert_eq!(gateway.allowance_reads.load(Ordering::SeqCst), 0);

    // Failed is directly re-enterable
    assert!(flow.can_submit().await);
    let request = ApprovalRequest::new("1000.123456".to_string(), 56);
    let phase = flow.submit_approval(request, spender()).await.unwrap();
    assert_eq!(phase, ApprovalPhase::Confirmed);
}

#[tokio::test]
async fn test_wallet_rejection_fails_flow() {
    let gateway = MockGateway {
        submit_behavior: SubmitBehavior::RejectUser,
        ..MockGateway::new(6)
    };
    let (flow, _wallet, gateway, _rx) = make_flow(MockWallet::new(56), gateway);

    let request = ApprovalRequest::new("10".to_string(), 56);
    let phase = flow.submit_approval(request, spender()).await.unwrap();
    assert_eq!(phase, ApprovalPhase::Failed(FailureReason::UserRejected));
    assert_eq!(gateway.broadcast_count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_transport_failure_fails_flow() {
    let gateway = MockGateway {
        submit_behavior: SubmitBehavior::FailTransport,
        ..MockGateway::new(6)
    };
    let (flow, _wallet, _gateway, _rx) = make_flow(MockWallet::new(56), gateway);

    let request = ApprovalRequest::new("10".to_string(), 56);
    let phase = flow.submit_approval(request, spender()).await.unwrap();
    assert_eq!(phase, ApprovalPhase::Failed(FailureReason::NetworkError));
}

#[tokio::test]
async fn test_reverted_transaction_fails_flow() {
    let gateway = MockGateway {
        confirm_behavior: ConfirmBehavior::Revert,
        ..MockGateway::new(6)
    };
    let (flow, _wallet, gateway, mut rx) = make_flow(MockWallet::new(56), gateway);

    let request = ApprovalRequest::new("10".to_string(), 56);
    let phase = flow.submit_approval(request, spender()).await.unwrap();
    assert_eq!(
        phase,
        ApprovalPhase::Failed(FailureReason::TransactionReverted)
    );
    assert_eq!(
        phases(&drain(&mut rx)),
        vec![
            ApprovalPhase::Submitting,
            ApprovalPhase::AwaitingConfirmation,
            ApprovalPhase::Failed(FailureReason::TransactionReverted),
        ]
    );
    // no refresh on a failed flow
    assert_eq!(gateway.allowance_reads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_confirmation_timeout_fails_flow() {
    let gateway = MockGateway {
        confirm_behavior: ConfirmBehavior::TimeOut,
        ..MockGateway::new(6)
    };
    let (flow, _wallet, _gateway, _rx) = make_flow(MockWallet::new(56), gateway);

    let request = ApprovalRequest::new("10".to_string(), 56);
    let phase = flow.submit_approval(request, spender()).await.unwrap();
    assert_eq!(phase, ApprovalPhase::Failed(FailureReason::Timeout));
}

#[tokio::test]
async fn test_second_submission_rejected_while_in_flight() {
    let release = Arc::new(Notify::new());
    let gateway = MockGateway {
        confirm_behavior: ConfirmBehavior::HoldUntil(release.clone()),
        ..MockGateway::new(6)
    };
    let (flow, _wallet, gateway, _rx) = make_flow(MockWallet::new(56), gateway);

    let background_flow = flow.clone();
    let first = tokio::spawn(async move {
        let request = ApprovalRequest::new("10".to_string(), 56);
        background_flow.submit_approval(request, spender()).await
    });

    // wait until the first request reaches the confirmation wait
    loop {
        if flow.phase().await == ApprovalPhase::AwaitingConfirmation {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    assert!(!flow.can_submit().await);
    let request = ApprovalRequest::new("20".to_string(), 56);
    let second = flow.submit_approval(request, spender()).await;
    assert!(second.is_err());
    // rejected without side effect
    assert_eq!(gateway.broadcast_count.load(Ordering::SeqCst), 1);

    release.notify_one();
    let phase = first.await.unwrap().unwrap();
    assert_eq!(phase, ApprovalPhase::Confirmed);
}

#[tokio::test]
async fn test_confirmed_requires_acknowledge() {
    let (flow, _wallet, _gateway, _rx) = make_flow(MockWallet::new(56), MockGateway::new(6));

    let request = ApprovalRequest::new("10".to_string(), 56);
    let phase = flow.submit_approval(request, spender()).await.unwrap();
    assert_eq!(phase, ApprovalPhase::Confirmed);

    assert!(!flow.can_submit().await);
    let request = ApprovalRequest::new("20".to_string(), 56);
    assert!(flow.submit_approval(request, spender()).await.is_err());

    flow.acknowledge().await;
    assert_eq!(flow.phase().await, ApprovalPhase::Idle);
    assert!(flow.can_submit().await);

    let request = ApprovalRequest::new("20".to_string(), 56);
    let phase = flow.submit_approval(request, spender()).await.unwrap();
    assert_eq!(phase, ApprovalPhase::Confirmed);
}

#[tokio::test]
async fn test_failed_allowance_refresh_leaves_allowance_unknown() {
    let gateway = MockGateway {
        fail_allowance_read: true,
        ..MockGateway::new(6)
    };
    let (flow, _wallet, gateway, _rx) = make_flow(MockWallet::new(56), gateway);

    let request = ApprovalRequest::new("10".to_string(), 56);
    let phase = flow.submit_approval(request, spender()).await.unwrap();
    assert_eq!(phase, ApprovalPhase::Confirmed);

    // refresh was attempted once, its failure is not retried and the
    // allowance stays unknown
    assert_eq!(gateway.allowance_reads.load(Ordering::SeqCst), 1);
    assert!(flow.allowance().await.is_none());
}
