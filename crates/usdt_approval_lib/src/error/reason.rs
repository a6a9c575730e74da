use super::{ApprovalError, ErrorBag};
use crate::wallet::WalletError;
use serde::Serialize;
use std::fmt::Display;

/// User-facing classification of a failed approval attempt. Every error that
/// ends a flow is collapsed into one of these so the presentation layer can
/// show a short, reason-specific message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureReason {
    InvalidAmount,
    ChainMismatch,
    ChainSwitchRejected,
    UserRejected,
    NetworkError,
    TransactionReverted,
    Timeout,
}

impl Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            FailureReason::InvalidAmount => "amount does not match token precision",
            FailureReason::ChainMismatch => "wallet is targeting a different chain",
            FailureReason::ChainSwitchRejected => "chain switch was rejected",
            FailureReason::UserRejected => "transaction was rejected in the wallet",
            FailureReason::NetworkError => "network error while talking to the chain",
            FailureReason::TransactionReverted => "transaction reverted on chain",
            FailureReason::Timeout => "timed out waiting for confirmation",
        };
        write!(f, "{msg}")
    }
}

impl ApprovalError {
    pub fn failure_reason(&self) -> FailureReason {
        match &self.inner {
            ErrorBag::ConversionError(_) => FailureReason::InvalidAmount,
            ErrorBag::ChainMismatch(_) => FailureReason::ChainMismatch,
            ErrorBag::WalletError(WalletError::Rejected(_)) => FailureReason::UserRejected,
            ErrorBag::TransactionReverted(_) => FailureReason::TransactionReverted,
            ErrorBag::TimeLimitReached(_) => FailureReason::Timeout,
            _ => FailureReason::NetworkError,
        }
    }
}
