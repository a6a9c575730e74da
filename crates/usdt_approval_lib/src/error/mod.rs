mod bag;
mod custom;
mod reason;
mod wrapped;

pub use bag::ErrorBag;
pub use custom::{ChainMismatchError, CustomError, TransactionRevertedError};
pub use reason::FailureReason;
pub use wrapped::ApprovalError;

/// Export macros for creating errors
mod macros;
