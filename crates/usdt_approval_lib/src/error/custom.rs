use std::fmt::Display;

/// Error with a free-form message, created via the err_custom_create! macro
#[derive(Debug, Clone)]
pub struct CustomError {
    pub message: String,
}

impl CustomError {
    pub fn from_owned_string(message: String) -> Self {
        Self { message }
    }
}

impl Display for CustomError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CustomError {}

/// Raised when the wallet's active chain differs from the chain an approval
/// targets at submission time
#[derive(Debug, Clone)]
pub struct ChainMismatchError {
    pub expected: i64,
    pub active: i64,
}

impl Display for ChainMismatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "wallet active chain {} does not match target chain {}",
            self.active, self.expected
        )
    }
}

impl std::error::Error for ChainMismatchError {}

/// Receipt arrived with status 0
#[derive(Debug, Clone)]
pub struct TransactionRevertedError {
    pub message: String,
}

impl TransactionRevertedError {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

impl Display for TransactionRevertedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for TransactionRevertedError {}
