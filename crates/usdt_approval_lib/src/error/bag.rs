use super::{ChainMismatchError, CustomError, TransactionRevertedError};
use crate::utils::ConversionError;
use crate::wallet::WalletError;
use rustc_hex::FromHexError;
use std::fmt::Display;
use std::time::Duration;

/// Enum containing all possible errors used in the library
#[derive(Debug)]
pub enum ErrorBag {
    IoError(std::io::Error),
    CustomError(CustomError),
    ChainMismatch(ChainMismatchError),
    TransactionReverted(TransactionRevertedError),
    EthAbiError(web3::ethabi::Error),
    Web3Error(web3::Error),
    WalletError(WalletError),
    ConversionError(ConversionError),
    FromHexError(FromHexError),
    TimeLimitReached(std::time::Duration),
}

impl Display for ErrorBag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorBag::IoError(io_error) => write!(f, "{io_error}"),
            ErrorBag::CustomError(custom_error) => write!(f, "{custom_error}"),
            ErrorBag::ChainMismatch(chain_mismatch) => write!(f, "{chain_mismatch}"),
            ErrorBag::TransactionReverted(reverted) => write!(f, "{reverted}"),
            ErrorBag::EthAbiError(eth_abi_error) => write!(f, "{eth_abi_error:?}"),
            ErrorBag::Web3Error(web3_error) => write!(f, "{web3_error:?}"),
            ErrorBag::WalletError(wallet_error) => write!(f, "{wallet_error}"),
            ErrorBag::ConversionError(conversion_error) => write!(f, "{conversion_error:?}"),
            ErrorBag::FromHexError(from_hex_error) => write!(f, "{from_hex_error:?}"),
            ErrorBag::TimeLimitReached(duration) => write!(f, "Time limit reached: {duration:?}"),
        }
    }
}

impl std::error::Error for ErrorBag {}

impl From<std::io::Error> for ErrorBag {
    fn from(err: std::io::Error) -> Self {
        ErrorBag::IoError(err)
    }
}

impl From<CustomError> for ErrorBag {
    fn from(err: CustomError) -> Self {
        ErrorBag::CustomError(err)
    }
}

impl From<ChainMismatchError> for ErrorBag {
    fn from(err: ChainMismatchError) -> Self {
        ErrorBag::ChainMismatch(err)
    }
}

impl From<TransactionRevertedError> for ErrorBag {
    fn from(err: TransactionRevertedError) -> Self {
        ErrorBag::TransactionReverted(err)
    }
}

impl From<web3::ethabi::Error> for ErrorBag {
    fn from(err: web3::ethabi::Error) -> Self {
        ErrorBag::EthAbiError(err)
    }
}

impl From<web3::Error> for ErrorBag {
    fn from(err: web3::Error) -> Self {
        ErrorBag::Web3Error(err)
    }
}

impl From<WalletError> for ErrorBag {
    fn from(err: WalletError) -> Self {
        ErrorBag::WalletError(err)
    }
}

impl From<ConversionError> for ErrorBag {
    fn from(err: ConversionError) -> Self {
        ErrorBag::ConversionError(err)
    }
}

impl From<FromHexError> for ErrorBag {
    fn from(err: FromHexError) -> Self {
        ErrorBag::FromHexError(err)
    }
}

impl From<Duration> for ErrorBag {
    fn from(err: Duration) -> Self {
        ErrorBag::TimeLimitReached(err)
    }
}
