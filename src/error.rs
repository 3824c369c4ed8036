//! Error types for Secret Someone

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Wrong network selected. Please connect to {expected} (wallet is on {actual})")]
    WrongNetwork { expected: String, actual: String },

    #[error("Connect Wallet")]
    NotConnected,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Don't be that loner! A secret cannot be sealed for its own sender")]
    SelfAddressed,

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Key service error: {0}")]
    KeyService(String),

    #[error("Pinning service error: {0}")]
    Pinning(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Contract error: {0}")]
    Contract(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
