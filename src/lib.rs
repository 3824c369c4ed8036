//! Secret Someone
//!
//! Seal a short encrypted message for one wallet address and reveal the
//! messages sealed for yours. The heavy lifting is delegated:
//! - a key-management network wraps the message key under a policy naming
//!   the receiver, and only unwraps it for a wallet proving that address
//! - a pinning service stores the ciphertext and the token metadata
//! - a contract mints the sender/receiver tokens and emits `SecretSealed`
//!
//! # Security Model
//!
//! - Plaintext and message keys never leave the process unencrypted
//! - Private keys never leave the wallet module
//! - Access is decided by the key network, never evaluated locally
//! - Audit trail of every connect, seal and reveal attempt

pub mod app;
pub mod audit;
pub mod config;
pub mod contract;
pub mod crypto;
pub mod keys;
pub mod metadata;
pub mod policy;
pub mod sealer;
pub mod shell;
pub mod storage;
pub mod viewer;
pub mod wallet;

mod error;

// Re-export commonly used types
pub use config::{Config, Network, RpcConfig};
pub use error::{Error, Result};
pub use sealer::{SealReceipt, SealRequest, SecretSealer};
pub use viewer::{ReceivedSecret, SecretViewer};
pub use wallet::{Connection, WalletConnector, WalletSession};
