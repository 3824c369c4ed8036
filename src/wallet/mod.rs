//! Wallet management
//!
//! Private keys stay inside [`SecureWallet`]. Everything else in the crate
//! talks to the wallet through [`WalletProvider`] and works with the
//! [`WalletSession`] produced by [`WalletConnector`].

mod connector;
mod provider;
mod session;
mod signer;

pub use connector::{Connection, WalletConnector};
pub use provider::{LocalWallet, WalletEvent, WalletProvider};
pub use session::WalletSession;
pub use signer::SecureWallet;
