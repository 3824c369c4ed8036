//! Wallet provider abstraction
//!
//! Stands in for an injected browser wallet: it reports the active chain,
//! authorizes accounts, hands out the signer and publishes account/chain
//! change events to subscribers.

use super::SecureWallet;
use crate::{Error, Result};
use alloy::primitives::Address;
use alloy::providers::{Provider, ProviderBuilder};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use url::Url;

const EVENT_CAPACITY: usize = 16;

/// Change notifications emitted by a wallet provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    AccountsChanged(Vec<Address>),
    ChainChanged(u64),
}

#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Chain id of the network the wallet is currently connected to
    async fn chain_id(&self) -> Result<u64>;

    /// Ask the wallet to authorize its accounts; the first is the active one
    async fn request_accounts(&self) -> Result<Vec<Address>>;

    /// Signer for the active account
    async fn signer(&self) -> Result<Arc<SecureWallet>>;

    /// JSON-RPC endpoint the wallet is connected through
    async fn endpoint(&self) -> Result<Url>;

    /// Subscribe to account and chain changes
    fn subscribe(&self) -> broadcast::Receiver<WalletEvent>;
}

struct LocalState {
    signer: Arc<SecureWallet>,
    rpc_url: Url,
}

/// Wallet backed by a local private key and an HTTP JSON-RPC endpoint
pub struct LocalWallet {
    state: RwLock<LocalState>,
    events: broadcast::Sender<WalletEvent>,
}

impl LocalWallet {
    pub fn new(signer: SecureWallet, rpc_url: &str) -> Result<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            state: RwLock::new(LocalState {
                signer: Arc::new(signer),
                rpc_url: parse_url(rpc_url)?,
            }),
            events,
        })
    }

    /// Replace the active account and notify subscribers
    pub async fn switch_account(&self, signer: SecureWallet) {
        let address = signer.address();
        self.state.write().await.signer = Arc::new(signer);
        tracing::info!(address = %address, "Wallet account changed");
        // No subscribers is fine
        let _ = self.events.send(WalletEvent::AccountsChanged(vec![address]));
    }

    /// Point the wallet at another RPC endpoint and notify subscribers
    pub async fn switch_endpoint(&self, rpc_url: &str) -> Result<()> {
        let url = parse_url(rpc_url)?;
        self.state.write().await.rpc_url = url;
        let chain_id = self.chain_id().await?;
        tracing::info!(chain_id = chain_id, "Wallet network changed");
        let _ = self.events.send(WalletEvent::ChainChanged(chain_id));
        Ok(())
    }
}

fn parse_url(rpc_url: &str) -> Result<Url> {
    rpc_url
        .parse()
        .map_err(|e| Error::Wallet(format!("Invalid RPC URL {}: {}", rpc_url, e)))
}

#[async_trait]
impl WalletProvider for LocalWallet {
    async fn chain_id(&self) -> Result<u64> {
        let url = self.state.read().await.rpc_url.clone();
        let provider = ProviderBuilder::new().connect_http(url);
        provider
            .get_chain_id()
            .await
            .map_err(|e| Error::Wallet(format!("Failed to get chain id: {}", e)))
    }

    async fn request_accounts(&self) -> Result<Vec<Address>> {
        Ok(vec![self.state.read().await.signer.address()])
    }

    async fn signer(&self) -> Result<Arc<SecureWallet>> {
        Ok(Arc::clone(&self.state.read().await.signer))
    }

    async fn endpoint(&self) -> Result<Url> {
        Ok(self.state.read().await.rpc_url.clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_A: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const KEY_B: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

    #[tokio::test]
    async fn switch_account_notifies_subscribers() {
        let wallet =
            LocalWallet::new(SecureWallet::from_hex(KEY_A).unwrap(), "http://localhost:8545")
                .unwrap();
        let mut events = wallet.subscribe();

        let next = SecureWallet::from_hex(KEY_B).unwrap();
        let next_address = next.address();
        wallet.switch_account(next).await;

        assert_eq!(
            events.recv().await.unwrap(),
            WalletEvent::AccountsChanged(vec![next_address])
        );
        assert_eq!(wallet.request_accounts().await.unwrap(), vec![next_address]);
        assert_eq!(wallet.signer().await.unwrap().address(), next_address);
    }

    #[test]
    fn rejects_bad_rpc_url() {
        let result = LocalWallet::new(SecureWallet::from_hex(KEY_A).unwrap(), "not a url");
        assert!(matches!(result, Err(Error::Wallet(_))));
    }
}
