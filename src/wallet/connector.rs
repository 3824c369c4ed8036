//! Wallet connection flow
//!
//! network check → account authorization → key network sign-in → load the
//! secrets sealed for the account. The whole flow is re-run from scratch
//! whenever the wallet reports an account or network change.

use super::{WalletEvent, WalletProvider, WalletSession};
use crate::config::Network;
use crate::keys::{AuthSig, KeyService};
use crate::viewer::{ReceivedSecret, SecretViewer};
use crate::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument};

/// Result of a successful connect
#[derive(Debug, Clone)]
pub struct Connection {
    pub session: WalletSession,
    pub received: Vec<ReceivedSecret>,
}

pub struct WalletConnector {
    network: Network,
    wallet: Option<Arc<dyn WalletProvider>>,
    keys: Arc<dyn KeyService>,
    viewer: Arc<SecretViewer>,
    keys_connected: AtomicBool,
}

impl WalletConnector {
    pub fn new(
        network: Network,
        wallet: Option<Arc<dyn WalletProvider>>,
        keys: Arc<dyn KeyService>,
        viewer: Arc<SecretViewer>,
    ) -> Self {
        Self {
            network,
            wallet,
            keys,
            viewer,
            keys_connected: AtomicBool::new(false),
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Account/network change notifications, if a wallet is present
    pub fn subscribe(&self) -> Option<broadcast::Receiver<WalletEvent>> {
        self.wallet.as_ref().map(|wallet| wallet.subscribe())
    }

    /// Run the connection flow. Without a wallet this is a no-op returning `None`.
    #[instrument(skip_all, fields(network = %self.network))]
    pub async fn connect(&self) -> Result<Option<Connection>> {
        let Some(wallet) = self.wallet.as_ref() else {
            debug!("No wallet available, nothing to connect");
            return Ok(None);
        };

        let chain_id = wallet.chain_id().await?;
        match Network::from_chain_id(chain_id) {
            Some(network) if network == self.network => {}
            other => {
                return Err(Error::WrongNetwork {
                    expected: self.network.to_string(),
                    actual: other
                        .map(|n| n.to_string())
                        .unwrap_or_else(|| format!("chain {}", chain_id)),
                });
            }
        }

        let accounts = wallet.request_accounts().await?;
        let address = accounts
            .first()
            .copied()
            .ok_or_else(|| Error::Wallet("Wallet authorized no accounts".to_string()))?;
        let signer = wallet.signer().await?;
        if signer.address() != address {
            return Err(Error::Wallet(format!(
                "Signer {} does not match active account {}",
                signer.address(),
                address
            )));
        }
        let rpc_url = wallet.endpoint().await?;

        if !self.keys_connected.load(Ordering::Acquire) {
            self.keys.connect().await?;
            self.keys_connected.store(true, Ordering::Release);
        }
        let auth = AuthSig::sign(&signer, self.network)?;

        let session = WalletSession {
            address,
            network: self.network,
            rpc_url,
            signer,
            auth,
        };
        let received = self.viewer.load(&session).await?;

        info!(
            account = %session.address,
            received = received.len(),
            "Wallet connected"
        );
        Ok(Some(Connection { session, received }))
    }
}
