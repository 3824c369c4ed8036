//! Secret Someone registry contract
//!
//! The contract mints a token to both parties of a sealed secret and points
//! the receiver's token at the metadata document. Its `SecretSealed` events
//! are the only record of who can see which pointer.

use crate::storage::ContentPointer;
use crate::wallet::WalletSession;
use crate::{Error, Result};
use alloy::eips::BlockNumberOrTag;
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::Filter;
use alloy::sol;
use alloy::sol_types::SolEvent;
use async_trait::async_trait;

sol! {
    #[sol(rpc)]
    contract SecretSomeone {
        event SecretSealed(
            address indexed sender,
            address indexed receiver,
            uint256 senderTokenId,
            uint256 receiverTokenId
        );

        function sendSecret(address receiver, string calldata secretHash) external;

        function tokenURI(uint256 tokenId) external view returns (string memory);
    }
}

/// One `SecretSealed` event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedRecord {
    pub sender: Address,
    pub receiver: Address,
    pub sender_token_id: U256,
    pub receiver_token_id: U256,
}

impl From<SecretSomeone::SecretSealed> for SealedRecord {
    fn from(event: SecretSomeone::SecretSealed) -> Self {
        Self {
            sender: event.sender,
            receiver: event.receiver,
            sender_token_id: event.senderTokenId,
            receiver_token_id: event.receiverTokenId,
        }
    }
}

/// Outcome of a confirmed `sendSecret` transaction
#[derive(Debug, Clone)]
pub struct SentSecret {
    pub tx_hash: TxHash,
    /// Event decoded from the receipt, when the contract emitted one
    pub record: Option<SealedRecord>,
}

#[async_trait]
pub trait SecretRegistry: Send + Sync {
    /// Deployed contract address
    fn address(&self) -> Address;

    /// Record a secret for `receiver` and wait for one confirmation
    async fn send_secret(
        &self,
        session: &WalletSession,
        receiver: Address,
        pointer: &ContentPointer,
    ) -> Result<SentSecret>;

    /// Metadata URI of a token
    async fn token_uri(&self, session: &WalletSession, token_id: U256) -> Result<String>;

    /// Every secret ever sealed for `receiver`, oldest first
    async fn sealed_for(
        &self,
        session: &WalletSession,
        receiver: Address,
    ) -> Result<Vec<SealedRecord>>;
}

/// Registry reached through the session wallet's JSON-RPC endpoint
pub struct OnChainRegistry {
    address: Address,
}

impl OnChainRegistry {
    pub fn new(address: Address) -> Self {
        Self { address }
    }
}

fn contract_error(context: &str) -> impl Fn(alloy::contract::Error) -> Error + '_ {
    move |e| Error::Contract(format!("{}: {}", context, e))
}

#[async_trait]
impl SecretRegistry for OnChainRegistry {
    fn address(&self) -> Address {
        self.address
    }

    async fn send_secret(
        &self,
        session: &WalletSession,
        receiver: Address,
        pointer: &ContentPointer,
    ) -> Result<SentSecret> {
        let provider = ProviderBuilder::new()
            .wallet(session.signer.wallet().clone())
            .connect_http(session.rpc_url.clone());
        let contract = SecretSomeone::new(self.address, provider);

        let pending = contract
            .sendSecret(receiver, pointer.to_string())
            .send()
            .await
            .map_err(contract_error("sendSecret failed"))?;
        let tx_hash = *pending.tx_hash();
        tracing::info!(tx_hash = %tx_hash, "sendSecret submitted, waiting for confirmation");

        let receipt = pending
            .with_required_confirmations(1)
            .get_receipt()
            .await
            .map_err(|e| Error::Contract(format!("Waiting for {} failed: {}", tx_hash, e)))?;

        if !receipt.status() {
            return Err(Error::Contract(format!("Transaction {} reverted", tx_hash)));
        }

        let record = receipt
            .inner
            .logs()
            .iter()
            .filter(|log| log.address() == self.address)
            .find_map(|log| log.log_decode::<SecretSomeone::SecretSealed>().ok())
            .map(|log| SealedRecord::from(log.inner.data));

        Ok(SentSecret { tx_hash, record })
    }

    async fn token_uri(&self, session: &WalletSession, token_id: U256) -> Result<String> {
        let provider = ProviderBuilder::new().connect_http(session.rpc_url.clone());
        let contract = SecretSomeone::new(self.address, provider);
        contract
            .tokenURI(token_id)
            .call()
            .await
            .map_err(contract_error("tokenURI failed"))
    }

    async fn sealed_for(
        &self,
        session: &WalletSession,
        receiver: Address,
    ) -> Result<Vec<SealedRecord>> {
        let provider = ProviderBuilder::new().connect_http(session.rpc_url.clone());
        let filter = Filter::new()
            .address(self.address)
            .event_signature(SecretSomeone::SecretSealed::SIGNATURE_HASH)
            .topic2(receiver.into_word())
            .from_block(BlockNumberOrTag::Earliest);

        let logs = provider
            .get_logs(&filter)
            .await
            .map_err(|e| Error::Contract(format!("SecretSealed query failed: {}", e)))?;

        logs.iter()
            .map(|log| {
                log.log_decode::<SecretSomeone::SecretSealed>()
                    .map(|decoded| SealedRecord::from(decoded.inner.data))
                    .map_err(|e| Error::Contract(format!("Undecodable SecretSealed log: {}", e)))
            })
            .collect()
    }
}
