//! Viewing: list the secrets sealed for the session account and reveal one
//! on demand.

use crate::contract::{SealedRecord, SecretRegistry};
use crate::crypto;
use crate::keys::KeyService;
use crate::metadata::SecretMetadata;
use crate::storage::{ContentGateway, ContentPointer};
use crate::wallet::WalletSession;
use crate::Result;
use alloy::primitives::{Address, U256};
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// An on-chain record joined with its fetched metadata
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedSecret {
    pub metadata: SecretMetadata,
    pub sender: Address,
    pub sender_token_id: U256,
    pub receiver: Address,
    pub token_id: U256,
}

pub struct SecretViewer {
    keys: Arc<dyn KeyService>,
    registry: Arc<dyn SecretRegistry>,
    gateway: Arc<dyn ContentGateway>,
}

impl SecretViewer {
    pub fn new(
        keys: Arc<dyn KeyService>,
        registry: Arc<dyn SecretRegistry>,
        gateway: Arc<dyn ContentGateway>,
    ) -> Self {
        Self {
            keys,
            registry,
            gateway,
        }
    }

    /// Every secret sealed for the session account, unrevealed.
    ///
    /// Metadata for each record is fetched concurrently; one failed fetch
    /// fails the whole load.
    #[instrument(skip_all, fields(account = %session.address))]
    pub async fn load(&self, session: &WalletSession) -> Result<Vec<ReceivedSecret>> {
        let records = self.registry.sealed_for(session, session.address).await?;
        debug!(count = records.len(), "SecretSealed records found");

        let secrets =
            try_join_all(records.into_iter().map(|record| self.resolve(session, record))).await?;
        info!(count = secrets.len(), "Received secrets loaded");
        Ok(secrets)
    }

    async fn resolve(
        &self,
        session: &WalletSession,
        record: SealedRecord,
    ) -> Result<ReceivedSecret> {
        let uri = self
            .registry
            .token_uri(session, record.receiver_token_id)
            .await?;
        let pointer = ContentPointer::from_uri(&uri);
        let value = self.gateway.fetch_json(&pointer).await?;
        let metadata: SecretMetadata = serde_json::from_value(value)?;

        Ok(ReceivedSecret {
            metadata,
            sender: record.sender,
            sender_token_id: record.sender_token_id,
            receiver: record.receiver,
            token_id: record.receiver_token_id,
        })
    }

    /// Fetch the ciphertext, have the key network unwrap the key, decrypt.
    ///
    /// The key network decides whether the session may see the key; a
    /// refusal comes back as an opaque key service error.
    #[instrument(skip_all, fields(account = %session.address, token_id = %secret.token_id))]
    pub async fn reveal(&self, session: &WalletSession, secret: &ReceivedSecret) -> Result<String> {
        let payload = &secret.metadata.secret;
        let ciphertext = self
            .gateway
            .fetch_bytes(&payload.encrypted_string_hash)
            .await?;

        let chain = payload
            .access_control_conditions
            .chain()
            .unwrap_or_else(|| session.network.key_chain());
        let key = self
            .keys
            .unwrap_key(
                &payload.access_control_conditions,
                &payload.encrypted_symmetric_key,
                &session.auth,
                chain,
            )
            .await?;

        let message = crypto::decrypt_string(&ciphertext, &key)?;
        info!("Secret revealed");
        Ok(message)
    }

    pub fn image_url(&self, secret: &ReceivedSecret) -> String {
        self.gateway
            .url_for(&ContentPointer::from_uri(&secret.metadata.image))
    }
}
