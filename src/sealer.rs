//! Sealing: encrypt, wrap, upload and register a secret for one receiver
//!
//! Steps run strictly in order and the first failure aborts the rest.
//! Content pinned before a failing step is left where it is.

use crate::contract::{SealedRecord, SecretRegistry};
use crate::crypto;
use crate::keys::KeyService;
use crate::metadata::{SecretMetadata, SecretPayload};
use crate::policy::AccessPolicy;
use crate::storage::{ContentPointer, PinningService};
use crate::wallet::WalletSession;
use crate::{Error, Result};
use alloy::primitives::{Address, TxHash};
use chrono::Utc;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument};

pub const CIPHERTEXT_FILE_NAME: &str = "encryptedString.bin";

/// What the user typed into the seal form
#[derive(Debug, Clone, Default)]
pub struct SealRequest {
    pub receiver: String,
    pub title: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct SealReceipt {
    pub metadata_pointer: ContentPointer,
    pub ciphertext_pointer: ContentPointer,
    pub tx_hash: TxHash,
    pub record: Option<SealedRecord>,
    pub metadata: SecretMetadata,
}

/// Parse a receiver the way wallets do: all-lowercase or all-uppercase hex is
/// accepted as is, mixed case must carry a valid EIP-55 checksum.
pub fn parse_address(input: &str) -> Result<Address> {
    let input = input.trim();
    let digits = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);
    let prefixed = format!("0x{}", digits);

    let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
    let parsed = if has_upper && has_lower {
        Address::parse_checksummed(&prefixed, None).map_err(|e| e.to_string())
    } else {
        Address::from_str(&prefixed).map_err(|e| e.to_string())
    };

    parsed.map_err(|e| Error::InvalidArgument(format!("{:?} is not a valid address: {}", input, e)))
}

/// Checks that must pass before anything leaves the process
pub fn validate_receiver(sender: Address, receiver: &str) -> Result<Address> {
    let receiver = parse_address(receiver)?;
    if receiver == sender {
        return Err(Error::SelfAddressed);
    }
    Ok(receiver)
}

pub struct SecretSealer {
    keys: Arc<dyn KeyService>,
    pinning: Arc<dyn PinningService>,
    registry: Arc<dyn SecretRegistry>,
}

impl SecretSealer {
    pub fn new(
        keys: Arc<dyn KeyService>,
        pinning: Arc<dyn PinningService>,
        registry: Arc<dyn SecretRegistry>,
    ) -> Self {
        Self {
            keys,
            pinning,
            registry,
        }
    }

    #[instrument(skip_all, fields(sender = %session.address, network = %session.network))]
    pub async fn seal(
        &self,
        session: &WalletSession,
        request: &SealRequest,
    ) -> Result<SealReceipt> {
        let receiver = validate_receiver(session.address, &request.receiver)?;
        let sender = session.address;
        let chain = session.network.key_chain();

        let (ciphertext, key) = crypto::encrypt_string(&request.message)?;
        let policy = AccessPolicy::for_reader(chain, receiver);

        let wrapped = self
            .keys
            .wrap_key(&policy, &key, &session.auth, chain)
            .await?;
        drop(key);
        info!(
            receiver = %receiver,
            service = self.keys.name(),
            "Key wrapped under receiver policy"
        );

        let pin_prefix = format!(
            "{}_{}",
            sender.to_checksum(None),
            receiver.to_checksum(None)
        );
        let ciphertext_pointer = self
            .pinning
            .pin_file(
                ciphertext,
                CIPHERTEXT_FILE_NAME,
                &format!("{}_encryptedString", pin_prefix),
            )
            .await?;
        info!(pointer = %ciphertext_pointer, service = self.pinning.name(), "Ciphertext pinned");

        let metadata = SecretMetadata::new(
            sender,
            receiver,
            request.title.as_deref(),
            SecretPayload {
                access_control_conditions: policy,
                encrypted_symmetric_key: wrapped,
                encrypted_string_hash: ciphertext_pointer.clone(),
            },
            Utc::now(),
        );
        let metadata_pointer = self
            .pinning
            .pin_json(
                &serde_json::to_value(&metadata)?,
                &format!("{}_secret", pin_prefix),
            )
            .await?;
        info!(pointer = %metadata_pointer, "Metadata pinned");

        let sent = self
            .registry
            .send_secret(session, receiver, &metadata_pointer)
            .await?;
        info!(
            pointer = %metadata_pointer,
            tx_hash = %sent.tx_hash,
            "Secret sealed"
        );

        Ok(SealReceipt {
            metadata_pointer,
            ciphertext_pointer,
            tx_hash: sent.tx_hash,
            record: sent.record,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    const SENDER: Address = address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266");

    #[test]
    fn parse_accepts_lowercase_uppercase_and_checksummed() {
        let expected = address!("70997970c51812dc3a010c7d01b50e0d17dc79c8");
        assert_eq!(
            parse_address("0x70997970c51812dc3a010c7d01b50e0d17dc79c8").unwrap(),
            expected
        );
        assert_eq!(
            parse_address("0x70997970C51812DC3A010C7D01B50E0D17DC79C8").unwrap(),
            expected
        );
        assert_eq!(
            parse_address(" 0x70997970C51812dc3A010C7d01b50e0d17dc79C8 ").unwrap(),
            expected
        );
        assert_eq!(
            parse_address("70997970c51812dc3a010c7d01b50e0d17dc79c8").unwrap(),
            expected
        );
    }

    #[test]
    fn parse_rejects_bad_checksum_and_garbage() {
        assert!(matches!(
            parse_address("0x70997970c51812dc3A010C7d01b50e0d17dc79C8"),
            Err(Error::InvalidArgument(_))
        ));
        assert!(parse_address("0xdEAf69").is_err());
        assert!(parse_address("").is_err());
        assert!(parse_address("vitalik.eth").is_err());
    }

    #[test]
    fn self_addressed_is_rejected_case_insensitively() {
        assert!(matches!(
            validate_receiver(SENDER, "0xF39FD6E51AAD88F6F4CE6AB8827279CFFFB92266"),
            Err(Error::SelfAddressed)
        ));
        assert!(validate_receiver(SENDER, "0x70997970c51812dc3a010c7d01b50e0d17dc79c8").is_ok());
    }
}
