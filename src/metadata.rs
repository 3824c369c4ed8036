//! Secret metadata documents
//!
//! Pinned once at seal time and never mutated. The layout follows the usual
//! NFT metadata shape so wallets and marketplaces can render the receiver's
//! token; the `secret` object carries what the receiver needs to reveal it.

use crate::keys::WrappedKey;
use crate::policy::AccessPolicy;
use crate::storage::ContentPointer;
use alloy::primitives::Address;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const EXTERNAL_URL: &str = "https://secretsomeone.xyz/";
pub const IMAGE: &str = "ipfs://QmUoHwYKUVdUuXTKUSMQGW1g4Sovbuztm9rQ33y4pdJ5Xm";
pub const IMAGE_DESCRIPTION: &str = "Photo by Folco Masi on Unsplash";

const TRAIT_SEALED_ON: &str = "sealed on";
const TRAIT_SENDER: &str = "sender";
const TRAIT_RECEIVER: &str = "receiver";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretPayload {
    pub access_control_conditions: AccessPolicy,
    pub encrypted_symmetric_key: WrappedKey,
    /// Pointer to the ciphertext blob
    pub encrypted_string_hash: ContentPointer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_type: Option<String>,
    pub trait_type: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecretMetadata {
    pub description: String,
    pub name: String,
    pub external_url: String,
    pub image: String,
    pub image_description: String,
    pub secret: SecretPayload,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

impl SecretMetadata {
    pub fn new(
        sender: Address,
        receiver: Address,
        title: Option<&str>,
        secret: SecretPayload,
        sealed_at: DateTime<Utc>,
    ) -> Self {
        let sender = sender.to_checksum(None);
        let receiver = receiver.to_checksum(None);
        let name = match title.map(str::trim) {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => format!("Secret for {}", receiver),
        };

        Self {
            description: format!(
                "A secret was sealed between {} and {} on {}",
                sender,
                receiver,
                sealed_at.timestamp_millis()
            ),
            name,
            external_url: EXTERNAL_URL.to_string(),
            image: IMAGE.to_string(),
            image_description: IMAGE_DESCRIPTION.to_string(),
            secret,
            attributes: vec![
                Attribute {
                    display_type: Some("date".to_string()),
                    trait_type: TRAIT_SEALED_ON.to_string(),
                    value: Value::from(sealed_at.timestamp()),
                },
                Attribute {
                    display_type: None,
                    trait_type: TRAIT_SENDER.to_string(),
                    value: Value::from(sender),
                },
                Attribute {
                    display_type: None,
                    trait_type: TRAIT_RECEIVER.to_string(),
                    value: Value::from(receiver),
                },
            ],
        }
    }

    pub fn title(&self) -> &str {
        &self.name
    }

    fn attribute(&self, trait_type: &str) -> Option<&Value> {
        self.attributes
            .iter()
            .find(|a| a.trait_type == trait_type)
            .map(|a| &a.value)
    }

    pub fn sender(&self) -> Option<Address> {
        self.attribute(TRAIT_SENDER)?.as_str()?.parse().ok()
    }

    pub fn receiver(&self) -> Option<Address> {
        self.attribute(TRAIT_RECEIVER)?.as_str()?.parse().ok()
    }

    pub fn sealed_on(&self) -> Option<DateTime<Utc>> {
        let seconds = self.attribute(TRAIT_SEALED_ON)?.as_i64()?;
        Utc.timestamp_opt(seconds, 0).single()
    }
}
