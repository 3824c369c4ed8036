//! Key-management network
//!
//! The key network holds symmetric keys under access policies. This crate
//! never evaluates a policy itself: it hands the network a policy, a raw key
//! and a wallet signature proving who is asking, and gets back either a
//! wrapped key (sealing) or the raw key (revealing).

mod auth;
mod client;

pub use auth::AuthSig;
pub use client::KeyNetworkClient;

use crate::crypto::SymmetricKey;
use crate::policy::AccessPolicy;
use crate::Result;
use async_trait::async_trait;
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A symmetric key after the key network placed it under a policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedKey(Vec<u8>);

impl WrappedKey {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn from_hex(input: &str) -> Result<Self> {
        let trimmed = input.strip_prefix("0x").unwrap_or(input);
        hex::decode(trimmed)
            .map(Self)
            .map_err(|e| crate::Error::KeyService(format!("Invalid wrapped key hex: {}", e)))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl Serialize for WrappedKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Accepts a hex string, a byte array, or the `{ "0": 12, "1": 200, ... }`
/// object older metadata documents contain.
impl<'de> Deserialize<'de> for WrappedKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct WrappedKeyVisitor;

        impl<'de> Visitor<'de> for WrappedKeyVisitor {
            type Value = WrappedKey;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a hex string, a byte array or an index-keyed byte object")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<WrappedKey, E> {
                WrappedKey::from_hex(v).map_err(E::custom)
            }

            fn visit_seq<A: SeqAccess<'de>>(
                self,
                mut seq: A,
            ) -> std::result::Result<WrappedKey, A::Error> {
                let mut bytes = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(byte) = seq.next_element::<u8>()? {
                    bytes.push(byte);
                }
                Ok(WrappedKey(bytes))
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<WrappedKey, A::Error> {
                let mut indexed = Vec::new();
                while let Some((index, byte)) = map.next_entry::<String, u8>()? {
                    let index: usize = index
                        .parse()
                        .map_err(|_| de::Error::custom(format!("non-numeric key {:?}", index)))?;
                    indexed.push((index, byte));
                }
                indexed.sort_unstable_by_key(|(index, _)| *index);
                if indexed.iter().enumerate().any(|(pos, (index, _))| pos != *index) {
                    return Err(de::Error::custom("byte object indices are not contiguous"));
                }
                Ok(WrappedKey(indexed.into_iter().map(|(_, b)| b).collect()))
            }
        }

        deserializer.deserialize_any(WrappedKeyVisitor)
    }
}

/// Client for the key-management network
#[async_trait]
pub trait KeyService: Send + Sync {
    /// Handshake with the network. Must succeed before wrapping or unwrapping.
    async fn connect(&self) -> Result<()>;

    /// Place `key` under `policy`, returning the wrapped form
    async fn wrap_key(
        &self,
        policy: &AccessPolicy,
        key: &SymmetricKey,
        auth: &AuthSig,
        chain: &str,
    ) -> Result<WrappedKey>;

    /// Recover the raw key; the network refuses unless `auth` satisfies `policy`
    async fn unwrap_key(
        &self,
        policy: &AccessPolicy,
        wrapped: &WrappedKey,
        auth: &AuthSig,
        chain: &str,
    ) -> Result<SymmetricKey>;

    /// Service name for logging
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wrapped_key_serializes_as_hex() {
        let key = WrappedKey::new(vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(serde_json::to_value(&key).unwrap(), json!("deadbeef"));
    }

    #[test]
    fn wrapped_key_accepts_legacy_forms() {
        let from_hex: WrappedKey = serde_json::from_value(json!("0xdeadbeef")).unwrap();
        let from_array: WrappedKey = serde_json::from_value(json!([222, 173, 190, 239])).unwrap();
        let from_object: WrappedKey =
            serde_json::from_value(json!({"1": 173, "0": 222, "3": 239, "2": 190})).unwrap();

        assert_eq!(from_hex.as_bytes(), &[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(from_array, from_hex);
        assert_eq!(from_object, from_hex);
    }

    #[test]
    fn wrapped_key_rejects_gapped_object() {
        let result: std::result::Result<WrappedKey, _> =
            serde_json::from_value(json!({"0": 1, "2": 3}));
        assert!(result.is_err());
    }
}
