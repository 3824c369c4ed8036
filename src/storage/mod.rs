//! Off-chain content storage
//!
//! Writes go to a pinning service, reads come back through a public gateway.
//! Both sides are traits so the sealing and viewing flows do not care which
//! pinning provider or gateway is in use.

mod gateway;
mod pinata;

pub use gateway::IpfsGateway;
pub use pinata::PinataClient;

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

const IPFS_SCHEME: &str = "ipfs://";

/// Identifier returned by the pinning service for uploaded content
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentPointer(String);

impl ContentPointer {
    pub fn new(cid: impl Into<String>) -> Self {
        Self(cid.into())
    }

    /// Accepts either a bare CID or an `ipfs://` URI (as returned by `tokenURI`)
    pub fn from_uri(uri: &str) -> Self {
        let trimmed = uri.trim();
        Self(trimmed.strip_prefix(IPFS_SCHEME).unwrap_or(trimmed).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_uri(&self) -> String {
        format!("{}{}", IPFS_SCHEME, self.0)
    }
}

impl fmt::Display for ContentPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Upload side of content storage
#[async_trait]
pub trait PinningService: Send + Sync {
    /// Pin a JSON document under a display name
    async fn pin_json(&self, body: &Value, name: &str) -> Result<ContentPointer>;

    /// Pin a binary blob as a file
    async fn pin_file(&self, bytes: Vec<u8>, file_name: &str, name: &str)
        -> Result<ContentPointer>;

    /// Service name for logging
    fn name(&self) -> &'static str;
}

/// Read side of content storage
#[async_trait]
pub trait ContentGateway: Send + Sync {
    async fn fetch_json(&self, pointer: &ContentPointer) -> Result<Value>;

    async fn fetch_bytes(&self, pointer: &ContentPointer) -> Result<Vec<u8>>;

    /// Public URL for a pointer or `ipfs://` URI
    fn url_for(&self, pointer: &ContentPointer) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_from_token_uri() {
        let pointer =
            ContentPointer::from_uri("ipfs://QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG");
        assert_eq!(
            pointer.as_str(),
            "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG"
        );
        assert_eq!(
            pointer.to_uri(),
            "ipfs://QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG"
        );
    }

    #[test]
    fn bare_cid_is_kept() {
        let pointer = ContentPointer::from_uri(" QmHash ");
        assert_eq!(pointer, ContentPointer::new("QmHash"));
        assert_eq!(pointer.to_string(), "QmHash");
    }
}
