//! Read-only IPFS gateway client

use super::{ContentGateway, ContentPointer};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value;

/// Fetches pinned content by pointer through a public HTTP gateway
#[derive(Clone)]
pub struct IpfsGateway {
    client: Client,
    base_url: String,
}

impl IpfsGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn get(&self, pointer: &ContentPointer) -> Result<Response> {
        let url = self.url_for(pointer);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Gateway(format!("GET {} returned HTTP {}", url, status)));
        }
        Ok(response)
    }
}

#[async_trait]
impl ContentGateway for IpfsGateway {
    async fn fetch_json(&self, pointer: &ContentPointer) -> Result<Value> {
        let response = self.get(pointer).await?;
        response
            .json()
            .await
            .map_err(|e| Error::Gateway(format!("{} is not JSON: {}", pointer, e)))
    }

    async fn fetch_bytes(&self, pointer: &ContentPointer) -> Result<Vec<u8>> {
        let response = self.get(pointer).await?;
        Ok(response.bytes().await?.to_vec())
    }

    fn url_for(&self, pointer: &ContentPointer) -> String {
        format!("{}/{}", self.base_url, pointer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_for_strips_scheme_and_slash() {
        let gateway = IpfsGateway::new("https://ipfs.io/ipfs/");
        let pointer =
            ContentPointer::from_uri("ipfs://QmUoHwYKUVdUuXTKUSMQGW1g4Sovbuztm9rQ33y4pdJ5Xm");
        assert_eq!(
            gateway.url_for(&pointer),
            "https://ipfs.io/ipfs/QmUoHwYKUVdUuXTKUSMQGW1g4Sovbuztm9rQ33y4pdJ5Xm"
        );
    }
}
