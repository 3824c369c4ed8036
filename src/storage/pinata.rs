//! Pinata pinning client
//!
//! SECURITY NOTE:
//! - The API secret is held in a `SecretString` and only exposed when the
//!   request headers are built
//! - Request bodies (ciphertext and metadata) are never logged

use super::{ContentPointer, PinningService};
use crate::config::PinataCredentials;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::{json, Value};

const API_KEY_HEADER: &str = "pinata_api_key";
const SECRET_KEY_HEADER: &str = "pinata_secret_api_key";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PinResponse {
    ipfs_hash: String,
}

/// Pinning service client for the Pinata API
pub struct PinataClient {
    client: Client,
    api_url: String,
    credentials: PinataCredentials,
}

impl PinataClient {
    pub fn new(api_url: impl Into<String>, credentials: PinataCredentials) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            credentials,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/pinning/{}", self.api_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(API_KEY_HEADER, &self.credentials.api_key)
            .header(SECRET_KEY_HEADER, self.credentials.secret_api_key.expose_secret())
    }

    async fn read_pointer(response: Response) -> Result<ContentPointer> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Pinning(format!("HTTP {}: {}", status, body)));
        }
        let parsed: PinResponse = response
            .json()
            .await
            .map_err(|e| Error::Pinning(format!("Failed to parse response: {}", e)))?;
        Ok(ContentPointer::new(parsed.ipfs_hash))
    }
}

#[async_trait]
impl PinningService for PinataClient {
    async fn pin_json(&self, body: &Value, name: &str) -> Result<ContentPointer> {
        let payload = json!({
            "pinataContent": body,
            "pinataMetadata": { "name": name },
        });

        let response = self
            .authorized(self.client.post(self.endpoint("pinJSONToIPFS")))
            .json(&payload)
            .send()
            .await?;

        let pointer = Self::read_pointer(response).await?;
        tracing::debug!(name = name, pointer = %pointer, "Pinned JSON");
        Ok(pointer)
    }

    async fn pin_file(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        name: &str,
    ) -> Result<ContentPointer> {
        let size = bytes.len();
        let file = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("application/octet-stream")?;
        let form = Form::new()
            .part("file", file)
            .text("pinataMetadata", json!({ "name": name }).to_string());

        let response = self
            .authorized(self.client.post(self.endpoint("pinFileToIPFS")))
            .multipart(form)
            .send()
            .await?;

        let pointer = Self::read_pointer(response).await?;
        tracing::debug!(name = name, size = size, pointer = %pointer, "Pinned file");
        Ok(pointer)
    }

    fn name(&self) -> &'static str {
        "Pinata"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_double_slash() {
        let client = PinataClient::new(
            "https://api.pinata.cloud/",
            PinataCredentials::new("key", "secret"),
        );
        assert_eq!(
            client.endpoint("pinJSONToIPFS"),
            "https://api.pinata.cloud/pinning/pinJSONToIPFS"
        );
    }

    #[test]
    fn pin_response_reads_ipfs_hash() {
        let parsed: PinResponse = serde_json::from_value(json!({
            "IpfsHash": "QmHash",
            "PinSize": 42,
            "Timestamp": "2022-01-01T00:00:00.000Z"
        }))
        .unwrap();
        assert_eq!(parsed.ipfs_hash, "QmHash");
    }
}
