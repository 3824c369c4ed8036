//! HTTP client for the key-management network
//!
//! SECURITY NOTE:
//! - Raw symmetric keys are only ever sent to the configured key network
//! - Request and response bodies are never logged

use super::{AuthSig, KeyService, WrappedKey};
use crate::crypto::SymmetricKey;
use crate::policy::AccessPolicy;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeResponse {
    pub server_public_key: String,
    pub subnet_public_key: String,
    pub network_public_key: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoreRequest<'a> {
    access_control_conditions: &'a AccessPolicy,
    symmetric_key: String,
    auth_sig: &'a AuthSig,
    chain: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreResponse {
    encrypted_symmetric_key: WrappedKey,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RetrieveRequest<'a> {
    access_control_conditions: &'a AccessPolicy,
    to_decrypt: String,
    auth_sig: &'a AuthSig,
    chain: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RetrieveResponse {
    symmetric_key: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(alias = "errorCode")]
    message: Option<String>,
}

/// Key network client speaking JSON over HTTP
pub struct KeyNetworkClient {
    client: Client,
    base_url: String,
    handshake: RwLock<Option<HandshakeResponse>>,
}

impl KeyNetworkClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            handshake: RwLock::new(None),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/web/{}", self.base_url, path)
    }

    async fn ensure_connected(&self) -> Result<()> {
        if self.handshake.read().await.is_some() {
            return Ok(());
        }
        Err(Error::KeyService("Not connected to the key network".to_string()))
    }

    async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self.client.post(self.endpoint(path)).json(body).send().await?;
        Self::read(response).await
    }

    async fn read<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or(text);
            return Err(Error::KeyService(format!("HTTP {}: {}", status, message)));
        }
        response
            .json()
            .await
            .map_err(|e| Error::KeyService(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl KeyService for KeyNetworkClient {
    async fn connect(&self) -> Result<()> {
        let handshake: HandshakeResponse = self
            .post("handshake", &serde_json::json!({ "clientPublicKey": "test" }))
            .await?;
        tracing::info!(
            base_url = %self.base_url,
            network_public_key = %handshake.network_public_key,
            "Connected to key network"
        );
        *self.handshake.write().await = Some(handshake);
        Ok(())
    }

    async fn wrap_key(
        &self,
        policy: &AccessPolicy,
        key: &SymmetricKey,
        auth: &AuthSig,
        chain: &str,
    ) -> Result<WrappedKey> {
        self.ensure_connected().await?;
        let request = StoreRequest {
            access_control_conditions: policy,
            symmetric_key: key.to_hex(),
            auth_sig: auth,
            chain,
        };
        let response: StoreResponse = self.post("encryption/store", &request).await?;
        Ok(response.encrypted_symmetric_key)
    }

    async fn unwrap_key(
        &self,
        policy: &AccessPolicy,
        wrapped: &WrappedKey,
        auth: &AuthSig,
        chain: &str,
    ) -> Result<SymmetricKey> {
        self.ensure_connected().await?;
        let request = RetrieveRequest {
            access_control_conditions: policy,
            to_decrypt: wrapped.to_hex(),
            auth_sig: auth,
            chain,
        };
        let response: RetrieveResponse = self.post("encryption/retrieve", &request).await?;
        SymmetricKey::from_hex(&response.symmetric_key)
    }

    fn name(&self) -> &'static str {
        "KeyNetwork"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    fn auth() -> AuthSig {
        AuthSig {
            sig: "0x00".to_string(),
            derived_via: super::super::auth::DERIVED_VIA.to_string(),
            signed_message: "hi".to_string(),
            address: "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".to_string(),
        }
    }

    #[test]
    fn store_request_layout() {
        let policy = AccessPolicy::for_reader(
            "rinkeby",
            address!("70997970c51812dc3a010c7d01b50e0d17dc79c8"),
        );
        let auth = auth();
        let request = StoreRequest {
            access_control_conditions: &policy,
            symmetric_key: "ab".to_string(),
            auth_sig: &auth,
            chain: "rinkeby",
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value["accessControlConditions"].is_array());
        assert_eq!(value["symmetricKey"], "ab");
        assert_eq!(value["authSig"]["derivedVia"], "web3.eth.personal.sign");
        assert_eq!(value["chain"], "rinkeby");
    }

    #[tokio::test]
    async fn wrap_requires_handshake() {
        let client = KeyNetworkClient::new("http://127.0.0.1:9");
        let policy = AccessPolicy::for_reader(
            "rinkeby",
            address!("70997970c51812dc3a010c7d01b50e0d17dc79c8"),
        );
        let result = client
            .wrap_key(&policy, &SymmetricKey::generate(), &auth(), "rinkeby")
            .await;
        assert!(matches!(result, Err(Error::KeyService(_))));
    }
}
