//! Configuration for Secret Someone

pub mod rpc;

use crate::{Error, Result};
use alloy::primitives::Address;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

// Re-export RPC config
pub use rpc::RpcConfig;

/// Environment variable names
pub mod env_vars {
    pub const NETWORK: &str = "SECRET_SOMEONE_NETWORK";
    pub const CONTRACT: &str = "SECRET_SOMEONE_CONTRACT";
    pub const PRIVATE_KEY: &str = "PRIVATE_KEY";
    pub const PINATA_API_KEY: &str = "PINATA_API_KEY";
    pub const PINATA_API_SECRET: &str = "PINATA_API_SECRET";
    pub const GATEWAY_URL: &str = "IPFS_GATEWAY_URL";
    pub const KEY_SERVICE_URL: &str = "KEY_SERVICE_URL";
}

pub const DEFAULT_PINATA_API_URL: &str = "https://api.pinata.cloud";
pub const DEFAULT_GATEWAY_URL: &str = "https://ipfs.io/ipfs";
pub const DEFAULT_KEY_SERVICE_URL: &str = "https://serrano.litgateway.com";

/// Networks the contract is deployed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Rinkeby,
    Goerli,
    Sepolia,
}

impl Network {
    pub const ALL: [Network; 4] = [
        Network::Mainnet,
        Network::Rinkeby,
        Network::Goerli,
        Network::Sepolia,
    ];

    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Mainnet => 1,
            Network::Rinkeby => 4,
            Network::Goerli => 5,
            Network::Sepolia => 11_155_111,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Rinkeby => "rinkeby",
            Network::Goerli => "goerli",
            Network::Sepolia => "sepolia",
        }
    }

    /// Chain name understood by the key network in access policies
    pub fn key_chain(&self) -> &'static str {
        match self {
            Network::Mainnet => "ethereum",
            Network::Rinkeby => "rinkeby",
            Network::Goerli => "goerli",
            Network::Sepolia => "sepolia",
        }
    }

    pub fn from_chain_id(chain_id: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|n| n.chain_id() == chain_id)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Network {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mainnet" | "ethereum" => Ok(Network::Mainnet),
            "rinkeby" => Ok(Network::Rinkeby),
            "goerli" => Ok(Network::Goerli),
            "sepolia" => Ok(Network::Sepolia),
            other => Err(Error::Config(format!("Unknown network: {}", other))),
        }
    }
}

/// Pinning service credential pair, sent as request headers
#[derive(Debug, Clone)]
pub struct PinataCredentials {
    pub api_key: String,
    pub secret_api_key: SecretString,
}

impl PinataCredentials {
    pub fn new(api_key: impl Into<String>, secret_api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            secret_api_key: SecretString::from(secret_api_key.into()),
        }
    }

    pub fn from_env() -> Option<Self> {
        let key = std::env::var(env_vars::PINATA_API_KEY).ok()?;
        let secret = std::env::var(env_vars::PINATA_API_SECRET).ok()?;
        Some(Self::new(key, secret))
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Network the wallet must be connected to
    pub network: Network,
    /// Deployed contract address per network
    #[serde(default)]
    pub contracts: HashMap<Network, Address>,
    /// Pinning service API base
    pub pinata_api_url: String,
    /// Public gateway used to read pinned content
    pub gateway_url: String,
    /// Key-management network endpoint
    pub key_service_url: String,
    /// Path to audit log file
    pub audit_log_path: Option<String>,
    /// Never serialized; filled from the environment
    #[serde(skip)]
    pub pinata: Option<PinataCredentials>,
}

impl Config {
    /// Overlay environment-provided settings on top of this config
    pub fn apply_env(mut self) -> Result<Self> {
        if let Ok(network) = std::env::var(env_vars::NETWORK) {
            self.network = network.parse()?;
        }
        if let Ok(contract) = std::env::var(env_vars::CONTRACT) {
            let address = Address::from_str(contract.trim()).map_err(|e| {
                Error::Config(format!("{} is not an address: {}", env_vars::CONTRACT, e))
            })?;
            self.contracts.insert(self.network, address);
        }
        if let Ok(url) = std::env::var(env_vars::GATEWAY_URL) {
            self.gateway_url = url;
        }
        if let Ok(url) = std::env::var(env_vars::KEY_SERVICE_URL) {
            self.key_service_url = url;
        }
        if let Some(credentials) = PinataCredentials::from_env() {
            self.pinata = Some(credentials);
        }
        Ok(self)
    }

    /// Contract address for the target network
    pub fn contract_address(&self) -> Result<Address> {
        self.contracts.get(&self.network).copied().ok_or_else(|| {
            Error::Config(format!(
                "No contract address configured for {} (set {})",
                self.network,
                env_vars::CONTRACT
            ))
        })
    }

    pub fn pinata_credentials(&self) -> Result<&PinataCredentials> {
        self.pinata.as_ref().ok_or_else(|| {
            Error::Config(format!(
                "Pinning credentials missing (set {} and {})",
                env_vars::PINATA_API_KEY,
                env_vars::PINATA_API_SECRET
            ))
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: Network::Rinkeby,
            contracts: HashMap::new(),
            pinata_api_url: DEFAULT_PINATA_API_URL.to_string(),
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            key_service_url: DEFAULT_KEY_SERVICE_URL.to_string(),
            audit_log_path: Some("audit.jsonl".to_string()),
            pinata: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn network_round_trips_chain_ids() {
        for network in Network::ALL {
            assert_eq!(Network::from_chain_id(network.chain_id()), Some(network));
        }
        assert_eq!(Network::from_chain_id(137), None);
    }

    #[test]
    fn mainnet_uses_ethereum_key_chain() {
        assert_eq!(Network::Mainnet.key_chain(), "ethereum");
        assert_eq!("ethereum".parse::<Network>().unwrap(), Network::Mainnet);
        assert!("polygon".parse::<Network>().is_err());
    }

    #[test]
    fn config_deserialize_with_contracts() {
        let value = serde_json::json!({
            "network": "sepolia",
            "contracts": { "sepolia": "0x5fbdb2315678afecb367f032d93f642f64180aa3" },
            "pinata_api_url": "https://api.pinata.cloud",
            "gateway_url": "https://ipfs.io/ipfs",
            "key_service_url": "https://keys.example",
            "audit_log_path": null
        });
        let parsed: Config = serde_json::from_value(value).expect("parse config");
        assert_eq!(parsed.network, Network::Sepolia);
        assert_eq!(
            parsed.contract_address().unwrap(),
            address!("5fbdb2315678afecb367f032d93f642f64180aa3")
        );
        assert!(parsed.pinata.is_none());
    }

    #[test]
    fn missing_contract_is_config_error() {
        let config = Config::default();
        assert!(matches!(config.contract_address(), Err(Error::Config(_))));
        assert!(matches!(config.pinata_credentials(), Err(Error::Config(_))));
    }

    #[test]
    fn serialized_config_omits_credentials() {
        let mut config = Config::default();
        config.pinata = Some(PinataCredentials::new("key", "very-secret"));
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("very-secret"));
        assert!(!format!("{:?}", config).contains("very-secret"));
    }
}
