//! RPC endpoint configuration
//!
//! Resolution order per network:
//! 1. Per-network env vars (ETH_RPC_URL, RINKEBY_RPC_URL, GOERLI_RPC_URL, SEPOLIA_RPC_URL)
//! 2. Provider API keys (ALCHEMY_API_KEY, INFURA_API_KEY) - builds URLs automatically
//! 3. Public RPC fallbacks - for testing only
//!
//! ```bash
//! export SEPOLIA_RPC_URL="https://eth-sepolia.g.alchemy.com/v2/YOUR_KEY"
//! # or
//! export ALCHEMY_API_KEY="YOUR_KEY"
//! ```

use super::Network;
use std::collections::HashMap;

/// RPC configuration for every supported network
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// RPC URLs indexed by chain ID
    urls: HashMap<u64, String>,
}

/// Environment variable names
mod env_vars {
    pub const ETH_RPC_URL: &str = "ETH_RPC_URL";
    pub const RINKEBY_RPC_URL: &str = "RINKEBY_RPC_URL";
    pub const GOERLI_RPC_URL: &str = "GOERLI_RPC_URL";
    pub const SEPOLIA_RPC_URL: &str = "SEPOLIA_RPC_URL";

    pub const ALCHEMY_API_KEY: &str = "ALCHEMY_API_KEY";
    pub const INFURA_API_KEY: &str = "INFURA_API_KEY";
}

/// Public RPC endpoints (rate limited, for testing only)
mod public_rpcs {
    pub const MAINNET: &str = "https://eth.llamarpc.com";
    pub const GOERLI: &str = "https://rpc.ankr.com/eth_goerli";
    pub const SEPOLIA: &str = "https://rpc.sepolia.org";
}

fn url_var(network: Network) -> &'static str {
    match network {
        Network::Mainnet => env_vars::ETH_RPC_URL,
        Network::Rinkeby => env_vars::RINKEBY_RPC_URL,
        Network::Goerli => env_vars::GOERLI_RPC_URL,
        Network::Sepolia => env_vars::SEPOLIA_RPC_URL,
    }
}

fn alchemy_url(network: Network, key: &str) -> Option<String> {
    let host = match network {
        Network::Mainnet => "eth-mainnet",
        Network::Goerli => "eth-goerli",
        Network::Sepolia => "eth-sepolia",
        // Alchemy retired Rinkeby
        Network::Rinkeby => return None,
    };
    Some(format!("https://{}.g.alchemy.com/v2/{}", host, key))
}

fn infura_url(network: Network, key: &str) -> String {
    format!("https://{}.infura.io/v3/{}", network.name(), key)
}

fn public_url(network: Network) -> Option<&'static str> {
    match network {
        Network::Mainnet => Some(public_rpcs::MAINNET),
        Network::Goerli => Some(public_rpcs::GOERLI),
        Network::Sepolia => Some(public_rpcs::SEPOLIA),
        Network::Rinkeby => None,
    }
}

impl RpcConfig {
    /// Create RPC config from environment variables
    pub fn from_env() -> Self {
        let alchemy = std::env::var(env_vars::ALCHEMY_API_KEY).ok();
        let infura = std::env::var(env_vars::INFURA_API_KEY).ok();
        let mut urls = HashMap::new();

        for network in Network::ALL {
            let chain_id = network.chain_id();

            if let Ok(url) = std::env::var(url_var(network)) {
                tracing::debug!(network = %network, "Using {} for RPC", url_var(network));
                urls.insert(chain_id, url);
                continue;
            }

            if let Some(url) = alchemy.as_deref().and_then(|key| alchemy_url(network, key)) {
                tracing::debug!(network = %network, "Building RPC URL from ALCHEMY_API_KEY");
                urls.insert(chain_id, url);
                continue;
            }

            if let Some(key) = infura.as_deref() {
                tracing::debug!(network = %network, "Building RPC URL from INFURA_API_KEY");
                urls.insert(chain_id, infura_url(network, key));
                continue;
            }

            if let Some(url) = public_url(network) {
                urls.insert(chain_id, url.to_string());
            }
        }

        Self { urls }
    }

    /// Create with explicit RPC URLs
    pub fn with_urls(urls: HashMap<u64, String>) -> Self {
        Self { urls }
    }

    /// Get RPC URL for a chain
    pub fn get(&self, chain_id: u64) -> Option<&str> {
        self.urls.get(&chain_id).map(|s| s.as_str())
    }

    /// Get RPC URL for a network, warning when a public fallback is used
    pub fn for_network(&self, network: Network) -> Option<&str> {
        let url = self.get(network.chain_id())?;
        if public_url(network) == Some(url) {
            tracing::warn!(
                network = %network,
                "No RPC configured, using public RPC (rate limited)"
            );
        }
        Some(url)
    }

    /// Check if a chain is configured
    pub fn has_chain(&self, chain_id: u64) -> bool {
        self.urls.contains_key(&chain_id)
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_returns_url() {
        let mut urls = HashMap::new();
        urls.insert(11_155_111, "https://custom.rpc".to_string());
        let config = RpcConfig::with_urls(urls);

        assert_eq!(config.get(11_155_111), Some("https://custom.rpc"));
        assert_eq!(config.for_network(Network::Sepolia), Some("https://custom.rpc"));
        assert_eq!(config.get(1), None);
    }

    #[test]
    fn test_builder_urls() {
        assert_eq!(
            alchemy_url(Network::Sepolia, "k").as_deref(),
            Some("https://eth-sepolia.g.alchemy.com/v2/k")
        );
        assert_eq!(alchemy_url(Network::Rinkeby, "k"), None);
        assert_eq!(
            infura_url(Network::Goerli, "k"),
            "https://goerli.infura.io/v3/k"
        );
    }

    #[test]
    fn test_public_rpc_fallbacks() {
        for network in Network::ALL {
            std::env::remove_var(url_var(network));
        }
        std::env::remove_var(env_vars::ALCHEMY_API_KEY);
        std::env::remove_var(env_vars::INFURA_API_KEY);

        let config = RpcConfig::from_env();

        assert_eq!(config.get(1), Some(public_rpcs::MAINNET));
        assert_eq!(config.get(11_155_111), Some(public_rpcs::SEPOLIA));
        assert!(!config.has_chain(4));
    }
}
