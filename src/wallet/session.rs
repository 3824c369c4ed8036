use super::SecureWallet;
use crate::config::Network;
use crate::keys::AuthSig;
use alloy::primitives::Address;
use std::sync::Arc;
use url::Url;

/// A connected wallet. Replaced wholesale whenever the account or network changes.
#[derive(Debug, Clone)]
pub struct WalletSession {
    pub address: Address,
    pub network: Network,
    pub rpc_url: Url,
    pub signer: Arc<SecureWallet>,
    /// Sign-in signature presented to the key network
    pub auth: AuthSig,
}

impl WalletSession {
    /// `0xf39Fd6...b92266` style label for the navbar
    pub fn short_address(&self) -> String {
        abbreviate(&self.address.to_checksum(None))
    }
}

pub(crate) fn abbreviate(address: &str) -> String {
    if address.len() <= 14 {
        return address.to_string();
    }
    format!("{}...{}", &address[..8], &address[address.len() - 6..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abbreviate_keeps_prefix_and_suffix() {
        assert_eq!(
            abbreviate("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"),
            "0xf39Fd6...b92266"
        );
        assert_eq!(abbreviate("0x1234"), "0x1234");
    }
}
