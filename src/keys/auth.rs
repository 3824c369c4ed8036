//! Wallet sign-in for the key network
//!
//! The key network identifies the caller by an EIP-191 personal signature
//! over a sign-in message. The signature is produced once per wallet session
//! and sent along with every wrap/unwrap request.

use crate::config::Network;
use crate::wallet::SecureWallet;
use crate::{Error, Result};
use alloy::primitives::{hex, Address, Signature};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const DERIVED_VIA: &str = "web3.eth.personal.sign";
const SIGN_IN_DOMAIN: &str = "secretsomeone.xyz";
const SIGN_IN_URI: &str = "https://secretsomeone.xyz/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSig {
    pub sig: String,
    pub derived_via: String,
    pub signed_message: String,
    pub address: String,
}

impl AuthSig {
    /// Sign a fresh sign-in message with the session wallet
    pub fn sign(wallet: &SecureWallet, network: Network) -> Result<Self> {
        let nonce = hex::encode(rand::random::<[u8; 16]>());
        let message = sign_in_message(wallet.address(), network.chain_id(), &nonce);
        let signature = wallet.sign_message(message.as_bytes())?;

        Ok(Self {
            sig: hex::encode_prefixed(signature.as_bytes()),
            derived_via: DERIVED_VIA.to_string(),
            signed_message: message,
            address: wallet.address_string(),
        })
    }

    /// Recover the address that produced `sig` and check it matches `address`
    pub fn verify(&self) -> Result<Address> {
        let signature = Signature::from_str(&self.sig)
            .map_err(|e| Error::KeyService(format!("Malformed auth signature: {}", e)))?;
        let recovered = signature
            .recover_address_from_msg(self.signed_message.as_bytes())
            .map_err(|e| Error::KeyService(format!("Unrecoverable auth signature: {}", e)))?;
        let claimed = Address::from_str(&self.address)
            .map_err(|e| Error::KeyService(format!("Malformed auth address: {}", e)))?;
        if recovered != claimed {
            return Err(Error::KeyService(
                "Auth signature does not match its address".to_string(),
            ));
        }
        Ok(recovered)
    }
}

fn sign_in_message(address: Address, chain_id: u64, nonce: &str) -> String {
    format!(
        "{domain} wants you to sign in with your Ethereum account:\n\
         {address}\n\n\
         Unlock secrets sealed for this address.\n\n\
         URI: {uri}\n\
         Version: 1\n\
         Chain ID: {chain_id}\n\
         Nonce: {nonce}\n\
         Issued At: {issued_at}",
        domain = SIGN_IN_DOMAIN,
        address = address.to_checksum(None),
        uri = SIGN_IN_URI,
        chain_id = chain_id,
        nonce = nonce,
        issued_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn signed_auth_verifies_to_wallet_address() {
        let wallet = SecureWallet::from_hex(TEST_KEY).unwrap();
        let auth = AuthSig::sign(&wallet, Network::Sepolia).unwrap();

        assert_eq!(auth.derived_via, DERIVED_VIA);
        assert!(auth.signed_message.contains("Chain ID: 11155111"));
        assert_eq!(auth.verify().unwrap(), wallet.address());
    }

    #[test]
    fn forged_address_fails_verification() {
        let wallet = SecureWallet::from_hex(TEST_KEY).unwrap();
        let mut auth = AuthSig::sign(&wallet, Network::Mainnet).unwrap();
        auth.address = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8".to_string();
        assert!(matches!(auth.verify(), Err(Error::KeyService(_))));
    }

    #[test]
    fn auth_sig_uses_camel_case_fields() {
        let wallet = SecureWallet::from_hex(TEST_KEY).unwrap();
        let auth = AuthSig::sign(&wallet, Network::Mainnet).unwrap();
        let value = serde_json::to_value(&auth).unwrap();
        assert!(value.get("derivedVia").is_some());
        assert!(value.get("signedMessage").is_some());
    }
}
