//! Access policies understood by the key network
//!
//! A policy is a list of conditions in the key network's JSON layout. Secrets
//! only ever use a single condition: "the caller's address equals the
//! receiver". The key network evaluates it; this crate only builds it and
//! carries it through metadata unchanged.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

/// Placeholder the key network substitutes with the authenticated address
pub const USER_ADDRESS_PARAM: &str = ":userAddress";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnValueTest {
    pub comparator: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessControlCondition {
    pub contract_address: String,
    pub standard_contract_type: String,
    pub chain: String,
    pub method: String,
    pub parameters: Vec<String>,
    pub return_value_test: ReturnValueTest,
}

/// The decryption rule attached to one secret
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessPolicy(Vec<AccessControlCondition>);

impl AccessPolicy {
    /// Only `reader` may recover the key on `chain`
    pub fn for_reader(chain: &str, reader: Address) -> Self {
        Self(vec![AccessControlCondition {
            contract_address: String::new(),
            standard_contract_type: String::new(),
            chain: chain.to_string(),
            method: String::new(),
            parameters: vec![USER_ADDRESS_PARAM.to_string()],
            return_value_test: ReturnValueTest {
                comparator: "=".to_string(),
                value: reader.to_checksum(None),
            },
        }])
    }

    pub fn conditions(&self) -> &[AccessControlCondition] {
        &self.0
    }

    /// Chain of the first condition
    pub fn chain(&self) -> Option<&str> {
        self.0.first().map(|c| c.chain.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn reader_policy_matches_key_network_layout() {
        let reader = address!("70997970c51812dc3a010c7d01b50e0d17dc79c8");
        let policy = AccessPolicy::for_reader("rinkeby", reader);
        let value = serde_json::to_value(&policy).unwrap();

        assert_eq!(
            value,
            serde_json::json!([{
                "contractAddress": "",
                "standardContractType": "",
                "chain": "rinkeby",
                "method": "",
                "parameters": [":userAddress"],
                "returnValueTest": {
                    "comparator": "=",
                    "value": "0x70997970C51812dc3A010C7d01b50e0d17dc79C8"
                }
            }])
        );
        assert_eq!(policy.chain(), Some("rinkeby"));
    }

    #[test]
    fn policy_survives_metadata_round_trip() {
        let reader = address!("70997970c51812dc3a010c7d01b50e0d17dc79c8");
        let policy = AccessPolicy::for_reader("ethereum", reader);
        let json = serde_json::to_string(&policy).unwrap();
        let parsed: AccessPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, policy);
        assert_eq!(parsed.conditions().len(), 1);
    }
}
