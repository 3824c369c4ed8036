//! Audit log
//!
//! Appends one JSON line per seal/reveal attempt. Plaintext, keys and
//! signatures are never written; only pointers, hashes and error text.

use crate::sealer::{SealReceipt, SealRequest};
use crate::viewer::ReceivedSecret;
use crate::wallet::{Connection, WalletSession};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Connect,
    Seal,
    Reveal,
}

/// Entry in the audit log
#[derive(Debug, Serialize)]
struct AuditEntry<'a> {
    timestamp: DateTime<Utc>,
    operation: Operation,
    account: Option<String>,
    counterparty: Option<String>,
    pointer: Option<&'a str>,
    tx_hash: Option<String>,
    error: Option<String>,
    duration_ms: u64,
    status: &'static str,
}

/// Details recorded for a finished operation
#[derive(Debug, Default)]
pub struct AuditRecord {
    pub account: Option<String>,
    pub counterparty: Option<String>,
    pub pointer: Option<String>,
    pub tx_hash: Option<String>,
}

/// Writer for audit log entries (JSONL format)
pub struct AuditLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Record the outcome of an operation started at `started`.
    ///
    /// Write failures are logged and swallowed; auditing never fails an operation.
    pub async fn record<T, E: std::fmt::Display>(
        &self,
        operation: Operation,
        started: Instant,
        record: AuditRecord,
        outcome: &Result<T, E>,
    ) {
        let (error, status) = match outcome {
            Ok(_) => (None, "success"),
            Err(e) => (Some(e.to_string()), "error"),
        };

        let entry = AuditEntry {
            timestamp: Utc::now(),
            operation,
            account: record.account,
            counterparty: record.counterparty,
            pointer: record.pointer.as_deref(),
            tx_hash: record.tx_hash,
            error,
            duration_ms: started.elapsed().as_millis() as u64,
            status,
        };

        let _guard = self.lock.lock().await;
        if let Err(e) = self.write(&entry) {
            tracing::warn!(
                error = %e,
                path = %self.path.display(),
                "Failed to write audit log entry"
            );
        }
    }

    pub async fn record_connect(
        &self,
        started: Instant,
        outcome: &crate::Result<Option<Connection>>,
    ) {
        let account = match outcome {
            Ok(Some(connection)) => Some(connection.session.address.to_checksum(None)),
            _ => None,
        };
        let record = AuditRecord {
            account,
            ..Default::default()
        };
        self.record(Operation::Connect, started, record, outcome).await;
    }

    /// A failed seal records the receiver as typed
    pub async fn record_seal(
        &self,
        started: Instant,
        session: &WalletSession,
        request: &SealRequest,
        outcome: &crate::Result<SealReceipt>,
    ) {
        let account = Some(session.address.to_checksum(None));
        let record = match outcome {
            Ok(receipt) => AuditRecord {
                account,
                counterparty: receipt.metadata.receiver().map(|a| a.to_checksum(None)),
                pointer: Some(receipt.metadata_pointer.to_string()),
                tx_hash: Some(receipt.tx_hash.to_string()),
            },
            Err(_) => AuditRecord {
                account,
                counterparty: Some(request.receiver.trim().to_string()),
                ..Default::default()
            },
        };
        self.record(Operation::Seal, started, record, outcome).await;
    }

    pub async fn record_reveal(
        &self,
        started: Instant,
        session: &WalletSession,
        secret: &ReceivedSecret,
        outcome: &crate::Result<String>,
    ) {
        let record = AuditRecord {
            account: Some(session.address.to_checksum(None)),
            counterparty: Some(secret.sender.to_checksum(None)),
            pointer: Some(secret.metadata.secret.encrypted_string_hash.to_string()),
            tx_hash: None,
        };
        self.record(Operation::Reveal, started, record, outcome).await;
    }

    fn write(&self, entry: &AuditEntry<'_>) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let json = serde_json::to_string(entry)?;
        writeln!(file, "{}", json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_logs_success_and_failure() {
        let temp_file = NamedTempFile::new().unwrap();
        let log = AuditLog::new(temp_file.path());

        let ok: Result<(), String> = Ok(());
        log.record(
            Operation::Seal,
            Instant::now(),
            AuditRecord {
                account: Some("0xsender".to_string()),
                counterparty: Some("0xreceiver".to_string()),
                pointer: Some("QmMeta".to_string()),
                tx_hash: Some("0xabc".to_string()),
            },
            &ok,
        )
        .await;

        let failed: Result<(), String> = Err("key service refused".to_string());
        log.record(Operation::Reveal, Instant::now(), AuditRecord::default(), &failed)
            .await;

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["operation"], "seal");
        assert_eq!(lines[0]["status"], "success");
        assert_eq!(lines[0]["pointer"], "QmMeta");
        assert_eq!(lines[1]["operation"], "reveal");
        assert_eq!(lines[1]["error"], "key service refused");
    }

    #[tokio::test]
    async fn test_failed_seal_records_sender_and_typed_receiver() {
        use crate::config::Network;
        use crate::keys::AuthSig;
        use crate::wallet::SecureWallet;
        use crate::Error;
        use std::sync::Arc;

        let signer = SecureWallet::from_hex(
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        )
        .unwrap();
        let session = WalletSession {
            address: signer.address(),
            network: Network::Rinkeby,
            rpc_url: "http://localhost:8545".parse().unwrap(),
            auth: AuthSig::sign(&signer, Network::Rinkeby).unwrap(),
            signer: Arc::new(signer),
        };
        let request = SealRequest {
            receiver: " 0xdEAf69 ".to_string(),
            title: None,
            message: "never logged".to_string(),
        };

        let temp_file = NamedTempFile::new().unwrap();
        let log = AuditLog::new(temp_file.path());
        let outcome: crate::Result<SealReceipt> =
            Err(Error::InvalidArgument("bad receiver".to_string()));
        log.record_seal(Instant::now(), &session, &request, &outcome)
            .await;

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(!content.contains("never logged"));
        let entry: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(entry["operation"], "seal");
        assert_eq!(entry["status"], "error");
        assert_eq!(
            entry["account"],
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        );
        assert_eq!(entry["counterparty"], "0xdEAf69");
        assert!(entry["tx_hash"].is_null());
    }

    #[tokio::test]
    async fn test_unwritable_path_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path());
        let ok: Result<(), String> = Ok(());
        log.record(Operation::Connect, Instant::now(), AuditRecord::default(), &ok)
            .await;
    }
}
