//! Secret Someone CLI
//!
//! Command-line interface for sealing and revealing secrets.

use alloy::primitives::U256;
use clap::{Parser, Subcommand};
use secret_someone::audit::AuditLog;
use secret_someone::config::env_vars;
use secret_someone::contract::{OnChainRegistry, SecretRegistry};
use secret_someone::keys::{KeyNetworkClient, KeyService};
use secret_someone::sealer::parse_address;
use secret_someone::shell::Shell;
use secret_someone::storage::{ContentGateway, IpfsGateway, PinataClient};
use secret_someone::wallet::{LocalWallet, SecureWallet, WalletProvider};
use secret_someone::{
    Config, Connection, Error, Result, RpcConfig, SealRequest, SecretSealer, SecretViewer,
    WalletConnector,
};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "secret-someone")]
#[command(about = "Seal encrypted secrets for a wallet address and reveal yours")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect the wallet and list received secrets
    Connect,

    /// Seal a secret for a receiver
    Seal {
        /// Receiver wallet address
        #[arg(long)]
        to: String,

        /// Secret message
        #[arg(short, long)]
        message: String,

        /// Secret title (defaults to "Secret for <receiver>")
        #[arg(short, long)]
        title: Option<String>,
    },

    /// List secrets sealed for the connected account
    Inbox,

    /// Reveal a received secret
    Reveal {
        /// Receiver token id of the secret
        token_id: String,
    },

    /// Interactive shell
    Shell,

    /// Show current configuration
    Config,
}

/// Everything the commands need, wired from the config
struct Services {
    connector: Arc<WalletConnector>,
    sealer: Option<Arc<SecretSealer>>,
    viewer: Arc<SecretViewer>,
    wallet: Option<Arc<LocalWallet>>,
    audit: Option<Arc<AuditLog>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }

    // Load config
    let config = if let Some(config_path) = cli.config {
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| Error::Config(format!("{}: {}", config_path.display(), e)))?;
        serde_json::from_str::<Config>(&content).map_err(|e| Error::Config(e.to_string()))?
    } else {
        Config::default()
    };
    let config = config.apply_env()?;

    match cli.command {
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Connect => {
            let services = build_services(&config)?;
            let connection = require_connection(&services).await?;
            println!(
                "Connected {} on {}",
                connection.session.short_address(),
                connection.session.network
            );
            print_inbox(&connection);
        }
        Commands::Inbox => {
            let services = build_services(&config)?;
            let connection = require_connection(&services).await?;
            print_inbox(&connection);
        }
        Commands::Seal { to, message, title } => {
            config.pinata_credentials()?;
            let services = build_services(&config)?;
            run_seal(&services, SealRequest { receiver: to, title, message }).await?;
        }
        Commands::Reveal { token_id } => {
            let services = build_services(&config)?;
            run_reveal(&services, &token_id).await?;
        }
        Commands::Shell => {
            let services = build_services(&config)?;
            Shell::new(
                services.connector,
                services.sealer,
                services.viewer,
                services.wallet,
                services.audit,
            )
            .run()
            .await?;
        }
    }

    Ok(())
}

fn build_services(config: &Config) -> Result<Services> {
    let rpc_config = RpcConfig::from_env();

    let wallet = match std::env::var(env_vars::PRIVATE_KEY) {
        Ok(_) => {
            let signer = SecureWallet::from_env(env_vars::PRIVATE_KEY)?;
            let rpc_url = rpc_config.for_network(config.network).ok_or_else(|| {
                Error::Config(format!("No RPC URL configured for {}", config.network))
            })?;
            tracing::info!(address = %signer.address(), "Loaded wallet from PRIVATE_KEY");
            Some(Arc::new(LocalWallet::new(signer, rpc_url)?))
        }
        Err(_) => {
            tracing::warn!("No PRIVATE_KEY set - no wallet to connect");
            None
        }
    };

    let keys: Arc<dyn KeyService> = Arc::new(KeyNetworkClient::new(&config.key_service_url));
    let registry: Arc<dyn SecretRegistry> =
        Arc::new(OnChainRegistry::new(config.contract_address()?));
    let gateway: Arc<dyn ContentGateway> = Arc::new(IpfsGateway::new(&config.gateway_url));

    let sealer = config.pinata.clone().map(|credentials| {
        Arc::new(SecretSealer::new(
            Arc::clone(&keys),
            Arc::new(PinataClient::new(&config.pinata_api_url, credentials)),
            Arc::clone(&registry),
        ))
    });
    let viewer = Arc::new(SecretViewer::new(Arc::clone(&keys), registry, gateway));
    let connector = Arc::new(WalletConnector::new(
        config.network,
        wallet
            .clone()
            .map(|wallet| wallet as Arc<dyn WalletProvider>),
        keys,
        Arc::clone(&viewer),
    ));
    let audit = config
        .audit_log_path
        .as_ref()
        .map(|path| Arc::new(AuditLog::new(path)));

    Ok(Services {
        connector,
        sealer,
        viewer,
        wallet,
        audit,
    })
}

async fn require_connection(services: &Services) -> Result<Connection> {
    let started = Instant::now();
    let result = services.connector.connect().await;
    if let Some(audit) = &services.audit {
        audit.record_connect(started, &result).await;
    }

    result?.ok_or_else(|| {
        Error::Wallet(format!(
            "No wallet available (set {})",
            env_vars::PRIVATE_KEY
        ))
    })
}

fn print_inbox(connection: &Connection) {
    if connection.received.is_empty() {
        println!("No secrets yet");
        return;
    }
    for secret in &connection.received {
        let sealed_on = secret
            .metadata
            .sealed_on()
            .map(|at| at.to_rfc3339())
            .unwrap_or_else(|| "unknown".to_string());
        println!(
            "#{} {} from {} (sealed {})",
            secret.token_id,
            secret.metadata.title(),
            secret.sender.to_checksum(None),
            sealed_on
        );
    }
}

async fn run_seal(services: &Services, request: SealRequest) -> Result<()> {
    let sealer = services
        .sealer
        .as_ref()
        .ok_or_else(|| Error::Config("Sealing needs pinning credentials".to_string()))?;
    // A malformed receiver fails before any network traffic
    parse_address(&request.receiver)?;
    let connection = require_connection(services).await?;
    let session = connection.session;

    tracing::info!(
        sender = %session.address,
        receiver = %request.receiver,
        "Sealing secret"
    );

    let started = Instant::now();
    let result = sealer.seal(&session, &request).await;
    if let Some(audit) = &services.audit {
        audit
            .record_seal(started, &session, &request, &result)
            .await;
    }

    let receipt = result?;
    println!(
        "Secret sealed at {} in transaction {}",
        receipt.metadata_pointer, receipt.tx_hash
    );
    if let Some(record) = receipt.record {
        println!(
            "  Sender token: {}  Receiver token: {}",
            record.sender_token_id, record.receiver_token_id
        );
    }
    Ok(())
}

async fn run_reveal(services: &Services, token_id: &str) -> Result<()> {
    let token_id = U256::from_str(token_id.trim())
        .map_err(|e| Error::InvalidArgument(format!("Invalid token id {}: {}", token_id, e)))?;

    let connection = require_connection(services).await?;
    let secret = connection
        .received
        .iter()
        .find(|secret| secret.token_id == token_id)
        .ok_or_else(|| {
            Error::InvalidArgument(format!(
                "No secret with token id {} was sealed for {}",
                token_id,
                connection.session.address.to_checksum(None)
            ))
        })?;

    let started = Instant::now();
    let result = services.viewer.reveal(&connection.session, secret).await;
    if let Some(audit) = &services.audit {
        audit
            .record_reveal(started, &connection.session, secret, &result)
            .await;
    }

    let message = result?;
    println!("{}", secret.metadata.title());
    println!("{}", message);
    println!("Sent by {}", secret.sender.to_checksum(None));
    Ok(())
}
