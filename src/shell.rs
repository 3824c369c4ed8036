//! Interactive shell
//!
//! Reads commands from stdin, drives the [`App`] state around each awaited
//! call and re-runs the connect flow whenever the wallet reports an account
//! or network change.

use crate::app::{App, View};
use crate::audit::AuditLog;
use crate::sealer::SecretSealer;
use crate::viewer::SecretViewer;
use crate::wallet::{LocalWallet, SecureWallet, WalletConnector, WalletEvent};
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::{debug, warn};

pub const HELP: &str = "\
Commands:
  connect              connect the wallet
  view seal|reveal     switch view
  title <text>         set the secret title
  message <text>       set the secret message
  to <address>         set the receiver address
  send                 seal the secret
  reveal <n>           reveal secret #n
  hide <n>             hide secret #n
  account <ENV_VAR>    switch wallet account to the key held in ENV_VAR
  rpc <url>            switch wallet network endpoint
  help                 show this help
  quit                 exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Connect,
    View(View),
    Title(String),
    Message(String),
    To(String),
    Send,
    Reveal(usize),
    Hide(usize),
    Account(String),
    Rpc(String),
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "connect" => Command::Connect,
            "view" => match rest.to_ascii_lowercase().as_str() {
                "seal" => Command::View(View::Seal),
                "reveal" => Command::View(View::Reveal),
                other => {
                    return Err(Error::InvalidArgument(format!(
                        "Unknown view {:?} (seal or reveal)",
                        other
                    )))
                }
            },
            "title" => Command::Title(rest.to_string()),
            "message" => Command::Message(rest.to_string()),
            "to" => Command::To(rest.to_string()),
            "send" => Command::Send,
            "reveal" => Command::Reveal(position(rest)?),
            "hide" => Command::Hide(position(rest)?),
            "account" => Command::Account(required(word, rest)?),
            "rpc" => Command::Rpc(required(word, rest)?),
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => {
                return Err(Error::InvalidArgument(format!(
                    "Unknown command {:?}, try help",
                    other
                )))
            }
        };
        Ok(command)
    }

    /// View a form or card command belongs to, if any
    fn required_view(&self) -> Option<View> {
        match self {
            Command::Title(_) | Command::Message(_) | Command::To(_) | Command::Send => {
                Some(View::Seal)
            }
            Command::Reveal(_) | Command::Hide(_) => Some(View::Reveal),
            _ => None,
        }
    }
}

fn position(arg: &str) -> Result<usize> {
    arg.parse()
        .map_err(|_| Error::InvalidArgument(format!("Expected a secret number, got {:?}", arg)))
}

fn required(word: &str, arg: &str) -> Result<String> {
    if arg.is_empty() {
        return Err(Error::InvalidArgument(format!("{} needs an argument", word)));
    }
    Ok(arg.to_string())
}

pub struct Shell {
    app: App,
    connector: Arc<WalletConnector>,
    sealer: Option<Arc<SecretSealer>>,
    viewer: Arc<SecretViewer>,
    wallet: Option<Arc<LocalWallet>>,
    audit: Option<Arc<AuditLog>>,
    events: Option<broadcast::Receiver<WalletEvent>>,
}

impl Shell {
    pub fn new(
        connector: Arc<WalletConnector>,
        sealer: Option<Arc<SecretSealer>>,
        viewer: Arc<SecretViewer>,
        wallet: Option<Arc<LocalWallet>>,
        audit: Option<Arc<AuditLog>>,
    ) -> Self {
        Self {
            app: App::new(),
            connector,
            sealer,
            viewer,
            wallet,
            audit,
            events: None,
        }
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    pub async fn run(mut self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        println!("{}", HELP);
        self.connect().await;
        print!("{}", self.app.render());

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    if line.trim().is_empty() {
                        continue;
                    }
                    match Command::parse(&line) {
                        Ok(Command::Quit) => break,
                        Ok(command) => self.execute(command).await,
                        Err(e) => alert(&e),
                    }
                }
                event = self.next_wallet_event() => self.on_wallet_event(event).await,
            }
            print!("{}", self.app.render());
        }
        Ok(())
    }

    /// Whether account/network changes are being watched
    pub fn is_watching(&self) -> bool {
        self.events.is_some()
    }

    /// Next wallet event; pending forever until the first successful connect.
    /// `None` means the wallet dropped its sender.
    pub async fn next_wallet_event(&mut self) -> Option<WalletEvent> {
        next_event(&mut self.events).await
    }

    /// Every account or network change re-runs the whole connect flow
    pub async fn on_wallet_event(&mut self, event: Option<WalletEvent>) {
        match event {
            Some(event) => {
                debug!(?event, "Wallet changed, reconnecting");
                self.connect().await;
            }
            None => self.events = None,
        }
    }

    pub async fn execute(&mut self, command: Command) {
        if let Some(view) = command.required_view() {
            if self.app.view != view {
                let name = match view {
                    View::Seal => "seal",
                    View::Reveal => "reveal",
                };
                alert(&Error::InvalidArgument(format!(
                    "Only available in the {} view (view {})",
                    name, name
                )));
                return;
            }
        }

        let outcome = match command {
            Command::Connect => {
                self.connect().await;
                Ok(())
            }
            Command::View(view) => {
                self.app.select_view(view);
                Ok(())
            }
            Command::Title(title) => {
                self.app.form.title = title;
                Ok(())
            }
            Command::Message(message) => {
                self.app.form.message = message;
                Ok(())
            }
            Command::To(receiver) => {
                self.app.form.receiver = receiver;
                Ok(())
            }
            Command::Send => self.send().await,
            Command::Reveal(position) => self.reveal(position).await,
            Command::Hide(position) => self.app.card_mut(position).map(|card| card.hide()),
            Command::Account(var_name) => self.switch_account(&var_name).await,
            Command::Rpc(url) => self.switch_endpoint(&url).await,
            Command::Help => {
                println!("{}", HELP);
                Ok(())
            }
            Command::Quit => Ok(()),
        };

        if let Err(e) = outcome {
            alert(&e);
        }
    }

    async fn connect(&mut self) {
        self.app.begin_connect();
        print!("{}", self.app.render());

        let started = Instant::now();
        let result = self.connector.connect().await;
        if let Some(audit) = &self.audit {
            audit.record_connect(started, &result).await;
        }

        match result {
            Ok(Some(connection)) => {
                let viewer = Arc::clone(&self.viewer);
                self.app
                    .finish_connect(connection, |secret| viewer.image_url(secret));
                if self.events.is_none() {
                    self.events = self.connector.subscribe();
                }
            }
            Ok(None) => {
                self.app.disconnect();
                println!("No wallet available. Set PRIVATE_KEY to connect.");
            }
            Err(e) => {
                // A failed reconnect must not leave the previous session usable
                self.app.disconnect();
                alert(&e);
            }
        }
    }

    async fn send(&mut self) -> Result<()> {
        let sealer = self
            .sealer
            .clone()
            .ok_or_else(|| Error::Config("Sealing needs pinning credentials".to_string()))?;
        let session = self.app.session()?.clone();
        let request = self.app.form.to_request();

        self.app.form.sealing = true;
        print!("{}", self.app.render());
        let started = Instant::now();
        let result = sealer.seal(&session, &request).await;
        self.app.form.sealing = false;

        if let Some(audit) = &self.audit {
            audit
                .record_seal(started, &session, &request, &result)
                .await;
        }

        let receipt = result?;
        println!(
            "Secret sealed at {} in transaction {}",
            receipt.metadata_pointer, receipt.tx_hash
        );
        Ok(())
    }

    async fn reveal(&mut self, position: usize) -> Result<()> {
        let session = self.app.session()?.clone();
        let card = self.app.card_mut(position)?;
        let secret = card.secret.clone();
        card.begin_reveal();

        let started = Instant::now();
        let result = self.viewer.reveal(&session, &secret).await;
        if let Some(audit) = &self.audit {
            audit
                .record_reveal(started, &session, &secret, &result)
                .await;
        }

        self.app.card_mut(position)?.finish_reveal(&result);
        result.map(|_| ())
    }

    async fn switch_account(&mut self, var_name: &str) -> Result<()> {
        let wallet = self.local_wallet()?;
        let signer = SecureWallet::from_env(var_name)?;
        wallet.switch_account(signer).await;
        Ok(())
    }

    async fn switch_endpoint(&mut self, url: &str) -> Result<()> {
        let wallet = self.local_wallet()?;
        wallet.switch_endpoint(url).await
    }

    fn local_wallet(&self) -> Result<Arc<LocalWallet>> {
        self.wallet
            .clone()
            .ok_or_else(|| Error::Wallet("No wallet available".to_string()))
    }
}

async fn next_event(
    events: &mut Option<broadcast::Receiver<WalletEvent>>,
) -> Option<WalletEvent> {
    let Some(receiver) = events.as_mut() else {
        return futures::future::pending().await;
    };
    loop {
        match receiver.recv().await {
            Ok(event) => return Some(event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Missed wallet events");
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

fn alert(error: &Error) {
    eprintln!("! {}", error);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_form_commands_with_free_text() {
        assert_eq!(
            Command::parse("title  Birthday plans ").unwrap(),
            Command::Title("Birthday plans".to_string())
        );
        assert_eq!(
            Command::parse("message meet me at 8").unwrap(),
            Command::Message("meet me at 8".to_string())
        );
        assert_eq!(Command::parse("title").unwrap(), Command::Title(String::new()));
        assert_eq!(Command::parse("SEND").unwrap(), Command::Send);
    }

    #[test]
    fn parses_views_and_positions() {
        assert_eq!(
            Command::parse("view reveal").unwrap(),
            Command::View(View::Reveal)
        );
        assert_eq!(Command::parse("reveal 2").unwrap(), Command::Reveal(2));
        assert_eq!(Command::parse("hide 1").unwrap(), Command::Hide(1));
        assert!(Command::parse("view settings").is_err());
        assert!(Command::parse("reveal two").is_err());
    }

    #[test]
    fn rejects_missing_arguments_and_unknown_words() {
        assert!(matches!(
            Command::parse("account"),
            Err(Error::InvalidArgument(_))
        ));
        assert!(Command::parse("rpc").is_err());
        assert!(Command::parse("dance").is_err());
        assert_eq!(Command::parse("exit").unwrap(), Command::Quit);
    }

    #[test]
    fn commands_are_bound_to_their_view() {
        assert_eq!(Command::Send.required_view(), Some(View::Seal));
        assert_eq!(Command::Hide(1).required_view(), Some(View::Reveal));
        assert_eq!(Command::Connect.required_view(), None);
    }
}
