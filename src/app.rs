//! Presentation state
//!
//! Pure view state with no I/O: which view is selected, what the seal form
//! holds, which cards are revealed, and which calls are in flight. The shell
//! mutates it around each awaited operation and renders it as text.

use crate::sealer::SealRequest;
use crate::viewer::ReceivedSecret;
use crate::wallet::{Connection, WalletSession};
use crate::{Error, Result};
use std::fmt::Write;

pub const APP_NAME: &str = "Secret Someone";
pub const MASKED_SECRET: &str = "******************************";
pub const RECEIVER_PLACEHOLDER: &str = "0xdEAf69...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Seal,
    Reveal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CardState {
    Hidden,
    Revealing,
    Revealed(String),
}

/// One received secret as shown in the reveal view
#[derive(Debug, Clone)]
pub struct SecretCard {
    pub secret: ReceivedSecret,
    pub image_url: String,
    state: CardState,
}

impl SecretCard {
    pub fn new(secret: ReceivedSecret, image_url: String) -> Self {
        Self {
            secret,
            image_url,
            state: CardState::Hidden,
        }
    }

    pub fn title(&self) -> &str {
        self.secret.metadata.title()
    }

    pub fn body(&self) -> &str {
        match &self.state {
            CardState::Revealed(message) => message,
            _ => MASKED_SECRET,
        }
    }

    pub fn button_label(&self) -> &'static str {
        match self.state {
            CardState::Hidden => "Reveal Secret!",
            CardState::Revealing => "Revealing...",
            CardState::Revealed(_) => "Hide Secret!",
        }
    }

    pub fn footer(&self) -> String {
        format!("Sent by {}", self.secret.sender.to_checksum(None))
    }

    pub fn is_revealed(&self) -> bool {
        matches!(self.state, CardState::Revealed(_))
    }

    pub fn begin_reveal(&mut self) {
        self.state = CardState::Revealing;
    }

    /// A failed reveal leaves the card hidden
    pub fn finish_reveal(&mut self, outcome: &Result<String>) {
        self.state = match outcome {
            Ok(message) => CardState::Revealed(message.clone()),
            Err(_) => CardState::Hidden,
        };
    }

    /// Clears the displayed plaintext only
    pub fn hide(&mut self) {
        self.state = CardState::Hidden;
    }
}

#[derive(Debug, Clone, Default)]
pub struct SealForm {
    pub title: String,
    pub message: String,
    pub receiver: String,
    pub sealing: bool,
}

impl SealForm {
    pub fn to_request(&self) -> SealRequest {
        SealRequest {
            receiver: self.receiver.clone(),
            title: Some(self.title.clone()).filter(|t| !t.trim().is_empty()),
            message: self.message.clone(),
        }
    }

    pub fn button_label(&self) -> &'static str {
        if self.sealing {
            "Sealing..."
        } else {
            "Seal it!"
        }
    }
}

#[derive(Debug, Default)]
pub struct App {
    pub view: View,
    pub form: SealForm,
    connecting: bool,
    session: Option<WalletSession>,
    cards: Vec<SecretCard>,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select_view(&mut self, view: View) {
        self.view = view;
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Result<&WalletSession> {
        self.session.as_ref().ok_or(Error::NotConnected)
    }

    pub fn begin_connect(&mut self) {
        self.connecting = true;
    }

    /// Replace session and cards wholesale with a fresh connection
    pub fn finish_connect(
        &mut self,
        connection: Connection,
        image_url: impl Fn(&ReceivedSecret) -> String,
    ) {
        self.connecting = false;
        self.cards = connection
            .received
            .into_iter()
            .map(|secret| {
                let url = image_url(&secret);
                SecretCard::new(secret, url)
            })
            .collect();
        self.session = Some(connection.session);
    }

    /// Drop the session and its cards; seal and reveal then need a reconnect
    pub fn disconnect(&mut self) {
        self.connecting = false;
        self.session = None;
        self.cards.clear();
    }

    pub fn cards(&self) -> &[SecretCard] {
        &self.cards
    }

    /// Card by its 1-based position in the reveal view
    pub fn card_mut(&mut self, position: usize) -> Result<&mut SecretCard> {
        let count = self.cards.len();
        position
            .checked_sub(1)
            .and_then(|index| self.cards.get_mut(index))
            .ok_or_else(|| {
                Error::InvalidArgument(format!("No secret #{} ({} received)", position, count))
            })
    }

    pub fn connect_label(&self) -> &'static str {
        if self.connecting {
            "Connecting..."
        } else {
            "Connect Wallet"
        }
    }

    pub fn navbar(&self) -> String {
        match &self.session {
            Some(session) => format!("{} | {}", APP_NAME, session.short_address()),
            None => format!("{} | [{}]", APP_NAME, self.connect_label()),
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.navbar());

        if !self.is_connected() {
            let _ = writeln!(out, "  [{}]", self.connect_label());
            return out;
        }

        let (seal, reveal) = match self.view {
            View::Seal => ("(Seal)", "Reveal"),
            View::Reveal => ("Seal", "(Reveal)"),
        };
        let _ = writeln!(out, "  {} | {}", seal, reveal);

        match self.view {
            View::Seal => {
                let _ = writeln!(out, "  Seal Secret");
                let _ = writeln!(out, "    Title:            {}", self.form.title);
                let _ = writeln!(out, "    Message:          {}", self.form.message);
                let receiver = if self.form.receiver.is_empty() {
                    RECEIVER_PLACEHOLDER
                } else {
                    self.form.receiver.as_str()
                };
                let _ = writeln!(out, "    Receiver Address: {}", receiver);
                let _ = writeln!(out, "    [{}]", self.form.button_label());
            }
            View::Reveal => {
                let _ = writeln!(out, "  Reveal Secret");
                if self.cards.is_empty() {
                    let _ = writeln!(out, "    No secrets yet");
                }
                for (index, card) in self.cards.iter().enumerate() {
                    let _ = writeln!(out, "    #{} {}", index + 1, card.title());
                    let _ = writeln!(out, "       {}", card.image_url);
                    let _ = writeln!(out, "       {}", card.body());
                    let _ = writeln!(out, "       [{}]", card.button_label());
                    let _ = writeln!(out, "       {}", card.footer());
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::WrappedKey;
    use crate::metadata::{SecretMetadata, SecretPayload};
    use crate::policy::AccessPolicy;
    use crate::storage::ContentPointer;
    use alloy::primitives::{address, U256};
    use chrono::Utc;

    fn secret() -> ReceivedSecret {
        let sender = address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266");
        let receiver = address!("70997970c51812dc3a010c7d01b50e0d17dc79c8");
        ReceivedSecret {
            metadata: SecretMetadata::new(
                sender,
                receiver,
                Some("t"),
                SecretPayload {
                    access_control_conditions: AccessPolicy::for_reader("rinkeby", receiver),
                    encrypted_symmetric_key: WrappedKey::new(vec![1]),
                    encrypted_string_hash: ContentPointer::new("QmCipher"),
                },
                Utc::now(),
            ),
            sender,
            sender_token_id: U256::from(1),
            receiver,
            token_id: U256::from(2),
        }
    }

    #[test]
    fn card_cycles_through_reveal_states() {
        let mut card = SecretCard::new(secret(), "https://ipfs.io/ipfs/img".to_string());
        assert_eq!(card.body(), MASKED_SECRET);
        assert_eq!(card.button_label(), "Reveal Secret!");

        card.begin_reveal();
        assert_eq!(card.button_label(), "Revealing...");
        assert_eq!(card.body(), MASKED_SECRET);

        card.finish_reveal(&Ok("hello".to_string()));
        assert!(card.is_revealed());
        assert_eq!(card.body(), "hello");
        assert_eq!(card.button_label(), "Hide Secret!");

        card.hide();
        assert_eq!(card.body(), MASKED_SECRET);
        assert_eq!(
            card.footer(),
            "Sent by 0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        );
    }

    #[test]
    fn failed_reveal_stays_hidden() {
        let mut card = SecretCard::new(secret(), String::new());
        card.begin_reveal();
        card.finish_reveal(&Err(Error::KeyService("denied".to_string())));
        assert!(!card.is_revealed());
        assert_eq!(card.button_label(), "Reveal Secret!");
    }

    #[test]
    fn disconnected_app_only_offers_connect() {
        let mut app = App::new();
        assert!(matches!(app.session(), Err(Error::NotConnected)));
        assert_eq!(app.navbar(), "Secret Someone | [Connect Wallet]");

        app.begin_connect();
        assert!(app.render().contains("Connecting..."));
        assert!(!app.render().contains("Seal Secret"));

        app.disconnect();
        assert!(!app.is_connected());
        assert_eq!(app.connect_label(), "Connect Wallet");
    }

    #[test]
    fn form_builds_request_with_optional_title() {
        let form = SealForm {
            title: "  ".to_string(),
            message: "hello".to_string(),
            receiver: "0xabc".to_string(),
            sealing: false,
        };
        let request = form.to_request();
        assert_eq!(request.title, None);
        assert_eq!(request.message, "hello");
        assert_eq!(form.button_label(), "Seal it!");
    }

    #[test]
    fn card_positions_are_one_based() {
        let mut app = App::new();
        assert!(matches!(app.card_mut(1), Err(Error::InvalidArgument(_))));
        assert!(app.card_mut(0).is_err());
        assert_eq!(app.view, View::Seal);
        app.select_view(View::Reveal);
        assert_eq!(app.view, View::Reveal);
    }
}
