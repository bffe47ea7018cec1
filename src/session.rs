//! Session state machine
//!
//! Drives one cardholder interaction at a time:
//!
//! ```text
//! Anonymous --login ok--> Authenticated(card) --logout--> Anonymous
//!     |                          |
//!     +--exit--> Terminated <----+--exit
//! ```
//!
//! The session knows nothing about terminals; the console (or a test) feeds
//! it [`Command`] values and renders the returned [`Outcome`].

use rand::Rng;
use tracing::{debug, info};

use crate::entities::Card;
use crate::error::BankError;
use crate::registry::AccountRegistry;
use crate::store::CardStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated(Card),
    Terminated,
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Anonymous => "logged out",
            SessionState::Authenticated(_) => "logged in",
            SessionState::Terminated => "terminated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    CreateAccount,
    Login { number: String, pin: String },
    Balance,
    Logout,
    Exit,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::CreateAccount => "create account",
            Command::Login { .. } => "log in",
            Command::Balance => "balance",
            Command::Logout => "log out",
            Command::Exit => "exit",
        }
    }
}

/// What happened in response to a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    CardIssued(Card),
    LoggedIn(Card),
    /// Generic rejection; never says which field was wrong
    LoginRejected,
    Balance(i64),
    LoggedOut,
    Terminated,
}

pub struct Session<S, R> {
    registry: AccountRegistry<S, R>,
    state: SessionState,
}

impl<S: CardStore, R: Rng> Session<S, R> {
    pub fn new(registry: AccountRegistry<S, R>) -> Self {
        Session {
            registry,
            state: SessionState::Anonymous,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_terminated(&self) -> bool {
        self.state == SessionState::Terminated
    }

    pub fn registry(&self) -> &AccountRegistry<S, R> {
        &self.registry
    }

    /// Apply one command.
    ///
    /// On error the state is left unchanged. Failed logins are not errors:
    /// they yield `Outcome::LoginRejected` and stay `Anonymous`.
    pub fn handle(&mut self, command: Command) -> Result<Outcome, BankError> {
        debug!(command = command.name(), state = self.state.name(), "Handling command");

        match (&self.state, command) {
            (SessionState::Anonymous, Command::CreateAccount) => {
                let card = self.registry.create_card()?;
                Ok(Outcome::CardIssued(card))
            }
            (SessionState::Anonymous, Command::Login { number, pin }) => {
                match self.registry.authenticate(number.trim(), pin.trim()) {
                    Ok(card) => {
                        self.state = SessionState::Authenticated(card.clone());
                        Ok(Outcome::LoggedIn(card))
                    }
                    Err(BankError::AuthFailure) => Ok(Outcome::LoginRejected),
                    Err(err) => Err(err),
                }
            }
            (SessionState::Authenticated(card), Command::Balance) => {
                let balance = self.registry.get_balance(card)?;
                Ok(Outcome::Balance(balance))
            }
            (SessionState::Authenticated(card), Command::Logout) => {
                info!(card = %card.masked_number(), "Logged out");
                self.registry.record_logout(card);
                self.state = SessionState::Anonymous;
                Ok(Outcome::LoggedOut)
            }
            (SessionState::Anonymous | SessionState::Authenticated(_), Command::Exit) => {
                info!("Session terminated");
                self.state = SessionState::Terminated;
                Ok(Outcome::Terminated)
            }
            (state, command) => Err(BankError::InvalidTransition {
                command: command.name(),
                state: state.name(),
            }),
        }
    }
}
