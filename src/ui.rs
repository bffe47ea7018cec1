// 🖥️ Console - line-oriented menus over any reader/writer
//
// Main menu:    1. Create an account / 2. Log into account / 0. Exit
// Account menu: 1. Balance / 2. Log out / 0. Exit
//
// Malformed input (including bytes that are not UTF-8) is reported and the
// menu is shown again. End of input behaves like choosing 0.

use std::io::{BufRead, Write};

use anyhow::Result;
use rand::Rng;
use tracing::warn;

use crate::error::BankError;
use crate::pin::is_well_formed_pin;
use crate::session::{Command, Outcome, Session, SessionState};
use crate::store::CardStore;

const MAIN_MENU: &str = "1. Create an account\n2. Log into account\n0. Exit";
const ACCOUNT_MENU: &str = "1. Balance\n2. Log out\n0. Exit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Menu {
    Main,
    Account,
}

impl Menu {
    pub fn text(&self) -> &'static str {
        match self {
            Menu::Main => MAIN_MENU,
            Menu::Account => ACCOUNT_MENU,
        }
    }
}

/// Parse a menu selection: `0`, `1` or `2`
pub fn parse_menu_choice(line: &str) -> Result<u8, BankError> {
    match line.trim() {
        "0" => Ok(0),
        "1" => Ok(1),
        "2" => Ok(2),
        other => Err(BankError::invalid_input(format!("unknown menu option '{}'", other))),
    }
}

/// One line read from the input
enum Reply {
    Line(String),
    /// Not UTF-8
    Malformed,
    Closed,
}

pub struct Console<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Console { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Run menus until the session terminates
    pub fn run<S: CardStore, G: Rng>(&mut self, session: &mut Session<S, G>) -> Result<()> {
        loop {
            let menu = match session.state() {
                SessionState::Anonymous => Menu::Main,
                SessionState::Authenticated(_) => Menu::Account,
                SessionState::Terminated => break,
            };

            let Some(command) = self.prompt(menu)? else {
                continue;
            };

            match session.handle(command) {
                Ok(outcome) => self.render(menu, &outcome)?,
                Err(err) => self.report(&err)?,
            }
        }

        self.output.flush()?;
        Ok(())
    }

    /// Show `menu` and turn the reply into a command; `None` after bad input
    fn prompt(&mut self, menu: Menu) -> Result<Option<Command>> {
        writeln!(self.output, "{}", menu.text())?;
        let line = match self.read_line()? {
            Reply::Line(line) => line,
            Reply::Closed => return Ok(Some(Command::Exit)),
            Reply::Malformed => {
                writeln!(self.output)?;
                return self.reject_encoding();
            }
        };
        writeln!(self.output)?;

        let choice = match parse_menu_choice(&line) {
            Ok(choice) => choice,
            Err(err) => {
                self.report(&err)?;
                return Ok(None);
            }
        };

        let command = match (menu, choice) {
            (_, 0) => Command::Exit,
            (Menu::Main, 1) => Command::CreateAccount,
            (Menu::Main, _) => return self.read_credentials(),
            (Menu::Account, 1) => Command::Balance,
            (Menu::Account, _) => Command::Logout,
        };
        Ok(Some(command))
    }

    /// Card number then PIN
    fn read_credentials(&mut self) -> Result<Option<Command>> {
        writeln!(self.output, "Enter your card number:")?;
        let number = match self.read_line()? {
            Reply::Closed => return Ok(Some(Command::Exit)),
            reply => reply,
        };

        // The PIN line is consumed even after a malformed number
        writeln!(self.output, "Enter your PIN:")?;
        let pin = match self.read_line()? {
            Reply::Closed => return Ok(Some(Command::Exit)),
            reply => reply,
        };
        writeln!(self.output)?;

        let (Reply::Line(number), Reply::Line(pin)) = (number, pin) else {
            return self.reject_encoding();
        };

        if !is_well_formed_pin(pin.trim()) {
            self.report(&BankError::invalid_input("PIN must be 4 digits"))?;
            return Ok(None);
        }

        Ok(Some(Command::Login { number, pin }))
    }

    fn report(&mut self, err: &BankError) -> Result<()> {
        warn!(error = %err, "Command failed");
        writeln!(self.output, "{}\n", err)?;
        Ok(())
    }

    fn reject_encoding(&mut self) -> Result<Option<Command>> {
        self.report(&BankError::invalid_input("input is not valid UTF-8"))?;
        Ok(None)
    }

    fn read_line(&mut self) -> Result<Reply> {
        self.output.flush()?;

        let mut buf = Vec::new();
        if self.input.read_until(b'\n', &mut buf)? == 0 {
            return Ok(Reply::Closed);
        }
        match String::from_utf8(buf) {
            Ok(line) => Ok(Reply::Line(line.trim_end_matches(['\r', '\n']).to_string())),
            Err(_) => Ok(Reply::Malformed),
        }
    }

    /// `menu` is the one the command was chosen from
    fn render(&mut self, menu: Menu, outcome: &Outcome) -> Result<()> {
        match outcome {
            Outcome::CardIssued(card) => {
                writeln!(self.output, "Your card has been created")?;
                writeln!(self.output, "Your card number:")?;
                writeln!(self.output, "{}", card.number)?;
                writeln!(self.output, "Your card PIN:")?;
                writeln!(self.output, "{}", card.pin)?;
                writeln!(self.output)?;
            }
            Outcome::LoggedIn(_) => writeln!(self.output, "You have successfully logged in!\n")?,
            Outcome::LoginRejected => writeln!(self.output, "{}\n", BankError::AuthFailure)?,
            Outcome::Balance(balance) => writeln!(self.output, "Balance: {}\n", balance)?,
            Outcome::LoggedOut => writeln!(self.output, "You have successfully logged out!\n")?,
            Outcome::Terminated => match menu {
                Menu::Main => writeln!(self.output, "Bye")?,
                Menu::Account => writeln!(self.output, "Bye!")?,
            },
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BankConfig;
    use crate::db::Event;
    use crate::entities::Card;
    use crate::registry::AccountRegistry;
    use crate::store::MemoryStore;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rstest::rstest;
    use std::io::Cursor;

    fn new_session() -> Session<MemoryStore, StdRng> {
        let registry = AccountRegistry::open(
            MemoryStore::new(),
            StdRng::seed_from_u64(21),
            &BankConfig::default(),
        )
        .unwrap();
        Session::new(registry)
    }

    /// Rejects every insert as a duplicate, so no number is ever free
    #[derive(Default)]
    struct FullStore(MemoryStore);

    impl CardStore for FullStore {
        fn insert_card(&self, card: &Card) -> Result<(), BankError> {
            Err(BankError::DuplicateCard {
                number: card.number.clone(),
            })
        }
        fn find_card(&self, number: &str) -> Result<Option<Card>, BankError> {
            self.0.find_card(number)
        }
        fn load_cards(&self) -> Result<Vec<Card>, BankError> {
            self.0.load_cards()
        }
        fn max_card_id(&self) -> Result<Option<i64>, BankError> {
            self.0.max_card_id()
        }
        fn record_event(&self, event: &Event) -> Result<(), BankError> {
            self.0.record_event(event)
        }
        fn events_for_card(&self, number: &str) -> Result<Vec<Event>, BankError> {
            self.0.events_for_card(number)
        }
    }

    fn run_script<S: CardStore>(session: &mut Session<S, StdRng>, script: impl AsRef<[u8]>) -> String {
        let mut console = Console::new(Cursor::new(script.as_ref().to_vec()), Vec::new());
        console.run(session).unwrap();
        String::from_utf8(console.into_output()).unwrap()
    }

    #[rstest]
    #[case::zero("0", 0)]
    #[case::one("1", 1)]
    #[case::two(" 2 ", 2)]
    fn test_parse_menu_choice(#[case] line: &str, #[case] expected: u8) {
        assert_eq!(parse_menu_choice(line).unwrap(), expected);
    }

    #[rstest]
    #[case::out_of_range("3")]
    #[case::word("balance")]
    #[case::empty("")]
    #[case::negative("-1")]
    fn test_parse_menu_choice_rejects(#[case] line: &str) {
        assert!(matches!(parse_menu_choice(line), Err(BankError::InvalidInput { .. })));
    }

    #[test]
    fn test_exit_from_main_menu() {
        let mut session = new_session();
        let output = run_script(&mut session, "0\n");

        assert_eq!(output, format!("{}\n\nBye\n", MAIN_MENU));
        assert!(session.is_terminated());
    }

    #[test]
    fn test_exit_from_account_menu_says_bye_with_emphasis() {
        let mut registry = AccountRegistry::open(
            MemoryStore::new(),
            StdRng::seed_from_u64(23),
            &BankConfig::default(),
        )
        .unwrap();
        let card = registry.create_card().unwrap();
        let mut session = Session::new(registry);
        let script = format!("2\n{}\n{}\n0\n", card.number, card.pin);
        let output = run_script(&mut session, script);

        assert!(output.ends_with(&format!("{}\n\nBye!\n", ACCOUNT_MENU)));
        assert!(session.is_terminated());
    }

    #[test]
    fn test_end_of_input_exits() {
        let mut session = new_session();
        let output = run_script(&mut session, "");

        assert!(output.ends_with("Bye\n"));
        assert!(session.is_terminated());
    }

    #[test]
    fn test_create_prints_number_and_pin() {
        let mut session = new_session();
        let output = run_script(&mut session, "1\n0\n");

        let lines: Vec<&str> = output.lines().collect();
        let at = lines.iter().position(|l| *l == "Your card number:").unwrap();
        let number = lines[at + 1];
        let pin = lines[at + 3];

        assert_eq!(lines[at - 1], "Your card has been created");
        assert_eq!(lines[at + 2], "Your card PIN:");
        let card = session.registry().find(number).unwrap();
        assert_eq!(card.pin, pin);
    }

    #[test]
    fn test_unknown_option_reprompts() {
        let mut session = new_session();
        let output = run_script(&mut session, "7\n0\n");

        assert!(output.contains("Invalid input: unknown menu option '7'"));
        assert_eq!(output.matches(MAIN_MENU).count(), 2);
        assert!(session.is_terminated());
    }

    #[test]
    fn test_non_utf8_line_reprompts() {
        let mut session = new_session();
        let output = run_script(&mut session, [0xff, b'\n', b'0', b'\n']);

        assert!(output.contains("Invalid input: input is not valid UTF-8\n"));
        assert_eq!(output.matches(MAIN_MENU).count(), 2);
        assert_eq!(session.state(), &SessionState::Terminated);
    }

    #[test]
    fn test_non_utf8_card_number_reprompts() {
        let mut session = new_session();
        let mut script = b"2\n".to_vec();
        script.extend_from_slice(&[0xfe, 0xff, b'\n']);
        script.extend_from_slice(b"1234\n0\n");
        let output = run_script(&mut session, script);

        assert!(output.contains("Invalid input: input is not valid UTF-8\n"));
        assert!(!output.contains("Wrong card number or PIN!"));
        assert_eq!(output.matches(MAIN_MENU).count(), 2);
        assert!(session.is_terminated());
    }

    #[test]
    fn test_exhausted_number_space_returns_to_menu() {
        let registry = AccountRegistry::open(
            FullStore::default(),
            StdRng::seed_from_u64(22),
            &BankConfig::default(),
        )
        .unwrap();
        let mut session = Session::new(registry);
        let output = run_script(&mut session, "1\n0\n");

        assert!(output.contains("Could not find a free card number after 1000 attempts\n"));
        assert!(!output.contains("Your card has been created"));
        assert_eq!(output.matches(MAIN_MENU).count(), 2);
        assert!(session.is_terminated());
    }

    #[test]
    fn test_non_numeric_pin_is_invalid_input() {
        let mut session = new_session();
        let output = run_script(&mut session, "2\n4000000000000002\nabcd\n0\n");

        assert!(output.contains("Invalid input: PIN must be 4 digits"));
        assert!(!output.contains("Wrong card number or PIN!"));
    }

    #[test]
    fn test_wrong_credentials() {
        let mut session = new_session();
        let output = run_script(&mut session, "2\n4000000000000002\n1234\n0\n");

        assert!(output.contains("Enter your card number:\nEnter your PIN:\n\nWrong card number or PIN!\n"));
        assert_eq!(session.state(), &SessionState::Terminated);
    }
}
