//! Card bank CLI
//!
//! Interactive menu on stdin/stdout; logs go to stderr (`RUST_LOG` to tune).
//!
//! ```bash
//! cargo run -- --fileName card.s3db
//! cargo run -- --in-memory
//! ```
//!
//! Only a store that cannot be initialised stops the program with an error;
//! everything else is reported in the menu and the session carries on.

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use card_bank::{cli, AccountRegistry, BankConfig, CardStore, Console, MemoryStore, Session, SqliteStore};

fn main() -> Result<()> {
    init_tracing();

    let args = cli::parse_args();
    let config = args.to_config().context("Invalid configuration")?;
    info!(?config, "Starting card bank");

    let rng = StdRng::from_entropy();

    if config.in_memory {
        run(MemoryStore::new(), rng, &config)
    } else {
        let store = SqliteStore::open(&config.db_path).with_context(|| {
            format!("Cannot initialise card database at {}", config.db_path.display())
        })?;
        run(store, rng, &config)
    }
}

fn run<S: CardStore>(store: S, rng: StdRng, config: &BankConfig) -> Result<()> {
    let registry =
        AccountRegistry::open(store, rng, config).context("Failed to load issued cards")?;
    let mut session = Session::new(registry);

    let stdin = io::stdin();
    let mut console = Console::new(stdin.lock(), io::stdout().lock());
    console.run(&mut session)
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "card_bank=warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}
