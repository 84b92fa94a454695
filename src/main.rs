//! mog demo runner
//!
//! Connects with the configured URI and walks through the session facade
//! on a small property/location data set.
//!
//! # Usage
//!
//! ```bash
//! mog --uri mongodb://localhost:27017 --db demo --csv /tmp/mog_props.csv
//! ```

use tokio_util::sync::CancellationToken;
use tracing::info;

use mog::cli::{CliInterface, demo};
use mog::{Result, Session, connection};

/// Application entry point
#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Main application logic
///
/// 1. Parse command-line arguments and load configuration
/// 2. Initialize logging
/// 3. Connect and run the walkthrough, stopping on Ctrl+C
async fn run() -> Result<()> {
    let cli = CliInterface::new()?;
    initialize_logging(&cli);

    info!("Connecting to {}", cli.sanitized_uri());
    let store = connection::connect_checked(cli.connection_config()).await?;

    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    let ctrl_c_handle = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => cancel_on_signal.cancel(),
            Err(err) => eprintln!("Failed to listen for Ctrl+C: {}", err),
        }
    });

    let mut session = Session::with_cancel(store, demo::PROPERTIES, cancel);
    let result = demo::run(&mut session, &cli.csv_path()).await;

    ctrl_c_handle.abort();
    result
}

/// Initialize logging system based on verbosity level
///
/// # Arguments
/// * `cli` - CLI interface with verbosity settings
fn initialize_logging(cli: &CliInterface) {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(cli.log_level())
        .with_target(false);

    if cli.config().logging.timestamps {
        subscriber.init();
    } else {
        subscriber.without_time().init();
    }
}
