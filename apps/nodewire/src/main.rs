//! # Nodewire
//!
//! The command-line binary for the nodewire link engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │            apps/nodewire (THE BINARY)         │
//! │                                               │
//! │  ┌─────────────┐        ┌──────────────────┐  │
//! │  │   CLI       │        │  Config + Files  │  │
//! │  │  (clap)     │        │  (toml, serde)   │  │
//! │  └──────┬──────┘        └────────┬─────────┘  │
//! │         └───────────┬────────────┘            │
//! │                     ▼                         │
//! │             ┌───────────────┐                 │
//! │             │ nodewire-core │                 │
//! │             │ (THE ENGINE)  │                 │
//! │             └───────────────┘                 │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! nodewire -w workflow.json status
//! nodewire -w workflow.json suggest -s 4 -t 7
//! nodewire -w workflow.json connect --source 4 --target 7 --target-slot 1
//! nodewire -w workflow.json batch -f rewire.json -o rewired.json
//! ```

use clap::Parser;
use nodewire::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // NODEWIRE_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("NODEWIRE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "nodewire=info".into());

    // Logs go to stderr so --json-mode output on stdout stays parseable.
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
