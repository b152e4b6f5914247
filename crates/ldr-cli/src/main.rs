use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::reconcile::{run_reconcile, ReconcileArgs};

#[derive(Parser)]
#[command(name = "ldr")]
#[command(about = "LD / management-ledger reconciliation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile primary ledgers (LDs) against the management ledger
    Reconcile {
        /// Management ledger CSV (any size)
        #[arg(long)]
        ledger: PathBuf,

        /// Primary ledger CSV; repeat for several LDs
        #[arg(long = "primary", required = true)]
        primary: Vec<PathBuf>,

        /// Layered config paths in merge order
        #[arg(long = "config")]
        config_paths: Vec<String>,

        /// Write the JSON summary here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,

        /// Fail when the config has keys the engine does not read
        #[arg(long, default_value_t = false)]
        strict_config: bool,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> site -> run)
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env.local if present (dev convenience). Silent when absent.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Reconcile {
            ledger,
            primary,
            config_paths,
            out,
            strict_config,
        } => {
            run_reconcile(ReconcileArgs {
                ledger,
                primary,
                config_paths,
                out,
                strict_config,
            })
            .await?;
        }

        Commands::ConfigHash { paths } => {
            let loaded = commands::load_config(&paths)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }
    }

    Ok(())
}

// Logs go to stderr so stdout stays parseable.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
