use clap::Parser;
use inapp_bridge::config::BridgeConfig;
use inapp_bridge::domain::ports::{BillingConnectorRef, CallbackSinkRef, UiHostRef};
use inapp_bridge::infrastructure::in_memory::{InMemoryBillingClient, InMemoryUiHost};
use inapp_bridge::infrastructure::mailbox::HostMailbox;
use inapp_bridge::interfaces::bridge::StoreBridge;
use inapp_bridge::interfaces::csv::catalog_reader::CatalogReader;
use inapp_bridge::interfaces::script::{Operation, ScriptReader};
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Session script, one JSON command per line
    script: PathBuf,

    /// Store catalog CSV file (sku, price, currency, title)
    #[arg(long)]
    catalog: PathBuf,

    /// Bridge configuration file (TOML). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Make the billing SDK setup fail, as on a device without the store
    #[arg(long)]
    store_unavailable: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => BridgeConfig::load(path).into_diagnostic()?,
        None => BridgeConfig::default(),
    };
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    // Logs go to stderr, stdout carries the host messages
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let mut catalog = Vec::new();
    let catalog_file = File::open(&cli.catalog).into_diagnostic()?;
    for entry in CatalogReader::new(catalog_file).entries() {
        match entry {
            Ok(entry) => catalog.push(entry),
            Err(e) => tracing::warn!(error = %e, "Error reading catalog entry"),
        }
    }

    let billing = InMemoryBillingClient::new(catalog).with_request_code(config.request_code);
    if cli.store_unavailable {
        billing
            .set_unavailable(Some("Billing service unavailable on device".to_string()))
            .await;
    }
    let ui_host = InMemoryUiHost::new();
    let (mailbox, mut receiver) = HostMailbox::new(config.game_object.clone());

    let connector: BillingConnectorRef = Arc::new(billing.clone());
    let host: UiHostRef = Arc::new(ui_host.clone());
    let sink: CallbackSinkRef = Arc::new(mailbox);
    let bridge = StoreBridge::from_config(&config, connector, host, sink);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let script = BufReader::new(File::open(&cli.script).into_diagnostic()?);
    for command in ScriptReader::new(script).commands() {
        match command {
            Ok(command) => {
                let params = command.params_json();
                match command.op {
                    Operation::ListProducts => bridge.list_products(&params).await,
                    Operation::LaunchPurchase => {
                        ui_host.set_behavior(command.ui);
                        billing.set_decision(command.decision).await;
                        bridge.launch_purchase(&params).await;
                    }
                    Operation::TerminatePurchase => bridge.terminate_purchase(&params).await,
                }
            }
            Err(e) => tracing::warn!(error = %e, "Error reading command"),
        }

        for message in receiver.drain() {
            writeln!(out, "{} {}", message.method, message.payload).into_diagnostic()?;
        }
    }

    Ok(())
}
