//! partinfo - look up electronic parts across distributors from the command line.
//!
//! Builds the lookup engine from the user's configuration, submits one query,
//! and prints the result as JSON on stdout. Logs go to stderr.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use partinfo_core::{AppConfig, Mpn, RequestedFields, Sku};
use partinfo_engine::PartInfo;
use tracing::{debug, info};

/// Command-line arguments for partinfo
#[derive(Parser, Debug)]
#[command(name = "partinfo")]
#[command(about = "Look up electronic parts and their offers across distributors")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to the per-user config location)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Only show offers from these vendors (comma separated)
    #[arg(long = "from", global = true, value_delimiter = ',')]
    from: Vec<String>,

    /// Only show prices in these currencies (comma separated)
    #[arg(long, global = true, value_delimiter = ',')]
    currency: Vec<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Free-text search
    Search {
        /// Search term; multiple words are joined with spaces
        #[arg(required = true)]
        term: Vec<String>,
    },
    /// Exact lookup by manufacturer part number or vendor SKU
    Part {
        /// Manufacturer name
        #[arg(long, requires = "part")]
        manufacturer: Option<String>,

        /// Manufacturer part number
        #[arg(long, requires = "manufacturer")]
        part: Option<String>,

        /// Vendor name, e.g. Digikey or Farnell
        #[arg(long, requires = "sku")]
        vendor: Option<String>,

        /// Vendor part number
        #[arg(long, requires = "vendor")]
        sku: Option<String>,
    },
}

impl Cli {
    fn requested_fields(&self) -> RequestedFields {
        let fields = if self.from.is_empty() {
            RequestedFields::default()
        } else {
            RequestedFields::from_retailers(self.from.iter().map(String::as_str))
        };
        if self.currency.is_empty() {
            fields
        } else {
            fields.with_currencies(self.currency.iter().map(|c| c.to_uppercase()))
        }
    }

    fn load_config(&self) -> Result<AppConfig> {
        let config = match &self.config {
            Some(path) => {
                let mut config = AppConfig::load_from(path)
                    .with_context(|| format!("Failed to load config from {}", path.display()))?;
                config.apply_env();
                config
            }
            None => AppConfig::load_with_env().context("Failed to load config")?,
        };
        Ok(config)
    }
}

/// Initialize tracing subscriber for logging
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,partinfo=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    debug!(?cli, "Parsed arguments");

    let config = cli.load_config()?;
    let fields = cli.requested_fields();
    let engine = PartInfo::from_config(&config).context("Failed to start lookup engine")?;

    let output = match cli.command {
        Command::Search { term } => {
            let term = term.join(" ");
            let parts = engine.search(&term, fields).await?;
            info!(term = %term, results = parts.len(), "Search complete");
            serde_json::to_string_pretty(&parts)?
        }
        Command::Part {
            manufacturer,
            part,
            vendor,
            sku,
        } => {
            let mpn = manufacturer.zip(part).map(|(m, p)| Mpn::new(m, p));
            let sku = vendor.zip(sku).map(|(v, s)| Sku::new(v, s));
            let found = engine.part(mpn, sku, fields).await?;
            if found.is_none() {
                info!("No matching part");
            }
            serde_json::to_string_pretty(&found)?
        }
    };

    println!("{output}");
    Ok(())
}
