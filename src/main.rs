//! Entry point for `exchange-client`.
//!
//! Parses CLI arguments, runs one stream-and-recover session against the
//! exchange server, and writes the completed packet set to disk.  All
//! protocol work is delegated to library modules; `main.rs` owns only
//! process setup (logging, argument parsing) and the final persistence step.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use exchange_client::{persist, ClientConfig, ExchangeClient};

/// Fetch the full exchange packet stream, recover any missing sequences, and
/// persist the ordered result as JSON.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Exchange server hostname.
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Exchange server port.
    #[arg(long, default_value_t = 3000)]
    port: u16,

    /// Output artifact path (overwritten if present).
    #[arg(long, default_value = "exchange_data.json")]
    out: PathBuf,

    /// Seconds with no inbound data before a session is treated as closed.
    #[arg(long, default_value_t = 30)]
    idle_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::init();

    let cli = Cli::parse();
    let config = ClientConfig {
        host: cli.host,
        port: cli.port,
        idle_timeout: Duration::from_secs(cli.idle_timeout_secs),
    };

    log::info!(
        "connecting to {}:{} (idle timeout {}s)",
        config.host,
        config.port,
        cli.idle_timeout_secs
    );

    let packets = ExchangeClient::new(config)
        .run()
        .await
        .context("exchange run failed")?;

    persist::save(&packets, &cli.out)
        .with_context(|| format!("writing artifact to {}", cli.out.display()))?;

    println!(
        "wrote {} packets to {}",
        packets.len(),
        cli.out.display()
    );
    Ok(())
}
