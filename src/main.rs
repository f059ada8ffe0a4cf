//! Pool Monitor
//!
//! Main entry point: watch one liquidity pool for one named event and print
//! every decoded occurrence as it arrives.
//!
//! Architecture:
//! - Config from .env (dotenv + environment) or TOML, CLI flags on top
//! - Schema: --abi / POOL_ABI_FILE, else the built-in Uniswap V3 pool ABI
//! - monitor_with_reconnect(): schema → event → WS dial → eth_subscribe(logs) → decode loop
//! - SIGINT/SIGTERM raise the cancel token; the run drains and returns
//! - Transport drop or failed re-dial → reconnect after a fixed delay, up to MAX_RECONNECTS
//! - Setup errors (bad schema, unknown event, first dial/subscribe failure) exit
//!
//! Created: 2026-10-18

use alloy::primitives::Address;
use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use futures::StreamExt;
use pool_monitor::config::{load_config_from_file, ConfigOverrides, MonitorConfig};
use pool_monitor::contracts::UNISWAP_V3_POOL_ABI;
use pool_monitor::pipeline::{monitor_with_reconnect, PipelineStats, ReconnectPolicy};
use pool_monitor::subscription::WsTransport;
use pool_monitor::types::DecodedEvent;
use pool_monitor::{CancelToken, RecordError};
use serde_json::json;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook_tokio::Signals;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Live event monitor for a single liquidity pool
#[derive(Parser)]
#[command(name = "pool-monitor")]
struct Args {
    /// .env-style file to load settings from
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// TOML config file (replaces the .env lookup)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Pool contract address
    #[arg(short, long)]
    pool: Option<Address>,

    /// Event to decode (e.g. Swap, Mint, Burn)
    #[arg(short, long)]
    event: Option<String>,

    /// JSON ABI file (plain array or artifact with an "abi" key)
    #[arg(long)]
    abi: Option<PathBuf>,

    /// Print one JSON object per event
    #[arg(long)]
    json: bool,

    /// Emit logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_json);

    let config = load(&args)?;
    info!(
        "Pool monitor starting | pool={:?} | event={} | capacity={}",
        config.pool_address, config.event_name, config.channel_capacity
    );

    let schema_text = match config.read_abi()? {
        Some(text) => {
            info!("Schema loaded from {:?}", config.abi_file);
            text
        }
        None => {
            info!("Using built-in Uniswap V3 pool ABI");
            UNISWAP_V3_POOL_ABI.to_string()
        }
    };

    let cancel = CancelToken::new();
    let mut signals = Signals::new([SIGINT, SIGTERM]).context("Failed to install signal handler")?;
    let handle = signals.handle();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if let Some(sig) = signals.next().await {
            info!("Received signal {} - shutting down", sig);
            signal_cancel.cancel();
        }
    });

    let result = monitor(&config, &schema_text, args.json, &cancel).await;
    handle.close();

    match result {
        Ok(total) => {
            info!(
                "Pool monitor stopped | received={} decoded={} failed={}",
                total.received, total.decoded, total.failed
            );
            Ok(())
        }
        Err(e) => {
            error!("Pool monitor exiting: {:#}", e);
            Err(e)
        }
    }
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Config file or .env, then CLI overrides
fn load(args: &Args) -> Result<MonitorConfig> {
    let overrides = ConfigOverrides {
        pool_address: args.pool,
        event_name: args.event.clone(),
        abi_file: args.abi.clone(),
    };

    match &args.config {
        Some(path) => {
            let mut config = MonitorConfig::from_toml_file(path)?;
            config.apply(&overrides);
            info!("Configuration loaded from {}", path.display());
            Ok(config)
        }
        None => {
            let config = load_config_from_file(&args.env_file, &overrides)?;
            info!("Configuration loaded from {} + environment", args.env_file);
            Ok(config)
        }
    }
}

/// Run sessions until cancel, a setup error, or reconnects run out
async fn monitor(
    config: &MonitorConfig,
    schema_text: &str,
    json_output: bool,
    cancel: &CancelToken,
) -> Result<PipelineStats> {
    let transport = WsTransport::with_capacity(config.channel_capacity);
    let policy = ReconnectPolicy {
        max_reconnects: config.max_reconnects,
        delay: Duration::from_secs(config.reconnect_delay_secs),
    };

    monitor_with_reconnect(
        &transport,
        &config.rpc_url,
        config.pool_address,
        schema_text,
        &config.event_name,
        |event| print_event(&event, json_output),
        |err| print_record_error(&err, json_output),
        cancel,
        policy,
    )
    .await
    .context("Monitoring failed")
}

fn print_event(event: &DecodedEvent, json_output: bool) {
    if json_output {
        let line = json!({
            "time": Utc::now().to_rfc3339(),
            "decoded": event.to_json(),
        });
        println!("{}", line);
    } else {
        println!("[{}] {}", Utc::now().format("%H:%M:%S"), event);
    }
}

fn print_record_error(err: &RecordError, json_output: bool) {
    if json_output {
        let line = json!({
            "time": Utc::now().to_rfc3339(),
            "error": err.source.to_string(),
            "event": err.event,
            "block_number": err.provenance.block_number,
            "log_index": err.provenance.log_index,
        });
        println!("{}", line);
    }
}
