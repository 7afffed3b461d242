//! TxnScope Notifier
//!
//! Reads `tx <hex>` and `block <hex>` lines from stdin, as a node would emit
//! them, and republishes them on the ZeroMQ endpoints configured through
//! `TXNSCOPE_ZMQ_*` environment variables (or a JSON file passed as the first
//! argument).

use std::io::BufRead;
use std::process::ExitCode;

use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use txnscope_notifier::node::{self, decode_block, decode_transaction, hex_to_bytes, NodeEvent, NodeEventSender};
use txnscope_notifier::{NotifierConfig, Publisher};

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
}

/// Parse one input line into a node event
fn parse_line(line: &str) -> Result<Option<NodeEvent>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (kind, payload) = line
        .split_once(char::is_whitespace)
        .ok_or_else(|| format!("expected '<tx|block> <hex>', got '{}'", line))?;
    let raw = hex_to_bytes(payload).map_err(|e| e.to_string())?;

    match kind {
        "tx" => Ok(Some(NodeEvent::transaction(
            decode_transaction(&raw).map_err(|e| e.to_string())?,
        ))),
        "block" => Ok(Some(NodeEvent::block(
            decode_block(&raw).map_err(|e| e.to_string())?,
        ))),
        other => Err(format!("unknown event kind '{}'", other)),
    }
}

/// Forward parsed lines to the node event channel until EOF
///
/// Runs on a plain thread: a blocked stdin read cannot be cancelled and must
/// not hold up runtime shutdown.
///
/// # Returns
/// The number of events forwarded
fn feed_lines(reader: impl BufRead, sender: &NodeEventSender) -> usize {
    let mut forwarded = 0;
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                break;
            }
        };

        match parse_line(&line) {
            Ok(Some(event)) => {
                if sender.blocking_send(event).is_err() {
                    debug!("Publisher gone, stopping input");
                    break;
                }
                forwarded += 1;
            }
            Ok(None) => {}
            Err(e) => warn!("Skipping input line: {}", e),
        }
    }
    forwarded
}

/// Start the input thread. It is never joined, so a read still blocked at
/// shutdown ends with the process.
fn spawn_feeder(
    reader: impl BufRead + Send + 'static,
    sender: NodeEventSender,
) -> std::io::Result<()> {
    std::thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || feed_lines(reader, &sender))?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let config = match std::env::args().nth(1) {
        Some(path) => NotifierConfig::from_json_file(&path),
        None => NotifierConfig::from_env(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match config.to_json() {
        Ok(json) => info!(config = %json, "Loaded configuration"),
        Err(e) => warn!("Failed to render configuration: {}", e),
    }

    let (sender, events) = node::channel();
    let mut publisher = match Publisher::builder(config).events(events).build() {
        Ok(publisher) => publisher,
        Err(e) => {
            error!("Failed to set up publisher: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = publisher.open().await {
        error!("Failed to open publisher: {}", e);
        return ExitCode::FAILURE;
    }

    if let Err(e) = spawn_feeder(std::io::BufReader::new(std::io::stdin()), sender) {
        error!("Failed to start input thread: {}", e);
        let _ = publisher.close().await;
        return ExitCode::FAILURE;
    }

    let mut code = ExitCode::SUCCESS;
    tokio::select! {
        result = publisher.run() => {
            if let Err(e) = result {
                error!("Publisher stopped: {}", e);
                code = ExitCode::FAILURE;
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl-C, shutting down");
        }
    }

    if let Err(e) = publisher.close().await {
        error!("Failed to close publisher cleanly: {}", e);
    }

    code
}
