//! Stdio MCP server exposing natural-language query tools for a Totara LMS
//! database.
#![deny(clippy::print_stdout, clippy::print_stderr)]

use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::io;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use std::sync::Arc;

use mcp_types::JSONRPCMessage;

mod backend;
pub mod config;
mod error_code;
mod format;
mod intent;
mod message_processor;
mod outgoing_message;
mod tool_config;
mod tools;
mod training;
mod validation;
mod vanna;

pub use crate::backend::BackendError;
pub use crate::backend::Row;
pub use crate::backend::SqlBackend;
pub use crate::backend::TrainingItem;
pub use crate::config::ServerConfig;
pub use crate::intent::UserReference;
pub use crate::intent::extract_user_reference;
pub use crate::message_processor::MessageProcessor;
pub use crate::outgoing_message::OutgoingMessage;
pub use crate::training::load_training_data;
pub use crate::validation::RejectReason;
pub use crate::validation::ValidationConfig;
pub use crate::validation::ValidationOutcome;
pub use crate::validation::validate;
pub use crate::vanna::VannaBackend;

pub async fn run_main() -> anyhow::Result<()> {
    // Install tracing subscriber. Diagnostics go to stderr; stdout belongs
    // to the protocol.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = ServerConfig::from_env()?;
    let validation = ValidationConfig::new()?;

    // Backend init and database connectivity are fatal; there is no
    // partial-availability mode.
    let backend = Arc::new(VannaBackend::connect(&config).await?);
    info!("SUCCESS: database connected");

    match load_training_data(backend.as_ref(), config.search.as_ref()).await {
        Ok(count) => info!("SUCCESS: training loaded ({count} items)"),
        Err(e) => warn!("training data load failed: {e}"),
    }

    let processor = MessageProcessor::new(backend, validation);

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            shutdown_signal().await;
            info!("shutdown signal received");
            cancel.cancel();
        }
    });

    info!("MCP_SERVER_READY");
    serve(BufReader::new(io::stdin()), io::stdout(), processor, cancel).await
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::SignalKind;
    use tokio::signal::unix::signal;

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            error!("failed to install SIGTERM handler: {e}");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

/// The protocol loop. Strictly serial: the next line is not read until the
/// previous response has been written and flushed, so cancellation is only
/// observed at the read boundary and an in-flight response always lands
/// intact. Unparseable lines are logged and dropped without a response;
/// each successfully parsed request produces exactly one output line.
pub async fn serve<R, W>(
    reader: R,
    mut writer: W,
    mut processor: MessageProcessor,
    cancel: CancellationToken,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    loop {
        let line = tokio::select! {
            () = cancel.cancelled() => {
                info!("cancellation observed, stopping read loop");
                break;
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            debug!("input stream closed (EOF)");
            break;
        };

        let message = match serde_json::from_str::<JSONRPCMessage>(&line) {
            Ok(message) => message,
            Err(e) => {
                warn!("failed to deserialize JSON-RPC message: {e}");
                continue;
            }
        };

        let Some(outgoing) = processor.process_message(message).await else {
            continue;
        };

        let json = match serde_json::to_string(&JSONRPCMessage::from(outgoing)) {
            Ok(json) => json,
            Err(e) => {
                error!("failed to serialize JSON-RPC message: {e}");
                continue;
            }
        };
        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }

    Ok(())
}
