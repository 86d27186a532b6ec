//! IPC server for the ELIZA script engine
//!
//! Runs one conversation as a subprocess, reading JSON requests from stdin
//! (one per line) and writing JSON responses to stdout (one per line). Logs go
//! to stderr and are filtered with `RUST_LOG`.
//!
//! ## Usage
//!
//! ```bash
//! cargo build --features ipc --bin eliza-ipc
//! ELIZA_SCRIPT=scripts/doctor.txt ELIZA_SEED=7 ./eliza-ipc
//! ```
//!
//! ### Example Request
//! ```json
//! {"id": 1, "method": "respond", "params": {"input": "Hello"}}
//! ```
//!
//! ### Example Response
//! ```json
//! {"id": 1, "result": {"response": "How do you do. Please state your problem.", "quit": false}}
//! ```

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use eliza_script_engine::interop::{handle_ipc_request, IpcRequest, IpcResponse, IpcSession};
use eliza_script_engine::{Eliza, ElizaConfig};
use tracing::{error, info};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ElizaConfig::from_env();
    let eliza = Eliza::with_config(config).context("failed to load script")?;
    let mut session = IpcSession::new(eliza);
    info!("eliza-ipc started, waiting for requests");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                error!(error = %e, "failed to read input");
                continue;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<IpcRequest>(&line) {
            Ok(request) => handle_ipc_request(&mut session, &request),
            Err(e) => IpcResponse::error(0, format!("Invalid JSON: {}", e)),
        };

        let output = serde_json::to_string(&response).context("failed to serialize response")?;
        writeln!(stdout, "{}", output)?;
        stdout.flush()?;
    }

    info!("eliza-ipc shutting down");
    Ok(())
}
