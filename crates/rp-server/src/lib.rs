#![forbid(unsafe_code)]

//! Wiring for the `rockpool` binary: logging setup and the stdio shell.

use std::sync::Arc;

use rp_command::Executor;
use rp_config::ServerConfig;
use rp_store::KeySpace;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Diagnostics go to stderr so shell output
/// on stdout stays clean.
pub fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Build a fresh keyspace and drive the shell over stdio until end of
/// input.
pub async fn run(config: &ServerConfig) -> std::io::Result<()> {
    let executor = Executor::new(Arc::new(KeySpace::new()));
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    rp_repl::run(&executor, stdin, stdout, config.prompt).await
}
