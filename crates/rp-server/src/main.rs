use clap::Parser;
use rp_config::ServerConfig;

#[cfg(feature = "jemalloc")]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[cfg(all(feature = "mimalloc", not(feature = "jemalloc")))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Concurrent ordered-set / blocking-queue engine with a line shell.
#[derive(Debug, Parser)]
#[command(name = "rockpool", version)]
struct Cli {
    /// Log filter directive (tracing EnvFilter syntax), overrides
    /// ROCKPOOL_LOG.
    #[arg(long)]
    log: Option<String>,

    /// Suppress the interactive prompt (useful when piping scripts in).
    #[arg(long)]
    no_prompt: bool,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let cli = Cli::parse();
    let mut config = ServerConfig::from_env();
    if let Some(log) = cli.log {
        config.log_filter = log;
    }
    if cli.no_prompt {
        config.prompt = false;
    }
    rp_server::init_tracing(&config.log_filter);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "rockpool starting");
    rp_server::run(&config).await
}
