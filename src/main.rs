use clap::Parser;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use autotrader::cli::{run, Cli};

fn debug_enabled() -> bool {
    std::env::var("DEBUG")
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn init_tracing() {
    let level = if debug_enabled() { Level::DEBUG } else { Level::INFO };
    // RUST_LOG overrides the DEBUG-derived default
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> std::process::ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();
    run(Cli::parse())
}
