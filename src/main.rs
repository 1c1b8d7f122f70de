use clap::Parser;
use tasky::cli::commands::Cli;
use tasky::cli::handlers;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter (e.g. `debug`, `tasky=trace`)
const LOG_ENV: &str = "TASKY_LOG";

fn main() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    if let Err(e) = handlers::dispatch(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
