mod cli;
mod execute;

use tracing_subscriber::EnvFilter;
use crate::cli::CLI;
use anyhow::Result;

/// Log filter variable; logs go to stderr so Composer keeps stdout.
const LOG_ENV: &str = "COMPOSERW_LOG";

fn main() -> Result<()>{
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    let cli = CLI::parse_forwarded();
    let code = execute::execute(cli)?;
    std::process::exit(code)
}
