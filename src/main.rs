mod cli;
mod engine;
mod flatten;
mod metrics;
mod model;
mod orchestrator;
mod source;
mod text_summary;
#[cfg(feature = "tui")]
mod tui;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_headless = args.is_headless();
    cli::init_tracing(&args)?;

    match cli::run(args).await {
        Ok(()) => {
            // Explicitly exit with code 0 on success, especially for headless modes
            if is_headless {
                std::process::exit(0);
            }
            Ok(())
        }
        Err(e) => {
            tracing::debug!("exiting with error: {e:#}");
            Err(e)
        }
    }
}
