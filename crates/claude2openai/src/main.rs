//! `claude2openai` binary entrypoint.
//!
//! With no arguments this starts the server using the config file and
//! environment variables; this is how the packaged service runs it.

use anyhow::Result;
use clap::Parser;
use claude2openai::{cli::Cli, logging, serve, ProxyConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.version {
        eprintln!("{}", claude2openai::cli::version_banner());
        std::process::exit(1);
    }

    let mut config = ProxyConfig::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);
    logging::init(config.log_file.as_deref())?;

    serve(config).await
}
