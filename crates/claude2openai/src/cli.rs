//! Command-line interface.

use crate::config::ProxyConfig;
use clap::Parser;
use std::path::PathBuf;

/// Printed by `--version`.
pub fn version_banner() -> String {
    format!("Welcome to Claude2OpenAI v{}", env!("CARGO_PKG_VERSION"))
}

/// Serve the OpenAI chat completions API on top of Claude.
///
/// `--version` prints a banner and exits with status 1, which is what the
/// packaged service's smoke test checks for.
#[derive(Parser, Debug, Default)]
#[command(name = "claude2openai")]
#[command(about, long_about = None, disable_version_flag = true)]
pub struct Cli {
    /// Print the version banner and exit
    #[arg(long)]
    pub version: bool,

    /// YAML config file (default: <config dir>/claude2openai/config.yml if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Claude API base URL
    #[arg(long)]
    pub upstream_url: Option<String>,

    /// Append logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Flags win over the file and the environment.
    pub fn apply_overrides(&self, config: &mut ProxyConfig) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(url) = &self.upstream_url {
            config.upstream_base_url = url.clone();
        }
        if let Some(path) = &self.log_file {
            config.log_file = Some(path.clone());
        }
    }
}
