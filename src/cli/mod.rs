//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "talon",
    version,
    author = "neur0map",
    about = "OSINT enrichment transforms for investigation graphs",
    long_about = "Talon normalizes loosely-typed observations (IPs, domains, ASNs, usernames) \
                  into typed entities, runs them through container-backed reconnaissance tools, \
                  and correlates the raw output back into validated entities."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/talon/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage external reconnaissance tools
    Tools {
        #[command(subcommand)]
        action: ToolsAction,
    },

    /// Print a transform's input/output schema
    Schema {
        /// Transform name (e.g. "domain_subdomains")
        transform: String,

        /// Show the output schema instead of the input schema
        #[arg(long)]
        output: bool,
    },

    /// Run one transform against a set of raw targets
    Run {
        /// Transform name (e.g. "ip_to_asn")
        transform: String,

        /// Raw targets; strings are coerced into the identifying field
        #[arg(short, long, required = true, num_args = 1..)]
        target: Vec<String>,

        /// Sketch identifier for attribution
        #[arg(long, default_value = "adhoc")]
        sketch: String,

        /// Scan identifier (defaults to a fresh UUID)
        #[arg(long)]
        scan: Option<String>,

        /// Per-launch timeout in seconds (overrides config)
        #[arg(long)]
        timeout: Option<u64>,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[derive(Subcommand, Debug)]
pub enum ToolsAction {
    /// List available tool adapters with install state
    List,

    /// Pull a tool's image (no-op if already present)
    Install {
        /// Tool name (e.g. "subfinder")
        name: String,
    },

    /// Print a tool's version
    Version {
        /// Tool name (e.g. "subfinder")
        name: String,
    },
}
