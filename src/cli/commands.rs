use clap::{Args, Parser, Subcommand};

use crate::config::{OutputFormat, Service};

#[derive(Parser)]
#[command(name = "tenant-posture", version, about = "Microsoft 365 tenant security posture and licensing advisor")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Collect tenant posture and emit advisories
    Collect(CollectArgs),
    /// Validate a configuration file
    Validate(ValidateArgs),
}

#[derive(Args, Clone)]
pub struct CollectArgs {
    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Tenant id or verified domain (overrides config and TENANT_ID)
    #[arg(long)]
    pub tenant_id: Option<String>,

    /// Comma-separated services to collect
    #[arg(long, value_enum, value_delimiter = ',')]
    pub services: Option<Vec<Service>>,

    /// Delegated Defender API data: inline JSON or a path to a JSON file
    #[arg(long)]
    pub defender_data: Option<String>,

    /// Write the report to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<String>,

    /// Report format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,
}

#[derive(Args, Clone)]
pub struct ValidateArgs {
    /// Config file to validate
    pub config: String,
}
