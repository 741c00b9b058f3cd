use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mailscout_lib::{DiscoveryMethod, ValidationLevel};

#[derive(Parser)]
#[command(name = "mailscout-cli", version, about = "Find and validate e-mail addresses")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Commands,

    /// TOML settings file; MAILSCOUT_* variables override it
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// format: human|json|ndjson|csv
    #[arg(long, global = true, default_value = "human")]
    pub format: String,

    /// write report to file (JSON/NDJSON/CSV per --format)
    #[arg(long, global = true)]
    pub out: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate one or more addresses
    Validate {
        /// level: basic|advanced
        #[arg(long, default_value = "advanced")]
        level: ValidationLevel,
        /// read addresses from stdin (one per line)
        #[arg(long)]
        stdin: bool,
        /// only print the verdict, not the per-stage results
        #[arg(long)]
        summary: bool,
        emails: Vec<String>,
    },
    /// Discover candidate addresses for a domain
    Discover {
        /// method: scraping|patterns|third_party (repeatable)
        #[arg(long = "method")]
        methods: Vec<DiscoveryMethod>,
        /// omit the page each address was found on
        #[arg(long)]
        no_detail: bool,
        domain: String,
    },
    /// List discovery providers and whether they are usable
    Providers,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
