use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::error::{parse_id, Result};
use crate::scan::source::NamePolicy;

#[derive(Parser)]
#[command(name = "blackbox")]
#[command(about = "Archives network device configs and tracks their versions")]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to ~/.config/blackbox/config.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Show debug logging
    #[arg(long, short = 'v', global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(flatten)]
    pub paths: PathArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Wait for the ledger, then scan on a fixed interval until interrupted
    Run(RunArgs),

    /// Run a single scan cycle
    Scan(ScanArgs),

    /// List devices, or show one device
    Devices(DevicesArgs),

    /// List recorded versions
    Versions(VersionsArgs),

    /// Print the archived content of a version
    Show(ShowArgs),

    /// Compare two versions line by line
    Diff(DiffArgs),
}

impl Command {
    /// Reject malformed ids before anything opens the ledger.
    pub fn check_ids(&self) -> Result<()> {
        match self {
            Command::Devices(DevicesArgs { id: Some(id), .. }) => parse_id("device id", id).map(drop),
            Command::Versions(VersionsArgs { device: Some(id), .. }) => parse_id("device id", id).map(drop),
            Command::Show(args) => parse_id("version id", &args.id).map(drop),
            Command::Diff(args) => {
                parse_id("version id", &args.from)?;
                parse_id("version id", &args.to).map(drop)
            }
            _ => Ok(()),
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct PathArgs {
    /// Directory holding the device config files
    #[arg(long, global = true)]
    pub source_dir: Option<PathBuf>,

    /// Root of the archive tree
    #[arg(long, global = true)]
    pub archive_dir: Option<PathBuf>,

    /// SQLite ledger file
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    /// Only files whose names end with this are scanned
    #[arg(long, global = true)]
    pub suffix: Option<String>,

    /// How file names map to device names
    #[arg(long, global = true, value_enum)]
    pub name_policy: Option<NamePolicy>,
}

#[derive(Parser)]
pub struct RunArgs {
    /// Time between scan cycles, e.g. "30s" or "5m"
    #[arg(long)]
    pub interval: Option<String>,
}

#[derive(Parser)]
pub struct ScanArgs {
    /// Output as JSON instead of a summary
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Parser)]
pub struct DevicesArgs {
    /// Show a specific device by ID
    #[arg(long)]
    pub id: Option<String>,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Parser)]
pub struct VersionsArgs {
    /// Only versions of this device ID
    #[arg(long)]
    pub device: Option<String>,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Parser)]
pub struct ShowArgs {
    /// Version ID
    pub id: String,
}

#[derive(Parser)]
pub struct DiffArgs {
    /// Older version ID (left side)
    pub from: String,

    /// Newer version ID (right side)
    pub to: String,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}
