//! CLI arguments

use clap::Parser;
use std::path::PathBuf;

/// REST API extraction tap
#[derive(Parser, Debug, Clone)]
#[command(name = "tapkit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (JSON)
    #[arg(short, long)]
    pub config: PathBuf,

    /// State file (JSON); checkpoints are written back to it
    #[arg(short, long)]
    pub state: Option<PathBuf>,

    /// Catalog file (JSON)
    #[arg(long, visible_alias = "properties")]
    pub catalog: Option<PathBuf>,

    /// Print the discovered catalog instead of syncing
    #[arg(short, long)]
    pub discover: bool,

    /// Stream definitions (JSON or YAML) for discovery
    #[arg(long)]
    pub streams: Option<PathBuf>,

    /// Config keys that must be present besides base_url and start_date
    #[arg(long, value_delimiter = ',')]
    pub required: Vec<String>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}
