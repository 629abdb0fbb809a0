use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Default)]
#[command(name = "stickies")]
#[command(about = "Sticky notes for the terminal")]
#[command(version)]
/// Command-line arguments.
pub struct Cli {
    /// Print the config file path and exit
    #[arg(short = 'c', long)]
    pub config: bool,

    /// Print the data directory and exit
    #[arg(short = 'd', long)]
    pub dir: bool,

    /// Use this data directory instead of the configured one
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Write every note to a JSON export file and exit
    #[arg(long, value_name = "FILE", conflicts_with = "import")]
    pub export: Option<PathBuf>,

    /// Import notes from a JSON export file and exit
    #[arg(long, value_name = "FILE")]
    pub import: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// True when the invocation only prints or transfers data and never
    /// starts the terminal UI.
    pub fn is_batch(&self) -> bool {
        self.config || self.dir || self.export.is_some() || self.import.is_some()
    }
}
