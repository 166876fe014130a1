use clap::Parser;

pub mod global;
pub mod root_commands;

pub use global::{GlobalFlags, OutputFormat};
pub use root_commands::Commands;

/// Top-level CLI parser for the `sift` binary.
#[derive(Debug, Parser)]
#[command(name = "sift", version, about = "Sift - evidence intake and adjudicated screening")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format: json, table
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Cli {
    #[must_use]
    pub const fn global_flags(&self) -> GlobalFlags {
        GlobalFlags {
            format: self.format,
            quiet: self.quiet,
            verbose: self.verbose,
        }
    }
}
