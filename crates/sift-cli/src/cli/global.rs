use clap::ValueEnum;
use sift_core::enums::Stage;

/// Output mode shared by every command.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
}

/// Screening stage as accepted on the command line.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum StageArg {
    TitleAbstract,
    FullText,
}

impl From<StageArg> for Stage {
    fn from(value: StageArg) -> Self {
        match value {
            StageArg::TitleAbstract => Self::TitleAbstract,
            StageArg::FullText => Self::FullText,
        }
    }
}

/// Global flags available before or after subcommands.
#[derive(Clone, Debug)]
pub struct GlobalFlags {
    pub format: OutputFormat,
    pub quiet: bool,
    pub verbose: bool,
}
