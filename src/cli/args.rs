use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::capture::CaptureStrategy;

#[derive(Parser, Debug)]
#[command(name = "ttycast")]
#[command(about = "Record a terminal session and share it", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Record a session and upload it (the default)
    Record(RecordCliArgs),
    /// Upload a previously saved script/timing pair
    Upload(UploadCliArgs),
    /// Convert a ttyrec file into script/timing files
    Convert(ConvertCliArgs),
    /// Show which capture mechanism this machine would use
    Probe,
    /// Print version information
    Version,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StrategyArg {
    /// Probe `script` and fall back to ttyrec if it misbehaves
    #[default]
    Auto,
    /// Always use `script`
    Primary,
    /// Always use ttyrec
    Fallback,
}

impl StrategyArg {
    pub fn forced(self) -> Option<CaptureStrategy> {
        match self {
            StrategyArg::Auto => None,
            StrategyArg::Primary => Some(CaptureStrategy::Primary),
            StrategyArg::Fallback => Some(CaptureStrategy::Fallback),
        }
    }
}

#[derive(ClapArgs, Debug, Default)]
pub struct RecordCliArgs {
    /// Capture mechanism to use
    #[arg(long, value_enum, default_value_t = StrategyArg::Auto)]
    pub strategy: StrategyArg,
    /// Keep the recording locally instead of uploading it
    #[arg(long)]
    pub no_upload: bool,
    /// Also write the recording to PREFIX.script and PREFIX.timing
    #[arg(short, long, value_name = "PREFIX")]
    pub output: Option<PathBuf>,
    /// Command to record (defaults to your shell)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

#[derive(ClapArgs, Debug)]
pub struct UploadCliArgs {
    /// Script file written by `record --output` or a failed upload
    pub script: PathBuf,
    /// Matching timing file
    pub timing: PathBuf,
    /// Terminal width to report (defaults to the current terminal)
    #[arg(long)]
    pub cols: Option<u16>,
    /// Terminal height to report (defaults to the current terminal)
    #[arg(long)]
    pub rows: Option<u16>,
}

#[derive(ClapArgs, Debug)]
pub struct ConvertCliArgs {
    /// ttyrec recording to read
    pub input: PathBuf,
    /// Where to write the script stream
    pub script: PathBuf,
    /// Where to write the timing stream
    pub timing: PathBuf,
}
