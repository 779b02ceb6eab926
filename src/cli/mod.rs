use anyhow::Result;

use crate::capture::{
    select_strategy, CaptureBackend, CaptureSettings, CaptureStrategy, ScriptBackend,
    TtyrecBackend,
};
use crate::config::Config;

pub mod args;
pub mod convert;
pub mod record;
pub mod saved;

pub use args::{Cli, CliCommand, ConvertCliArgs, RecordCliArgs, StrategyArg, UploadCliArgs};
pub use convert::handle_convert_command;
pub use record::{handle_record_command, handle_upload_command};

/// Handle `ttycast probe`.
pub fn handle_probe_command() -> Result<()> {
    let config = Config::load()?;
    let settings = CaptureSettings::from_config(&config.capture);

    let primary = ScriptBackend::new(settings.primary_utility.clone());
    println!(
        "{:<8} {} ({})",
        primary.name(),
        settings.primary_utility.display(),
        availability(primary.is_available())
    );

    match settings.resolve_fallback() {
        Ok(path) => {
            let fallback = TtyrecBackend::new(path.clone());
            println!(
                "{:<8} {} ({})",
                fallback.name(),
                path.display(),
                availability(fallback.is_available())
            );
        }
        Err(err) => println!("{:<8} {}", "ttyrec", err),
    }

    let strategy = select_strategy(&settings);
    let chosen = match strategy {
        CaptureStrategy::Primary => "script",
        CaptureStrategy::Fallback => "ttyrec",
    };
    println!("strategy: {} ({})", strategy.as_str(), chosen);
    Ok(())
}

fn availability(found: bool) -> &'static str {
    if found {
        "found"
    } else {
        "missing"
    }
}
