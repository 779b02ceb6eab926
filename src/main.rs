use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use ttycast::cli::{
    handle_convert_command, handle_probe_command, handle_record_command, handle_upload_command,
    Cli, CliCommand, RecordCliArgs,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(CliCommand::Version) => {
            println!("ttycast {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(CliCommand::Probe) => handle_probe_command(),
        Some(CliCommand::Convert(args)) => handle_convert_command(args),
        Some(CliCommand::Upload(args)) => handle_upload_command(args).await,
        Some(CliCommand::Record(args)) => handle_record_command(args).await,
        None => handle_record_command(RecordCliArgs::default()).await,
    }
}
