use std::process::ExitCode;

use clap::Parser;
use labelcam::cli::{self, Cli};

fn main() -> ExitCode {
    let args = Cli::parse();

    let config = match cli::load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let level = args.log_level.unwrap_or(config.preferences.log_level);
    cli::init_logging(level.to_level_filter());
    log::debug!("Log level: {}", level.name());

    let mut stdout = std::io::stdout().lock();
    match cli::run(args.command, &config, &mut stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
