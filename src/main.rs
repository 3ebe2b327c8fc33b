use std::process::ExitCode;

use clap::Parser;

use deluxe_draw::cli::{self, CliArgs};
use deluxe_draw::logger;
use deluxe_draw::settings::Settings;

fn main() -> ExitCode {
    let args = CliArgs::parse();

    logger::init(if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    });

    let settings = Settings::load();
    log::debug!("settings: {:?}", settings);
    if Settings::settings_path().is_some_and(|p| !p.exists())
        && let Err(e) = settings.save()
    {
        log::warn!("Could not write default settings: {}", e);
    }

    cli::run(args, &settings)
}
