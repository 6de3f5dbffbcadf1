#![deny(clippy::all)]
#![deny(clippy::pedantic)]

use clap::Parser;
use log::LevelFilter;

use tether::cli::Cli;
use tether::command::run_command;

fn main() {
    let cli = Cli::parse();

    env_logger::builder()
        .filter_level(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        })
        .init();

    if let Err(e) = run_command(&cli) {
        eprintln!("Failed with error: {e:#}");
        std::process::exit(1);
    }
}
