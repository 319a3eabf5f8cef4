//! fwflash - Firmware flashing tool for mgb4 grabber cards
//!
//! Validates an mgb4 firmware image and programs it into the firmware
//! partition of a card exposed through Linux MTD. Cards are identified by the
//! serial number stored in their data partition.

mod cli;
mod commands;

use clap::Parser;
use cli::Cli;
use fwflash_linux_mtd::{LinuxMtd, LinuxMtdConfig};

fn main() {
    let cli = Cli::parse();

    // Initialize logger, verbosity overrides RUST_LOG
    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    match cli.verbose {
        0 => {} // default (info)
        1 => {
            logger.filter_level(log::LevelFilter::Debug);
        }
        _ => {
            logger.filter_level(log::LevelFilter::Trace);
        }
    }
    logger.init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = &cli.info {
        return commands::run_info(path);
    }

    let mtd = LinuxMtd::open(LinuxMtdConfig {
        sysfs_root: cli.sysfs_root,
        dev_root: cli.dev_root,
    })?;

    if cli.list {
        return commands::run_list(&mtd);
    }

    match &cli.file {
        Some(input) => commands::run_flash(&mtd, input, cli.serial, cli.verify),
        None => Err("No firmware file specified".into()),
    }
}
