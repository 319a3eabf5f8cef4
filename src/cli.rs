//! CLI argument parsing

use clap::{ArgAction, Parser};
use fwflash_core::serial::SerialNumber;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fwflash")]
#[command(author, version, about = "mgb4 card firmware flasher", long_about = None)]
#[command(disable_version_flag = true)]
pub struct Cli {
    /// Firmware image to flash
    #[arg(value_name = "FILE", required_unless_present_any = ["info", "list"])]
    pub file: Option<PathBuf>,

    /// Serial number of the card to flash (DDD-DDD-DDD-DDD)
    #[arg(short, long, value_name = "SN")]
    pub serial: Option<SerialNumber>,

    /// Print firmware image info and exit
    #[arg(short, long, value_name = "FILE", conflicts_with = "list")]
    pub info: Option<PathBuf>,

    /// List available cards and exit
    #[arg(short, long)]
    pub list: bool,

    /// Read back the firmware partition after writing and compare
    #[arg(long)]
    pub verify: bool,

    /// Verbosity level (--verbose, --verbose --verbose)
    #[arg(long, action = ArgAction::Count)]
    pub verbose: u8,

    /// MTD sysfs class directory
    #[arg(long, value_name = "DIR", default_value = fwflash_linux_mtd::device::MTD_SYSFS_ROOT)]
    pub sysfs_root: PathBuf,

    /// MTD device node directory
    #[arg(long, value_name = "DIR", default_value = fwflash_linux_mtd::device::DEV_ROOT)]
    pub dev_root: PathBuf,

    /// Print version
    #[arg(short = 'v', long, action = ArgAction::Version)]
    pub version: Option<bool>,
}
