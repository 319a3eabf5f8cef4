//! fwflash-linux-mtd - Linux MTD (Memory Technology Device) storage backend
//!
//! The mgb4 driver exposes each card's flash as MTD partitions named
//! `mgb4-fw.N` and `mgb4-data.N`. This crate implements
//! [`fwflash_core::storage::StorageDevice`] on top of the Linux MTD
//! subsystem: partitions are discovered through sysfs and accessed through
//! their `/dev/mtdN` character devices.
//!
//! # Example
//!
//! ```ignore
//! use fwflash_core::flash;
//! use fwflash_linux_mtd::{LinuxMtd, LinuxMtdConfig};
//!
//! let mtd = LinuxMtd::open(LinuxMtdConfig::default())?;
//! for card in flash::build_catalog(&mtd)? {
//!     println!("{} ({})", card.serial, card.card_type);
//! }
//! ```
//!
//! # System Requirements
//!
//! - Linux kernel with MTD support (`CONFIG_MTD`) and the mgb4 driver
//! - Read/write access to `/dev/mtdN`
//! - May require root access or udev rules
//!
//! # Device Discovery
//!
//! ```bash
//! cat /proc/mtd
//! cat /sys/class/mtd/mtd0/name
//! cat /sys/class/mtd/mtd0/size
//! cat /sys/class/mtd/mtd0/erasesize
//! ```

pub mod device;
pub mod error;

// Re-exports
pub use device::{LinuxMtd, LinuxMtdConfig, MtdFlags, MtdInfo, MtdPartition};
pub use error::{LinuxMtdError, Result};
