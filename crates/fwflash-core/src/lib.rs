//! fwflash-core - Firmware flashing engine for mgb4 cards
//!
//! This crate contains everything needed to program a firmware image onto
//! an mgb4 card's flash, independent of how the flash is actually accessed:
//!
//! - [`checksum`] - CRC-32 used by the firmware file format
//! - [`image`] - firmware file reader and validator
//! - [`serial`] - card serial number codec
//! - [`card`] - card and interface types, partition naming and sizes
//! - [`storage`] - traits describing a partitioned, block-erasable device
//! - [`flash`] - partition catalog, card selection and programming
//!
//! The storage device is abstracted behind [`storage::StorageDevice`]. The
//! `fwflash-linux-mtd` crate implements it for Linux MTD; an in-memory
//! implementation lives in [`storage::memory`].
//!
//! # Example
//!
//! ```ignore
//! use fwflash_core::flash::{self, NoProgress};
//! use fwflash_core::image::FirmwareImage;
//!
//! let image = FirmwareImage::open("mgb4-fw.bin")?;
//! let catalog = flash::build_catalog(&device)?;
//! let index = flash::select(&catalog, None, image.card_type())?;
//! flash::program(&device, index, image.payload(), &mut NoProgress)?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod card;
pub mod checksum;
pub mod error;
pub mod flash;
pub mod image;
pub mod serial;
pub mod storage;

pub use error::{Error, Result};
