//! Error types for Linux MTD operations

use std::io;
use thiserror::Error;

/// Linux MTD-specific errors
#[derive(Debug, Error)]
pub enum LinuxMtdError {
    /// MTD subsystem not available
    #[error("MTD not present ({0} does not exist)")]
    NotPresent(String),

    /// Failed to list the MTD sysfs class directory
    #[error("Failed to list MTD devices in '{path}': {source}")]
    ListFailed {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Failed to read sysfs attribute
    #[error("Failed to read sysfs attribute '{path}': {source}")]
    SysfsRead {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Failed to parse sysfs attribute
    #[error("Failed to parse sysfs attribute '{path}': {value}")]
    SysfsParse { path: String, value: String },

    /// Failed to open the device node
    #[error("Error opening {path}: {source}")]
    OpenFailed {
        path: String,
        #[source]
        source: io::Error,
    },

    /// MTD erase size is not a power of 2
    #[error("MTD erase size is not a power of 2: {0}")]
    InvalidEraseSize(u64),

    /// Non-uniform erase regions are not supported
    #[error("MTD device has non-uniform erase regions (count: {0}), which is not supported")]
    NonUniformEraseRegions(u64),

    /// Device is not writable
    #[error("MTD device is not writable")]
    NotWritable,

    /// Address does not fit the 32-bit MTD erase interface
    #[error("Offset {0:#x} is beyond the 32-bit MTD address range")]
    OffsetOverflow(u64),

    /// Erase operation failed
    #[error("Erase operation failed at offset {offset:#x}: {source}")]
    EraseFailed {
        offset: u32,
        #[source]
        source: nix::errno::Errno,
    },

    /// Seek error
    #[error("Seek to offset {offset:#x} failed: {source}")]
    SeekFailed {
        offset: u64,
        #[source]
        source: io::Error,
    },

    /// Read error
    #[error("Read of {len} bytes at offset {offset:#x} failed: {source}")]
    ReadFailed {
        offset: u64,
        len: usize,
        #[source]
        source: io::Error,
    },

    /// Write error
    #[error("Write of {len} bytes to block #{block} failed: {source}")]
    WriteFailed {
        block: u32,
        len: usize,
        #[source]
        source: io::Error,
    },

    /// Write larger than one erase block
    #[error("Write of {len} bytes exceeds erase block size {erase_size}")]
    WriteTooLarge { len: usize, erase_size: u64 },
}

/// Result type for Linux MTD operations
pub type Result<T> = std::result::Result<T, LinuxMtdError>;
