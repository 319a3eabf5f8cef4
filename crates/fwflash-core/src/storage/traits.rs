//! Storage device trait definitions

use core::ops::RangeInclusive;

use crate::error::Result;

/// Partition metadata as reported by the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionInfo {
    /// Partition index (N in /dev/mtdN)
    pub index: u32,
    /// Partition name
    pub name: String,
    /// Total size in bytes
    pub size: u64,
    /// Erase block size in bytes
    pub erase_size: u32,
    /// Number of erase blocks
    pub erase_count: u32,
}

/// How a partition is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Read-only
    Read,
    /// Write-only (erase and program)
    Write,
    /// Read and write
    ReadWrite,
}

impl AccessMode {
    /// Whether the mode allows reading
    pub fn can_read(self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    /// Whether the mode allows erasing and writing
    pub fn can_write(self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }
}

/// A partitioned, block-erasable storage device
///
/// Partitions are identified by a small integer index. The device reports
/// the range of valid indices; every index within that range is expected
/// to exist.
pub trait StorageDevice {
    /// Handle to an open partition, closed when dropped
    type Partition: Partition;

    /// Range of partition indices present on the device
    ///
    /// An empty range means the device has no partitions.
    fn partition_range(&self) -> Result<RangeInclusive<u32>>;

    /// Metadata of partition `index`
    fn partition_info(&self, index: u32) -> Result<PartitionInfo>;

    /// Open partition `index` for exclusive access
    fn open(&self, index: u32, mode: AccessMode) -> Result<Self::Partition>;
}

/// An open partition
pub trait Partition {
    /// Path of the partition, used in messages
    fn path(&self) -> &str;

    /// Read `buf.len()` bytes starting at byte `offset`
    fn read(&mut self, offset: u64, buf: &mut [u8]) -> Result<()>;

    /// Erase `count` erase blocks starting at erase block `first_block`
    fn erase(&mut self, first_block: u32, count: u32) -> Result<()>;

    /// Write `data` at the start of erase block `block`
    ///
    /// `data` must not be longer than one erase block and the block must
    /// have been erased.
    fn write(&mut self, block: u32, data: &[u8]) -> Result<()>;
}
