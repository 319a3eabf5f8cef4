//! Storage device abstraction
//!
//! The flashing engine only needs a handful of operations from the device
//! holding the card flash: enumerate partitions, query their geometry, and
//! read, erase and write them. [`StorageDevice`] and [`Partition`] capture
//! exactly that, so the engine runs unchanged on Linux MTD and on the
//! in-memory [`MemoryStorage`].

pub mod memory;
mod traits;

pub use memory::{MemoryOp, MemoryStorage};
pub use traits::{AccessMode, Partition, PartitionInfo, StorageDevice};
