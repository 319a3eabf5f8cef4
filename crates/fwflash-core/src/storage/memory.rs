//! In-memory storage device
//!
//! `MemoryStorage` emulates a partitioned flash device in memory. Erase sets
//! bytes to 0xFF and writes can only clear bits, like NOR flash. Every
//! operation is recorded so tests can check the exact sequence issued by
//! the engine, and individual operations can be made to fail.

use core::ops::RangeInclusive;
use std::cell::RefCell;
use std::collections::HashSet;
use std::io;
use std::rc::Rc;

use super::traits::{AccessMode, Partition, PartitionInfo, StorageDevice};
use crate::error::{Error, Result};

/// Operation recorded by [`MemoryStorage`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryOp {
    /// Partition opened
    Open {
        /// Partition index
        index: u32,
        /// Access mode
        mode: AccessMode,
    },
    /// Bytes read
    Read {
        /// Partition index
        index: u32,
        /// Byte offset
        offset: u64,
        /// Number of bytes
        len: usize,
    },
    /// Erase blocks erased
    Erase {
        /// Partition index
        index: u32,
        /// First erase block
        first_block: u32,
        /// Number of erase blocks
        count: u32,
    },
    /// Bytes written
    Write {
        /// Partition index
        index: u32,
        /// Erase block
        block: u32,
        /// Number of bytes
        len: usize,
    },
    /// Partition handle dropped
    Close {
        /// Partition index
        index: u32,
    },
}

/// Operation that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Fault {
    Info(u32),
    Open(u32),
    Read(u32),
    Erase(u32),
    Write(u32, u32),
}

struct MemoryPartition {
    name: String,
    erase_size: u32,
    data: Vec<u8>,
}

#[derive(Default)]
struct State {
    first_index: u32,
    partitions: Vec<Option<MemoryPartition>>,
    ops: Vec<MemoryOp>,
    faults: HashSet<Fault>,
}

impl State {
    fn partition(&self, index: u32) -> Option<&MemoryPartition> {
        let slot = index.checked_sub(self.first_index)? as usize;
        self.partitions.get(slot)?.as_ref()
    }

    fn partition_mut(&mut self, index: u32) -> Option<&mut MemoryPartition> {
        let slot = index.checked_sub(self.first_index)? as usize;
        self.partitions.get_mut(slot)?.as_mut()
    }
}

/// In-memory partitioned flash device
#[derive(Clone, Default)]
pub struct MemoryStorage {
    state: Rc<RefCell<State>>,
}

impl MemoryStorage {
    /// Create an empty device whose first partition will have index 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty device whose first partition will have index `first_index`
    pub fn starting_at(first_index: u32) -> Self {
        let storage = Self::new();
        storage.state.borrow_mut().first_index = first_index;
        storage
    }

    /// Append an erased partition and return its index
    ///
    /// `size` is rounded up to a whole number of erase blocks.
    pub fn add_partition(&self, name: &str, size: u64, erase_size: u32) -> u32 {
        let erase_size = erase_size.max(1);
        let blocks = size.div_ceil(erase_size as u64);
        let mut state = self.state.borrow_mut();
        state.partitions.push(Some(MemoryPartition {
            name: name.to_string(),
            erase_size,
            data: vec![0xFF; (blocks * erase_size as u64) as usize],
        }));
        state.first_index + state.partitions.len() as u32 - 1
    }

    /// Append a hole: the index is inside the device range but cannot be queried
    pub fn add_hole(&self) -> u32 {
        let mut state = self.state.borrow_mut();
        state.partitions.push(None);
        state.first_index + state.partitions.len() as u32 - 1
    }

    /// Overwrite partition contents at `offset`, bypassing flash semantics
    pub fn fill(&self, index: u32, offset: usize, bytes: &[u8]) {
        if let Some(part) = self.state.borrow_mut().partition_mut(index) {
            part.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        }
    }

    /// Copy of the contents of partition `index`
    pub fn data(&self, index: u32) -> Vec<u8> {
        self.state
            .borrow()
            .partition(index)
            .map(|p| p.data.clone())
            .unwrap_or_default()
    }

    /// All operations issued so far
    pub fn ops(&self) -> Vec<MemoryOp> {
        self.state.borrow().ops.clone()
    }

    /// Forget recorded operations
    pub fn clear_ops(&self) {
        self.state.borrow_mut().ops.clear();
    }

    /// Make `partition_info(index)` fail
    pub fn fail_info(&self, index: u32) {
        self.state.borrow_mut().faults.insert(Fault::Info(index));
    }

    /// Make `open(index, ..)` fail
    pub fn fail_open(&self, index: u32) {
        self.state.borrow_mut().faults.insert(Fault::Open(index));
    }

    /// Make reads from partition `index` fail
    pub fn fail_read(&self, index: u32) {
        self.state.borrow_mut().faults.insert(Fault::Read(index));
    }

    /// Make erases of partition `index` fail
    pub fn fail_erase(&self, index: u32) {
        self.state.borrow_mut().faults.insert(Fault::Erase(index));
    }

    /// Make writes to erase block `block` of partition `index` fail
    pub fn fail_write(&self, index: u32, block: u32) {
        self.state
            .borrow_mut()
            .faults
            .insert(Fault::Write(index, block));
    }
}

fn memory_path(index: u32) -> String {
    format!("memory:mtd{}", index)
}

fn failure(index: u32, message: &str) -> Error {
    Error::device(memory_path(index), io::Error::other(message.to_string()))
}

impl StorageDevice for MemoryStorage {
    type Partition = MemoryPartitionHandle;

    fn partition_range(&self) -> Result<RangeInclusive<u32>> {
        let state = self.state.borrow();
        let count = state.partitions.len() as u32;
        if count == 0 {
            // Empty range
            Ok(1..=0)
        } else {
            Ok(state.first_index..=state.first_index + count - 1)
        }
    }

    fn partition_info(&self, index: u32) -> Result<PartitionInfo> {
        let state = self.state.borrow();
        if state.faults.contains(&Fault::Info(index)) {
            return Err(failure(index, "injected info failure"));
        }
        let part = state
            .partition(index)
            .ok_or_else(|| failure(index, "no such partition"))?;
        Ok(PartitionInfo {
            index,
            name: part.name.clone(),
            size: part.data.len() as u64,
            erase_size: part.erase_size,
            erase_count: (part.data.len() / part.erase_size as usize) as u32,
        })
    }

    fn open(&self, index: u32, mode: AccessMode) -> Result<Self::Partition> {
        let mut state = self.state.borrow_mut();
        if state.faults.contains(&Fault::Open(index)) {
            return Err(failure(index, "injected open failure"));
        }
        if state.partition(index).is_none() {
            return Err(failure(index, "no such partition"));
        }
        state.ops.push(MemoryOp::Open { index, mode });
        Ok(MemoryPartitionHandle {
            state: Rc::clone(&self.state),
            index,
            mode,
            path: memory_path(index),
        })
    }
}

/// Open partition of a [`MemoryStorage`]
pub struct MemoryPartitionHandle {
    state: Rc<RefCell<State>>,
    index: u32,
    mode: AccessMode,
    path: String,
}

impl Partition for MemoryPartitionHandle {
    fn path(&self) -> &str {
        &self.path
    }

    fn read(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let index = self.index;
        if !self.mode.can_read() {
            return Err(failure(index, "partition not open for reading"));
        }
        let mut state = self.state.borrow_mut();
        if state.faults.contains(&Fault::Read(index)) {
            return Err(failure(index, "injected read failure"));
        }
        let part = state
            .partition(index)
            .ok_or_else(|| failure(index, "no such partition"))?;
        let start = offset as usize;
        let end = start + buf.len();
        if end > part.data.len() {
            return Err(failure(index, "read beyond end of partition"));
        }
        buf.copy_from_slice(&part.data[start..end]);
        state.ops.push(MemoryOp::Read {
            index,
            offset,
            len: buf.len(),
        });
        Ok(())
    }

    fn erase(&mut self, first_block: u32, count: u32) -> Result<()> {
        let index = self.index;
        if !self.mode.can_write() {
            return Err(failure(index, "partition not open for writing"));
        }
        let mut state = self.state.borrow_mut();
        state.ops.push(MemoryOp::Erase {
            index,
            first_block,
            count,
        });
        if state.faults.contains(&Fault::Erase(index)) {
            return Err(failure(index, "injected erase failure"));
        }
        let part = state
            .partition_mut(index)
            .ok_or_else(|| failure(index, "no such partition"))?;
        let eb = part.erase_size as usize;
        let start = first_block as usize * eb;
        let end = start + count as usize * eb;
        if end > part.data.len() {
            return Err(failure(index, "erase beyond end of partition"));
        }
        part.data[start..end].fill(0xFF);
        Ok(())
    }

    fn write(&mut self, block: u32, data: &[u8]) -> Result<()> {
        let index = self.index;
        if !self.mode.can_write() {
            return Err(failure(index, "partition not open for writing"));
        }
        let mut state = self.state.borrow_mut();
        state.ops.push(MemoryOp::Write {
            index,
            block,
            len: data.len(),
        });
        if state.faults.contains(&Fault::Write(index, block)) {
            return Err(failure(index, "injected write failure"));
        }
        let part = state
            .partition_mut(index)
            .ok_or_else(|| failure(index, "no such partition"))?;
        let eb = part.erase_size as usize;
        if data.len() > eb {
            return Err(failure(index, "write larger than an erase block"));
        }
        let start = block as usize * eb;
        if start + data.len() > part.data.len() {
            return Err(failure(index, "write beyond end of partition"));
        }
        // Programming can only clear bits
        for (cell, byte) in part.data[start..start + data.len()].iter_mut().zip(data) {
            *cell &= byte;
        }
        Ok(())
    }
}

impl Drop for MemoryPartitionHandle {
    fn drop(&mut self) {
        self.state
            .borrow_mut()
            .ops
            .push(MemoryOp::Close { index: self.index });
    }
}
