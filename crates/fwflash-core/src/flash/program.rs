//! Erase and program a firmware partition

use crate::error::{Error, Result};
use crate::storage::{AccessMode, Partition, StorageDevice};

/// Progress callback for programming operations
///
/// All methods have empty default implementations.
pub trait ProgramProgress {
    /// Called before erasing `blocks` erase blocks (`bytes` bytes)
    fn erasing(&mut self, _blocks: u32, _bytes: u64) {}

    /// Called before writing `total` bytes
    fn writing(&mut self, _total: usize) {}

    /// Called after each written chunk with the number of bytes written so far
    fn write_progress(&mut self, _written: usize) {}

    /// Called before reading back `total` bytes for verification
    fn verifying(&mut self, _total: usize) {}

    /// Called after each verified chunk with the number of bytes checked so far
    fn verify_progress(&mut self, _checked: usize) {}

    /// Called when the operation finished successfully
    fn complete(&mut self) {}
}

/// Progress reporter that ignores all events
pub struct NoProgress;

impl ProgramProgress for NoProgress {}

/// Erase partition `index` and write `payload` to its start
///
/// The whole partition is erased in one call before anything is written.
/// The payload is then written one erase block at a time, chunk `k` at erase
/// block `k`, the last chunk clipped to the remaining length.
///
/// A failure during erase or write aborts immediately. Nothing is rolled
/// back: the partition is left partially erased or partially programmed.
pub fn program<D: StorageDevice + ?Sized>(
    device: &D,
    index: u32,
    payload: &[u8],
    progress: &mut dyn ProgramProgress,
) -> Result<()> {
    let info = device.partition_info(index)?;
    let mut part = device.open(index, AccessMode::Write)?;

    if payload.len() as u64 > info.size {
        return Err(Error::Capacity {
            size: payload.len(),
            capacity: info.size,
        });
    }

    let erase_size = checked_erase_size(&part, info.erase_size)?;
    progress.erasing(info.erase_count, info.size);
    log::info!(
        "Erasing {} ({} blocks of {:#x} bytes)",
        part.path(),
        info.erase_count,
        erase_size
    );
    part.erase(0, info.erase_count)?;

    progress.writing(payload.len());
    log::info!("Writing {} bytes to {}", payload.len(), part.path());
    let mut written = 0;
    for (block, chunk) in payload.chunks(erase_size).enumerate() {
        log::trace!("{}: block #{} ({} bytes)", part.path(), block, chunk.len());
        part.write(block as u32, chunk)?;
        written += chunk.len();
        progress.write_progress(written);
    }

    progress.complete();
    Ok(())
}

/// Read back partition `index` and compare it with `payload`
pub fn verify<D: StorageDevice + ?Sized>(
    device: &D,
    index: u32,
    payload: &[u8],
    progress: &mut dyn ProgramProgress,
) -> Result<()> {
    let info = device.partition_info(index)?;
    let mut part = device.open(index, AccessMode::Read)?;
    let erase_size = checked_erase_size(&part, info.erase_size)?;
    let mut buf = vec![0u8; erase_size];

    progress.verifying(payload.len());
    log::info!("Verifying {} bytes of {}", payload.len(), part.path());
    let mut offset = 0;
    for chunk in payload.chunks(erase_size) {
        let read = &mut buf[..chunk.len()];
        part.read(offset as u64, read)?;
        if let Some(i) = read.iter().zip(chunk).position(|(a, b)| a != b) {
            return Err(Error::Verify { offset: offset + i });
        }
        offset += chunk.len();
        progress.verify_progress(offset);
    }

    progress.complete();
    Ok(())
}

fn checked_erase_size<P: Partition>(part: &P, erase_size: u32) -> Result<usize> {
    if erase_size == 0 {
        return Err(Error::device(part.path(), "invalid erase block size 0"));
    }
    Ok(erase_size as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryOp, MemoryStorage};

    const EB: u32 = 0x100;

    fn setup(blocks: u32) -> (MemoryStorage, u32) {
        let storage = MemoryStorage::new();
        storage.add_partition("bios", EB as u64, EB);
        let index = storage.add_partition("mgb4-fw.0", (blocks * EB) as u64, EB);
        storage.fill(index, 0, &vec![0x5A; (blocks * EB) as usize]);
        (storage, index)
    }

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 13 % 256) as u8).collect()
    }

    fn writes(storage: &MemoryStorage) -> Vec<(u32, usize)> {
        storage
            .ops()
            .into_iter()
            .filter_map(|op| match op {
                MemoryOp::Write { block, len, .. } => Some((block, len)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_program_sequence() {
        let (storage, index) = setup(8);
        let data = payload(3 * EB as usize + 17);

        program(&storage, index, &data, &mut NoProgress).unwrap();

        let ops = storage.ops();
        assert_eq!(ops[0], MemoryOp::Open { index, mode: AccessMode::Write });
        assert_eq!(ops[1], MemoryOp::Erase { index, first_block: 0, count: 8 });
        assert_eq!(ops.last(), Some(&MemoryOp::Close { index }));
        assert_eq!(writes(&storage), vec![(0, 256), (1, 256), (2, 256), (3, 17)]);

        let contents = storage.data(index);
        assert_eq!(&contents[..data.len()], data.as_slice());
        assert!(contents[data.len()..].iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_chunk_counts() {
        for (len, expected) in [
            (0, vec![]),
            (1, vec![(0, 1)]),
            (256, vec![(0, 256)]),
            (512, vec![(0, 256), (1, 256)]),
            (513, vec![(0, 256), (1, 256), (2, 1)]),
        ] {
            let (storage, index) = setup(4);
            program(&storage, index, &payload(len), &mut NoProgress).unwrap();
            assert_eq!(writes(&storage), expected, "payload of {} bytes", len);
        }
    }

    #[test]
    fn test_payload_fills_partition() {
        let (storage, index) = setup(2);
        let data = payload(2 * EB as usize);
        program(&storage, index, &data, &mut NoProgress).unwrap();
        assert_eq!(storage.data(index), data);
    }

    #[test]
    fn test_payload_too_large() {
        let (storage, index) = setup(2);
        let data = payload(2 * EB as usize + 1);
        assert!(matches!(
            program(&storage, index, &data, &mut NoProgress),
            Err(Error::Capacity { size: 513, capacity: 512 })
        ));
        // Nothing destructive happened
        assert!(storage
            .ops()
            .iter()
            .all(|op| !matches!(op, MemoryOp::Erase { .. } | MemoryOp::Write { .. })));
        assert!(storage.data(index).iter().all(|&b| b == 0x5A));
    }

    #[test]
    fn test_erase_failure_aborts() {
        let (storage, index) = setup(4);
        storage.fail_erase(index);

        let result = program(&storage, index, &payload(100), &mut NoProgress);
        assert!(matches!(result, Err(Error::Device { .. })));
        assert!(writes(&storage).is_empty());
        assert_eq!(storage.ops().last(), Some(&MemoryOp::Close { index }));
    }

    #[test]
    fn test_write_failure_aborts_in_place() {
        let (storage, index) = setup(4);
        storage.fail_write(index, 1);
        let data = payload(3 * EB as usize);

        let result = program(&storage, index, &data, &mut NoProgress);
        assert!(matches!(result, Err(Error::Device { .. })));
        // Block 0 was programmed, block 1 failed, block 2 was never attempted
        assert_eq!(writes(&storage), vec![(0, 256), (1, 256)]);
        let contents = storage.data(index);
        assert_eq!(&contents[..EB as usize], &data[..EB as usize]);
        assert!(contents[2 * EB as usize..].iter().all(|&b| b == 0xFF));
        assert_eq!(storage.ops().last(), Some(&MemoryOp::Close { index }));
    }

    #[test]
    fn test_open_failure() {
        let (storage, index) = setup(4);
        storage.fail_open(index);
        assert!(matches!(
            program(&storage, index, &payload(10), &mut NoProgress),
            Err(Error::Device { .. })
        ));
        assert!(storage.ops().is_empty());
    }

    #[test]
    fn test_verify() {
        let (storage, index) = setup(4);
        let data = payload(700);
        program(&storage, index, &data, &mut NoProgress).unwrap();
        storage.clear_ops();
        verify(&storage, index, &data, &mut NoProgress).unwrap();

        // Read-only pass, one read per erase block
        assert_eq!(
            storage.ops(),
            vec![
                MemoryOp::Open { index, mode: AccessMode::Read },
                MemoryOp::Read { index, offset: 0, len: 256 },
                MemoryOp::Read { index, offset: 256, len: 256 },
                MemoryOp::Read { index, offset: 512, len: 188 },
                MemoryOp::Close { index },
            ]
        );

        let mut other = data.clone();
        other[600] ^= 0xFF;
        assert!(matches!(
            verify(&storage, index, &other, &mut NoProgress),
            Err(Error::Verify { offset: 600 })
        ));
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl ProgramProgress for Recorder {
        fn erasing(&mut self, blocks: u32, bytes: u64) {
            self.events.push(format!("erase {} {}", blocks, bytes));
        }
        fn writing(&mut self, total: usize) {
            self.events.push(format!("write {}", total));
        }
        fn write_progress(&mut self, written: usize) {
            self.events.push(format!("written {}", written));
        }
        fn complete(&mut self) {
            self.events.push("done".to_string());
        }
    }

    #[test]
    fn test_progress_events() {
        let (storage, index) = setup(2);
        let mut progress = Recorder::default();
        program(&storage, index, &payload(300), &mut progress).unwrap();
        assert_eq!(
            progress.events,
            vec!["erase 2 512", "write 300", "written 256", "written 300", "done"]
        );
    }
}
