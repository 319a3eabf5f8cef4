//! Partition catalog
//!
//! Every mgb4 card exposes two consecutive partitions: the firmware code
//! partition followed by a small data partition holding the card serial
//! number. The catalog pairs them up and records one entry per card.

use crate::card::{CardType, DATA_PARTITION_PREFIX, FW_PARTITION_PREFIX};
use crate::error::{Error, Result};
use crate::serial::SerialNumber;
use crate::storage::{AccessMode, Partition, StorageDevice};

/// Role of a partition, decided from its name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionKind {
    /// Firmware code partition
    FirmwareCode,
    /// Data (serial number) partition
    Data,
    /// Unrelated partition
    Other,
}

impl PartitionKind {
    /// Classify a partition by name
    pub fn from_name(name: &str) -> Self {
        if name.starts_with(FW_PARTITION_PREFIX) {
            Self::FirmwareCode
        } else if name.starts_with(DATA_PARTITION_PREFIX) {
            Self::Data
        } else {
            Self::Other
        }
    }
}

/// One card found on the storage device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionEntry {
    /// Index of the firmware code partition
    pub index: u32,
    /// Index of the data partition
    pub data_index: u32,
    /// Serial number read from the data partition
    pub serial: SerialNumber,
    /// Card type inferred from the firmware partition size
    pub card_type: CardType,
}

/// Cards present on a storage device, in discovery order
pub type PartitionCatalog = Vec<PartitionEntry>;

/// Scan `device` and build the catalog of cards it holds
///
/// Partitions are visited in ascending index order. A data partition must
/// immediately follow the last firmware partition seen, otherwise the
/// device layout is inconsistent and the scan fails with
/// [`Error::Topology`]. A firmware partition without a data partition is
/// skipped.
pub fn build_catalog<D: StorageDevice + ?Sized>(device: &D) -> Result<PartitionCatalog> {
    let mut catalog = PartitionCatalog::new();
    let mut code: Option<(u32, u64)> = None;

    for index in device.partition_range()? {
        let info = device.partition_info(index)?;

        match PartitionKind::from_name(&info.name) {
            PartitionKind::FirmwareCode => {
                log::debug!(
                    "mtd{}: firmware partition '{}' ({:#x} bytes)",
                    index,
                    info.name,
                    info.size
                );
                code = Some((index, info.size));
            }
            PartitionKind::Data => {
                let (code_index, code_size) = match code {
                    Some((i, size)) if index.checked_sub(1) == Some(i) => (i, size),
                    _ => {
                        return Err(Error::Topology {
                            index,
                            pending: code.map(|(i, _)| i),
                        })
                    }
                };

                let serial = read_serial(device, index)?;
                let card_type = CardType::from_partition_size(code_size);
                log::debug!(
                    "mtd{}: data partition '{}', card {} ({})",
                    index,
                    info.name,
                    serial,
                    card_type
                );

                catalog.push(PartitionEntry {
                    index: code_index,
                    data_index: index,
                    serial,
                    card_type,
                });
            }
            PartitionKind::Other => {}
        }
    }

    log::info!("Found {} card(s)", catalog.len());
    Ok(catalog)
}

fn read_serial<D: StorageDevice + ?Sized>(device: &D, index: u32) -> Result<SerialNumber> {
    let mut part = device.open(index, AccessMode::Read)?;
    let mut bytes = [0u8; 4];
    part.read(0, &mut bytes)?;
    Ok(SerialNumber::from_le_bytes(bytes))
}
