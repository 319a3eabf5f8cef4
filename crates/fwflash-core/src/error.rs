//! Error types for fwflash-core

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::card::CardType;
use crate::serial::SerialNumber;

/// Boxed error produced by a storage backend
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Core error type
///
/// Every error is terminal for the current invocation. Nothing is retried,
/// and nothing done to the flash before the error is rolled back.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or oversized firmware image, or malformed serial number text
    #[error("{0}")]
    Format(String),

    /// Firmware checksum does not match the file contents
    #[error("CRC error (stored {stored:#010x}, computed {computed:#010x})")]
    Integrity {
        /// Checksum stored in the header
        stored: u32,
        /// Checksum computed over the file
        computed: u32,
    },

    /// Firmware file could not be opened or read
    #[error("{}: {source}", .path.display())]
    Io {
        /// Path of the firmware file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Storage device query, open, read, erase or write failed
    #[error("{path}: {source}")]
    Device {
        /// Path of the offending partition (or device class)
        path: String,
        /// Backend error
        #[source]
        source: BoxedError,
    },

    /// Data partition found that does not directly follow a firmware partition
    #[error("partition order mismatch: data partition #{index} does not follow a firmware partition (last firmware partition: {})", pending_name(.pending))]
    Topology {
        /// Index of the data partition
        index: u32,
        /// Index of the last firmware partition seen, if any
        pending: Option<u32>,
    },

    /// No card (or no card with the requested serial number) present
    #[error("{}", not_found_message(.0))]
    NotFound(Option<SerialNumber>),

    /// Several cards present and none was specified
    #[error("card not specified ({0} cards present)")]
    Ambiguous(usize),

    /// The firmware is built for a different card type
    #[error("card/FW type mismatch (card is {card}, firmware is for {image})")]
    TypeMismatch {
        /// Type of the selected card
        card: CardType,
        /// Card type declared by the firmware image
        image: CardType,
    },

    /// Payload does not fit into the target partition
    #[error("firmware size {size} exceeds partition size {capacity}")]
    Capacity {
        /// Payload size in bytes
        size: usize,
        /// Partition size in bytes
        capacity: u64,
    },

    /// Read-back after programming differs from the payload
    #[error("verification failed at offset {offset:#010x}")]
    Verify {
        /// First differing byte offset
        offset: usize,
    },
}

impl Error {
    /// Wrap a backend error together with the partition path it concerns
    pub fn device(path: impl Into<String>, source: impl Into<BoxedError>) -> Self {
        Self::Device {
            path: path.into(),
            source: source.into(),
        }
    }
}

fn pending_name(pending: &Option<u32>) -> String {
    match pending {
        Some(index) => format!("#{}", index),
        None => "none".to_string(),
    }
}

fn not_found_message(serial: &Option<SerialNumber>) -> String {
    match serial {
        Some(sn) => format!("{}: card not found", sn),
        None => "no card found".to_string(),
    }
}

/// Result type alias using the core Error type
pub type Result<T> = std::result::Result<T, Error>;
