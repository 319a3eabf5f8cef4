//! Firmware image reader and validator
//!
//! A firmware file is a 16 byte [`FirmwareHeader`] followed by `size` bytes
//! of payload. A file is accepted only if the magic matches, the payload
//! fits the flash of the card type it declares, and the CRC-32 over the
//! header (checksum field zeroed) and payload matches the stored checksum.

mod header;

pub use header::{FirmwareHeader, FW_MAGIC, HEADER_SIZE};

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use zerocopy::{FromBytes, IntoBytes};

use crate::card::{CardType, InterfaceType, T100_FW_IMAGE_LIMIT, T200_FW_IMAGE_LIMIT};
use crate::checksum::Crc32;
use crate::error::{Error, Result};

/// Maximum payload size of a firmware declaring card type code `code`
///
/// Codes up to 1 are first generation cards; anything above targets the
/// larger flash of newer cards. The limit only bounds the file; whether the
/// payload fits the actual partition is checked when programming.
pub fn size_limit(card_code: u8) -> usize {
    if card_code <= 1 {
        T100_FW_IMAGE_LIMIT
    } else {
        T200_FW_IMAGE_LIMIT
    }
}

/// A validated firmware image
#[derive(Debug, Clone)]
pub struct FirmwareImage {
    header: FirmwareHeader,
    payload: Vec<u8>,
}

impl FirmwareImage {
    /// Read and validate the firmware file at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| io_error(path, e))?;
        Self::from_reader(file, path)
    }

    /// Read and validate a firmware image from `reader`
    ///
    /// `path` is only used in error messages. The reader is consumed and
    /// dropped before returning.
    pub fn from_reader<R: Read>(mut reader: R, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let mut raw = Vec::with_capacity(HEADER_SIZE);
        reader
            .by_ref()
            .take(HEADER_SIZE as u64)
            .read_to_end(&mut raw)
            .map_err(|e| io_error(path, e))?;
        let header = FirmwareHeader::read_from_bytes(&raw)
            .ok()
            .filter(|h| h.magic() == FW_MAGIC)
            .ok_or_else(|| Error::Format(format!("{}: Not a mgb4 FW file", path.display())))?;

        let size = header.size() as usize;
        if size > size_limit(header.card_code()) {
            return Err(Error::Format(format!(
                "{}: {}: Invalid FW data size",
                path.display(),
                size
            )));
        }

        let mut payload = vec![0u8; size];
        reader.read_exact(&mut payload).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                io_error(path, io::Error::new(e.kind(), "unexpected EOF"))
            } else {
                io_error(path, e)
            }
        })?;
        drop(reader);

        let computed = Crc32::init(0)
            .update(header.with_checksum(0).as_bytes())
            .update(&payload)
            .finish();
        if computed != header.checksum() {
            return Err(Error::Integrity {
                stored: header.checksum(),
                computed,
            });
        }

        log::debug!(
            "{}: version {:#010x}, {} bytes, crc {:#010x}",
            path.display(),
            header.version(),
            size,
            computed
        );

        Ok(Self { header, payload })
    }

    /// Validated header
    pub fn header(&self) -> &FirmwareHeader {
        &self.header
    }

    /// Raw version word
    pub fn version(&self) -> u32 {
        self.header.version()
    }

    /// Payload size in bytes
    pub fn size(&self) -> usize {
        self.payload.len()
    }

    /// Card type the firmware is built for
    pub fn card_type(&self) -> CardType {
        self.header.card_type()
    }

    /// Interface the firmware is built for
    pub fn interface(&self) -> InterfaceType {
        self.header.interface()
    }

    /// Minor firmware version
    pub fn minor_version(&self) -> u16 {
        self.header.minor_version()
    }

    /// Payload bytes to be written to flash
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Consume the image, returning the payload
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}

/// Build a complete firmware file (header with checksum + payload)
pub fn encode(version: u32, payload: &[u8]) -> Vec<u8> {
    let header = FirmwareHeader::new(version, payload.len() as u32);
    let checksum = Crc32::init(0)
        .update(header.as_bytes())
        .update(payload)
        .finish();

    let mut file = header.with_checksum(checksum).as_bytes().to_vec();
    file.extend_from_slice(payload);
    file
}

fn io_error(path: &Path, source: io::Error) -> Error {
    Error::Io {
        path: PathBuf::from(path),
        source,
    }
}
