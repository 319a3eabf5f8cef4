//! Firmware file header

use zerocopy::byteorder::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::card::{CardType, InterfaceType};

/// Magic number at the start of every firmware file ("mgb4" in little endian)
pub const FW_MAGIC: u32 = 0x3462676D;

/// Size of the firmware header in bytes
pub const HEADER_SIZE: usize = core::mem::size_of::<FirmwareHeader>();

/// On-disk firmware header
///
/// ```text
/// 0x00  magic     FW_MAGIC
/// 0x04  version   [interface][card type][minor version (16 bit)]
/// 0x08  size      payload length in bytes
/// 0x0C  checksum  CRC-32 of this header (checksum zeroed) + payload
/// ```
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct FirmwareHeader {
    magic: U32,
    version: U32,
    size: U32,
    checksum: U32,
}

impl FirmwareHeader {
    /// Create a header with a zero checksum
    pub fn new(version: u32, size: u32) -> Self {
        Self {
            magic: U32::new(FW_MAGIC),
            version: U32::new(version),
            size: U32::new(size),
            checksum: U32::new(0),
        }
    }

    /// Magic number
    pub fn magic(&self) -> u32 {
        self.magic.get()
    }

    /// Raw version word
    pub fn version(&self) -> u32 {
        self.version.get()
    }

    /// Declared payload size in bytes
    pub fn size(&self) -> u32 {
        self.size.get()
    }

    /// Stored checksum
    pub fn checksum(&self) -> u32 {
        self.checksum.get()
    }

    /// Copy of this header with the checksum field replaced
    pub fn with_checksum(mut self, checksum: u32) -> Self {
        self.checksum = U32::new(checksum);
        self
    }

    /// Interface type (version byte 3)
    pub fn interface(&self) -> InterfaceType {
        InterfaceType::from_code(self.version().to_le_bytes()[3])
    }

    /// Raw card type code (version byte 2)
    pub fn card_code(&self) -> u8 {
        self.version().to_le_bytes()[2]
    }

    /// Card type the firmware is built for
    pub fn card_type(&self) -> CardType {
        CardType::from_code(self.card_code())
    }

    /// Minor firmware version (version bytes 1..0)
    pub fn minor_version(&self) -> u16 {
        (self.version() & 0xFFFF) as u16
    }
}
