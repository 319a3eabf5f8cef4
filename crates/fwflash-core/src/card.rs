//! Card model: card types, interface types and flash layout constants

use core::fmt;

/// Name prefix of a card's firmware-code partition
pub const FW_PARTITION_PREFIX: &str = "mgb4-fw";

/// Name prefix of a card's data (serial number) partition
pub const DATA_PARTITION_PREFIX: &str = "mgb4-data";

/// Firmware partition size on T100 cards
pub const T100_FW_PARTITION_SIZE: u64 = 0x400000;

/// Firmware partition size on T200 cards
pub const T200_FW_PARTITION_SIZE: u64 = 0x950000;

/// Largest firmware payload accepted for T100 images
pub const T100_FW_IMAGE_LIMIT: usize = 0x400000;

/// Largest firmware payload accepted for T200 (and newer) images
pub const T200_FW_IMAGE_LIMIT: usize = 0x9C4000;

/// Hardware type of a card
///
/// Partitions only ever infer `T100` or `T200`. `Unknown` carries a card
/// type code found in a firmware header that matches no known card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardType {
    /// First generation card (4 MiB firmware partition)
    T100,
    /// Second generation card (larger firmware partition)
    T200,
    /// Unrecognised card type code
    Unknown(u8),
}

impl CardType {
    /// Decode the card type byte of a firmware version word
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::T100,
            2 => Self::T200,
            other => Self::Unknown(other),
        }
    }

    /// Card type byte as used in firmware version words
    pub fn code(self) -> u8 {
        match self {
            Self::T100 => 1,
            Self::T200 => 2,
            Self::Unknown(code) => code,
        }
    }

    /// Infer the card type from the size of its firmware partition
    ///
    /// Only the exact T200 size maps to `T200`; every other size, including
    /// sizes matching no known card, maps to `T100`.
    pub fn from_partition_size(size: u64) -> Self {
        if size == T200_FW_PARTITION_SIZE {
            Self::T200
        } else {
            if size != T100_FW_PARTITION_SIZE {
                log::warn!(
                    "Unknown FW partition size ({:#x}), assuming {}",
                    size,
                    Self::T100
                );
            }
            Self::T100
        }
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::T100 => write!(f, "T100"),
            Self::T200 => write!(f, "T200"),
            Self::Unknown(_) => write!(f, "UNKNOWN"),
        }
    }
}

/// Video interface a firmware is built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterfaceType {
    /// FPD-Link III
    Fpdl3,
    /// GMSL
    Gmsl,
    /// Unrecognised interface code
    Unknown(u8),
}

impl InterfaceType {
    /// Decode the interface byte of a firmware version word
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::Fpdl3,
            2 => Self::Gmsl,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for InterfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fpdl3 => write!(f, "FPDL3"),
            Self::Gmsl => write!(f, "GMSL"),
            Self::Unknown(_) => write!(f, "UNKNOWN"),
        }
    }
}
