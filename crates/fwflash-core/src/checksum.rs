//! CRC-32 checksum used by the firmware file format
//!
//! The checksum is the common CRC-32 (ISO-HDLC, reflected polynomial
//! 0xEDB88320) with a zero seed and a final complement. It is computed in
//! three stages so that it can be fed from several non-contiguous buffers.

/// Incremental CRC-32 state
#[derive(Clone)]
pub struct Crc32 {
    hasher: crc32fast::Hasher,
}

impl Crc32 {
    /// Start a checksum from `seed`
    ///
    /// `seed` is a finished CRC value; use 0 for a new checksum.
    pub fn init(seed: u32) -> Self {
        Self {
            hasher: crc32fast::Hasher::new_with_initial(seed),
        }
    }

    /// Feed `data` into the checksum
    pub fn update(mut self, data: &[u8]) -> Self {
        self.hasher.update(data);
        self
    }

    /// Apply the final complement and return the checksum
    pub fn finish(self) -> u32 {
        self.hasher.finalize()
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::init(0)
    }
}

/// Compute the CRC-32 of a single buffer
pub fn crc32(data: &[u8]) -> u32 {
    Crc32::init(0).update(data).finish()
}
