//! Card serial numbers
//!
//! A serial number is a 32-bit value stored at the start of a card's data
//! partition. Humans see it as four zero-padded decimal byte groups, most
//! significant first: `018-052-255-000` is `0x1234FF00`.

use core::fmt;
use core::str::FromStr;

use crate::error::Error;

/// Number of digit groups in the text form
const GROUPS: usize = 4;

/// Digits per group in the text form
const GROUP_DIGITS: usize = 3;

/// mgb4 card serial number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SerialNumber(pub u32);

impl SerialNumber {
    /// Decode a serial number as stored on the data partition
    pub fn from_le_bytes(bytes: [u8; 4]) -> Self {
        Self(u32::from_le_bytes(bytes))
    }

    /// Raw 32-bit value
    pub fn value(self) -> u32 {
        self.0
    }
}

impl From<u32> for SerialNumber {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [b3, b2, b1, b0] = self.0.to_be_bytes();
        write!(f, "{:03}-{:03}-{:03}-{:03}", b3, b2, b1, b0)
    }
}

impl FromStr for SerialNumber {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::Format(format!("{}: invalid serial number", s));

        let mut bytes = [0u8; GROUPS];
        let mut groups = s.split('-');
        for byte in bytes.iter_mut() {
            let group = groups.next().ok_or_else(invalid)?;
            if group.len() != GROUP_DIGITS || !group.bytes().all(|c| c.is_ascii_digit()) {
                return Err(invalid());
            }
            *byte = group.parse().map_err(|_| invalid())?;
        }
        if groups.next().is_some() {
            return Err(invalid());
        }

        Ok(Self(u32::from_be_bytes(bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode() {
        let sn: SerialNumber = "018-052-255-000".parse().unwrap();
        assert_eq!(sn.value(), 0x1234_FF00);
        assert_eq!(sn.value(), (18 << 24) | (52 << 16) | (255 << 8));
    }

    #[test]
    fn test_encode() {
        assert_eq!(SerialNumber(0x1234_FF00).to_string(), "018-052-255-000");
        assert_eq!(SerialNumber(0).to_string(), "000-000-000-000");
        assert_eq!(SerialNumber(u32::MAX).to_string(), "255-255-255-255");
    }

    #[test]
    fn test_text_round_trip() {
        for text in ["018-052-255-000", "001-002-003-004", "255-000-128-007"] {
            let sn: SerialNumber = text.parse().unwrap();
            assert_eq!(sn.to_string(), text);
        }
    }

    #[test]
    fn test_rejects_malformed() {
        for text in [
            "",
            "18-52-255-0",
            "018-052-255",
            "018-052-255-000-001",
            "018.052.255.000",
            "018-052-256-000",
            "018-052-2x5-000",
            "018-052-+25-000",
            " 018-052-255-000",
            "0x1234FF00",
        ] {
            assert!(
                matches!(text.parse::<SerialNumber>(), Err(Error::Format(_))),
                "accepted {:?}",
                text
            );
        }
    }

    #[test]
    fn test_from_le_bytes() {
        let sn = SerialNumber::from_le_bytes([0x00, 0xFF, 0x34, 0x12]);
        assert_eq!(sn, SerialNumber(0x1234_FF00));
    }
}
