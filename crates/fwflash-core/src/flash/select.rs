//! Target card selection

use crate::card::CardType;
use crate::error::{Error, Result};
use crate::flash::catalog::PartitionEntry;
use crate::serial::SerialNumber;

/// Pick the card to flash and return its firmware partition index
///
/// Without a serial number the device must hold exactly one card. With a
/// serial number the first card carrying it is chosen. Either way the card
/// type must match `expected`, the card type the firmware is built for.
pub fn select(
    catalog: &[PartitionEntry],
    serial: Option<SerialNumber>,
    expected: CardType,
) -> Result<u32> {
    let entry = match serial {
        Some(sn) => catalog
            .iter()
            .find(|entry| entry.serial == sn)
            .ok_or(Error::NotFound(Some(sn)))?,
        None => match catalog {
            [] => return Err(Error::NotFound(None)),
            [entry] => entry,
            _ => return Err(Error::Ambiguous(catalog.len())),
        },
    };

    if entry.card_type != expected {
        return Err(Error::TypeMismatch {
            card: entry.card_type,
            image: expected,
        });
    }

    log::info!(
        "Selected card {} ({}) at mtd{}",
        entry.serial,
        entry.card_type,
        entry.index
    );
    Ok(entry.index)
}
