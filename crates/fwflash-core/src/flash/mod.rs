//! Flashing engine
//!
//! The flashing flow is:
//!
//! 1. [`build_catalog`] scans the storage device for card partition pairs
//! 2. [`select`] picks the target card from the catalog
//! 3. [`program`] erases the card's firmware partition and writes the payload
//! 4. optionally, [`verify`] reads the partition back

mod catalog;
mod program;
mod select;

pub use catalog::{build_catalog, PartitionCatalog, PartitionEntry, PartitionKind};
pub use program::{program, verify, NoProgress, ProgramProgress};
pub use select::select;
