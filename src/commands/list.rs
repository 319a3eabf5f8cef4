//! Card list command

use fwflash_core::flash::{self, PartitionEntry};
use fwflash_linux_mtd::LinuxMtd;
use std::io::Write;

/// Run the list command
pub fn run_list(mtd: &LinuxMtd) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = flash::build_catalog(mtd)?;
    if catalog.is_empty() {
        log::warn!("No mgb4 cards found");
    }
    let mut out = std::io::stdout().lock();
    write_list(&mut out, &catalog)?;
    Ok(())
}

fn write_list(out: &mut impl Write, catalog: &[PartitionEntry]) -> std::io::Result<()> {
    for entry in catalog {
        writeln!(out, "{} ({})", entry.serial, entry.card_type)?;
    }
    Ok(())
}
