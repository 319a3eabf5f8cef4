//! Image info command

use fwflash_core::image::FirmwareImage;
use std::io::Write;
use std::path::Path;

/// Run the info command
pub fn run_info(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let image = FirmwareImage::open(path)?;
    let mut out = std::io::stdout().lock();
    write_info(&mut out, &image)?;
    Ok(())
}

fn write_info(out: &mut impl Write, image: &FirmwareImage) -> std::io::Result<()> {
    writeln!(out, "card: {}", image.card_type())?;
    writeln!(out, "type: {}", image.interface())?;
    writeln!(out, "version: {}", image.minor_version())?;
    writeln!(out, "size: {}", image.size())
}
