//! Flash command implementation

use fwflash_core::flash::{self, ProgramProgress};
use fwflash_core::image::FirmwareImage;
use fwflash_core::serial::SerialNumber;
use fwflash_linux_mtd::LinuxMtd;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

/// Progress reporter using indicatif
struct IndicatifProgress {
    multi: MultiProgress,
    current_bar: Option<ProgressBar>,
}

impl IndicatifProgress {
    fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            current_bar: None,
        }
    }

    fn create_bar(&mut self, total: u64, phase: &str) {
        let pb = self.multi.add(ProgressBar::new(total));
        pb.set_style(
            ProgressStyle::default_bar()
                .template(&format!(
                    "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{bytes}}/{{total_bytes}} ({{bytes_per_sec}}, {{eta}}) {}",
                    phase
                ))
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        self.current_bar = Some(pb);
    }

    fn create_spinner(&mut self, message: String) {
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(100));
        self.current_bar = Some(pb);
    }

    fn finish(&mut self, message: &str) {
        if let Some(pb) = self.current_bar.take() {
            pb.finish_with_message(message.to_string());
        }
    }

    fn set_position(&self, pos: usize) {
        if let Some(pb) = &self.current_bar {
            pb.set_position(pos as u64);
        }
    }
}

impl ProgramProgress for IndicatifProgress {
    fn erasing(&mut self, blocks: u32, bytes: u64) {
        self.create_spinner(format!("Erasing {} blocks ({} bytes)...", blocks, bytes));
    }

    fn writing(&mut self, total: usize) {
        self.finish("Erase complete");
        self.create_bar(total as u64, "Writing");
    }

    fn write_progress(&mut self, written: usize) {
        self.set_position(written);
    }

    fn verifying(&mut self, total: usize) {
        self.create_bar(total as u64, "Verifying");
    }

    fn verify_progress(&mut self, checked: usize) {
        self.set_position(checked);
    }

    fn complete(&mut self) {
        self.finish("Done");
    }
}

impl Drop for IndicatifProgress {
    fn drop(&mut self) {
        // Don't leave a ticking spinner behind when an operation fails
        if let Some(pb) = self.current_bar.take() {
            pb.abandon();
        }
    }
}

/// Run the flash command
pub fn run_flash(
    mtd: &LinuxMtd,
    input: &Path,
    serial: Option<SerialNumber>,
    do_verify: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let image = FirmwareImage::open(input)?;
    log::info!(
        "Loaded {} ({} bytes, card {}, {}, version {})",
        input.display(),
        image.size(),
        image.card_type(),
        image.interface(),
        image.minor_version()
    );

    let catalog = flash::build_catalog(mtd)?;
    let index = flash::select(&catalog, serial, image.card_type())?;

    let mut progress = IndicatifProgress::new();
    flash::program(mtd, index, image.payload(), &mut progress)?;
    println!("Write complete!");

    if do_verify {
        flash::verify(mtd, index, image.payload(), &mut progress)?;
        println!("Verify complete!");
    }

    Ok(())
}
