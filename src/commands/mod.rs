//! CLI command implementations
//!
//! - `flash` programs an image onto a card (default mode)
//! - `info` prints the header of an image file (`-i`)
//! - `list` prints the cards found on the system (`-l`)

mod flash;
mod info;
mod list;

pub use flash::run_flash;
pub use info::run_info;
pub use list::run_list;
