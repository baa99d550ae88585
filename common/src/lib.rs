pub mod file_format;
pub mod file_utils;
mod log_setup;

pub use log_setup::setup_logging;
