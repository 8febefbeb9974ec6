//! Command-line interface for doclabel.

mod commands;
pub mod progress;

pub use commands::{is_verbose, run};
