//! Shared helpers.

mod atomic;
mod image_url;

pub use atomic::{write_json_atomic, WriteError};
pub use image_url::{page_image_name, ImageLocator, ImageUrlError};
