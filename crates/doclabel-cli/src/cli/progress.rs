//! Progress bar construction shared by commands.

use indicatif::{ProgressBar, ProgressStyle};

const BAR_TEMPLATE: &str = "{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}";

/// A page-count bar; the length grows as documents are rendered.
pub fn page_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar().template(BAR_TEMPLATE) {
        bar.set_style(style.progress_chars("█▓░"));
    }
    bar.enable_steady_tick(std::time::Duration::from_millis(100));
    bar
}

/// Print above the bar without tearing it.
pub fn bar_eprintln(bar: &ProgressBar, message: &str) {
    bar.suspend(|| eprintln!("{}", message));
}
